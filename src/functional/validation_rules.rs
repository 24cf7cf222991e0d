//! Composable Validation Rules
//!
//! Pure, single-value checks used by both validation stages. Every rule
//! implements [`ValidationRule`] and reports a [`ValidationError`] carrying the
//! dotted field path it was evaluated against, so callers can collect rules
//! from many fields into one ordered error list.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Cached regex patterns for validation
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});
static UK_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+44|0)[1-9]\d{8,10}$").expect("phone pattern compiles"));
static PHONE_CHARSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-+()]+$").expect("phone charset pattern compiles"));
static UK_POSTCODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}$").expect("postcode pattern compiles")
});
static STORED_POSTCODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}[0-9R][0-9A-Z]?\s?[0-9][A-Z]{2}$")
        .expect("stored postcode pattern compiles")
});

/// Validation result type for composable validation chains
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with detailed information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    /// Creates a ValidationError with the provided field name, error code, and message.
    ///
    /// # Examples
    ///
    /// ```
    /// let err = ValidationError::new("email", "INVALID_EMAIL", "Invalid email format");
    /// assert_eq!(err.field, "email");
    /// assert_eq!(err.code, "INVALID_EMAIL");
    /// ```
    pub fn new(field: &str, code: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Core validation rule trait for composable validation
pub trait ValidationRule<T: ?Sized> {
    fn validate(&self, value: &T, field_name: &str) -> ValidationResult<()>;
}

impl<T: ?Sized, R: ValidationRule<T> + ?Sized> ValidationRule<T> for Box<R> {
    fn validate(&self, value: &T, field_name: &str) -> ValidationResult<()> {
        (**self).validate(value, field_name)
    }
}

/// Rejects strings that are empty once trimmed.
pub struct Required {
    pub message: &'static str,
}

impl ValidationRule<str> for Required {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field_name, "REQUIRED", self.message));
        }
        Ok(())
    }
}

/// String length validation, counted in characters.
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub label: &'static str,
    pub wording: MaxWording,
}

/// How a `TOO_LONG` message phrases the limit. `max` itself is always
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxWording {
    /// "Notes must be less than 500 characters", used on request payloads.
    LessThan,
    /// "Notes cannot exceed 1000 characters", used on stored records.
    CannotExceed,
}

impl ValidationRule<str> for Length {
    /// Validates that a string's length falls within the rule's optional bounds.
    ///
    /// Fails with `TOO_SHORT` below `min` and `TOO_LONG` above `max`.
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        let len = value.chars().count();

        if let Some(min) = self.min {
            if len < min {
                return Err(ValidationError::new(
                    field_name,
                    "TOO_SHORT",
                    &format!("{} must be at least {} characters", self.label, min),
                ));
            }
        }

        if let Some(max) = self.max {
            if len > max {
                return Err(ValidationError::new(
                    field_name,
                    "TOO_LONG",
                    &match self.wording {
                        MaxWording::LessThan => {
                            format!("{} must be less than {} characters", self.label, max)
                        }
                        MaxWording::CannotExceed => {
                            format!("{} cannot exceed {} characters", self.label, max)
                        }
                    },
                ));
            }
        }

        Ok(())
    }
}

/// Email format validation using regex
pub struct Email;

impl ValidationRule<str> for Email {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        if !EMAIL_REGEX.is_match(value) {
            return Err(ValidationError::new(
                field_name,
                "INVALID_EMAIL",
                "Invalid email format",
            ));
        }

        Ok(())
    }
}

/// UK phone number: `+44` or `0`, a non-zero digit, then 8 to 10 digits.
/// Whitespace anywhere in the value is ignored.
pub struct UkPhone {
    pub label: &'static str,
}

impl ValidationRule<str> for UkPhone {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if !UK_PHONE_REGEX.is_match(&compact) {
            return Err(ValidationError::new(
                field_name,
                "INVALID_PHONE",
                &format!("Invalid {} phone number format", self.label),
            ));
        }
        Ok(())
    }
}

/// Looser phone shape enforced at the storage boundary.
pub struct PhoneCharset {
    pub label: &'static str,
}

impl ValidationRule<str> for PhoneCharset {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        if !PHONE_CHARSET_REGEX.is_match(value) {
            return Err(ValidationError::new(
                field_name,
                "INVALID_PHONE",
                &format!("Invalid {} number format", self.label),
            ));
        }
        Ok(())
    }
}

/// Which UK postcode shape a [`UkPostcode`] rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostcodeShape {
    /// Shape accepted from clients.
    Request,
    /// Shape re-checked before a record is written.
    Stored,
}

pub struct UkPostcode {
    pub shape: PostcodeShape,
}

impl ValidationRule<str> for UkPostcode {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        let regex = match self.shape {
            PostcodeShape::Request => &*UK_POSTCODE_REGEX,
            PostcodeShape::Stored => &*STORED_POSTCODE_REGEX,
        };
        if !regex.is_match(value.trim()) {
            return Err(ValidationError::new(
                field_name,
                "INVALID_POSTCODE",
                "Invalid UK postcode format",
            ));
        }
        Ok(())
    }
}

/// One-of validation for enums or allowed values
pub struct OneOf {
    pub allowed_values: &'static [&'static str],
    pub message: &'static str,
}

impl ValidationRule<str> for OneOf {
    fn validate(&self, value: &str, field_name: &str) -> ValidationResult<()> {
        if !self.allowed_values.contains(&value) {
            return Err(ValidationError::new(field_name, "INVALID_VALUE", self.message));
        }
        Ok(())
    }
}

/// Rejects dates after a reference day.
pub struct NotInFuture {
    pub today: NaiveDate,
    pub message: &'static str,
}

impl ValidationRule<NaiveDate> for NotInFuture {
    fn validate(&self, value: &NaiveDate, field_name: &str) -> ValidationResult<()> {
        if *value > self.today {
            return Err(ValidationError::new(field_name, "DATE_IN_FUTURE", self.message));
        }
        Ok(())
    }
}

/// Inclusive age bound for a date of birth, measured on `today`.
pub struct AgeRange {
    pub min: i32,
    pub max: i32,
    pub today: NaiveDate,
}

impl ValidationRule<NaiveDate> for AgeRange {
    fn validate(&self, value: &NaiveDate, field_name: &str) -> ValidationResult<()> {
        let age = age_on(*value, self.today);
        if age < self.min || age > self.max {
            return Err(ValidationError::new(
                field_name,
                "AGE_OUT_OF_RANGE",
                &format!("Age must be between {} and {} years", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Whole years between `dob` and `today`, one less when the birthday has not
/// yet been reached in `today`'s year.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date whose
/// year lies strictly between 1900 and 2100.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })?;
    (date.year() > 1900 && date.year() < 2100).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_required_rejects_blank() {
        let rule = Required {
            message: "Forename is required",
        };
        assert!(rule.validate("John", "forename").is_ok());
        let err = rule.validate("   ", "forename").unwrap_err();
        assert_eq!(err.code, "REQUIRED");
        assert_eq!(err.field, "forename");
    }

    #[test]
    fn test_length_counts_characters() {
        let rule = Length {
            min: Some(1),
            max: Some(3),
            label: "Name",
            wording: MaxWording::LessThan,
        };
        assert!(rule.validate("Zoë", "forename").is_ok());
        assert_eq!(rule.validate("", "forename").unwrap_err().code, "TOO_SHORT");
        assert_eq!(rule.validate("Zoëy", "forename").unwrap_err().code, "TOO_LONG");
    }

    #[test]
    fn test_length_message_wording() {
        let request = Length {
            min: None,
            max: Some(500),
            label: "Notes",
            wording: MaxWording::LessThan,
        };
        let long = "x".repeat(501);
        assert!(request.validate(&"x".repeat(500), "notes").is_ok());
        assert_eq!(
            request.validate(&long, "notes").unwrap_err().message,
            "Notes must be less than 500 characters"
        );

        let stored = Length {
            wording: MaxWording::CannotExceed,
            max: Some(50),
            label: "Forename",
            ..request
        };
        assert_eq!(
            stored.validate(&"x".repeat(51), "forename").unwrap_err().message,
            "Forename cannot exceed 50 characters"
        );

        let password = Length {
            min: Some(6),
            max: None,
            label: "Password",
            wording: MaxWording::LessThan,
        };
        assert_eq!(
            password.validate("12345", "onlinePassword").unwrap_err().message,
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_email_validation() {
        assert!(Email.validate("a@b.com", "email").is_ok());
        assert!(Email.validate("john.smith+tag@example.co.uk", "email").is_ok());
        for bad in ["plainaddress", "@missing.com", "user@", "user@domain", "a b@c.com"] {
            assert!(Email.validate(bad, "email").is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_uk_phone_formats() {
        let rule = UkPhone { label: "mobile" };
        for good in ["07123456789", "01234567890", "+447123456789", "0207 123 4567", "07123 456789"] {
            assert!(rule.validate(good, "home.mobile").is_ok(), "{good} should pass");
        }
        for bad in [
            "123",
            "invalid-phone",
            "12345678901234567890",
            "00123456789",
            "+1234567890",
            "abcdefghijk",
            "07123-456-789",
        ] {
            let err = rule.validate(bad, "home.mobile").unwrap_err();
            assert_eq!(err.message, "Invalid mobile phone number format");
        }
    }

    #[test]
    fn test_postcode_shapes() {
        let rule = UkPostcode {
            shape: PostcodeShape::Request,
        };
        for good in ["SO16 3AB", "M1 1AA", "B33 8TH", "W1A 0AX", "EC1A 1BB", "so16 3ab", "SO163AB"] {
            assert!(rule.validate(good, "pickupAddress.postcode").is_ok(), "{good}");
        }
        for bad in ["INVALID", "12345", "SO16", "SO16 3ABC", "123 ABC", "SO16  3AB"] {
            assert!(rule.validate(bad, "pickupAddress.postcode").is_err(), "{bad}");
        }
    }

    #[test]
    fn test_one_of() {
        let rule = OneOf {
            allowed_values: &["Male", "Female", "Other"],
            message: "Gender must be Male, Female, or Other",
        };
        assert!(rule.validate("Other", "gender").is_ok());
        assert_eq!(rule.validate("male", "gender").unwrap_err().code, "INVALID_VALUE");
    }

    #[test]
    fn test_age_on_adjusts_for_unreached_birthday() {
        assert_eq!(age_on(day(2000, 6, 15), day(2016, 6, 14)), 15);
        assert_eq!(age_on(day(2000, 6, 15), day(2016, 6, 15)), 16);
        assert_eq!(age_on(day(2000, 2, 29), day(2017, 2, 28)), 16);
    }

    #[test]
    fn test_age_range_boundaries() {
        let today = day(2026, 10, 18);
        let rule = AgeRange {
            min: 16,
            max: 100,
            today,
        };
        assert!(rule.validate(&day(2010, 10, 18), "dob").is_ok());
        assert!(rule.validate(&day(1926, 10, 18), "dob").is_ok());
        assert!(rule.validate(&day(2010, 10, 19), "dob").is_err());
        assert!(rule.validate(&day(1925, 10, 18), "dob").is_err());
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(parse_calendar_date("1995-03-15"), Some(day(1995, 3, 15)));
        assert_eq!(
            parse_calendar_date("1995-03-15T00:00:00.000Z"),
            Some(day(1995, 3, 15))
        );
        assert_eq!(parse_calendar_date("1899-12-31"), None);
        assert_eq!(parse_calendar_date("not-a-date"), None);
        assert_eq!(parse_calendar_date("2023-02-30"), None);
    }
}
