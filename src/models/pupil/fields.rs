//! Field rule table shared by the create and update validators.
//!
//! Each entry names a wire field, what kind of value it holds, whether a
//! create request must supply it and the default a create request receives
//! when it is omitted. Update requests read the same table and ignore only the
//! required/default columns.

use crate::models::pupil::{Gender, LicenseType, PupilType, Title};

/// Validation mode for an inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// Not in the future and implying an age in `[16, 100]`.
    BirthDate,
    /// Not in the future.
    PastEvent,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Trimmed text with an optional maximum length.
    Text { max: Option<usize> },
    /// Trimmed, lowercased email address.
    Email,
    /// Calendar date as `YYYY-MM-DD`.
    Date(DateRule),
    /// Closed set of string values.
    Choice {
        values: &'static [&'static str],
        message: &'static str,
    },
    Flag,
    Password { min: usize },
    /// UK phone number; `label` names the number in messages.
    Phone { label: &'static str },
    /// UK postcode, stored uppercased.
    Postcode,
    /// Nested object whose fields are all optional.
    Nested(&'static [FieldRule]),
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Text(&'static str),
    Flag(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    /// Human name used in messages ("Forename", "Date of birth").
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl FieldRule {
    const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: None,
        }
    }

    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            default: None,
        }
    }

    const fn defaulted(
        name: &'static str,
        label: &'static str,
        kind: FieldKind,
        default: DefaultValue,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: Some(default),
        }
    }

    const fn flag(name: &'static str, label: &'static str) -> Self {
        Self::defaulted(name, label, FieldKind::Flag, DefaultValue::Flag(false))
    }

    /// Whether an update may clear this field with `null` or an empty string.
    pub fn clearable(&self) -> bool {
        !self.required && self.default.is_none()
    }
}

pub const NAME_MAX: usize = 50;
pub const NOTES_MAX: usize = 500;
pub const STORED_NOTES_MAX: usize = 1000;
pub const PASSWORD_MIN: usize = 6;
pub const MIN_AGE: i32 = 16;
pub const MAX_AGE: i32 = 100;

pub const CONTACT_FIELDS: &[FieldRule] = &[
    FieldRule::optional("mobile", "Mobile", FieldKind::Phone { label: "mobile" }),
    FieldRule::optional("work", "Work", FieldKind::Phone { label: "work" }),
];

pub const ADDRESS_FIELDS: &[FieldRule] = &[
    FieldRule::optional("postcode", "Postcode", FieldKind::Postcode),
    FieldRule::optional("houseNo", "House number", FieldKind::Text { max: None }),
    FieldRule::optional("address", "Address", FieldKind::Text { max: None }),
];

pub const PUPIL_FIELDS: &[FieldRule] = &[
    FieldRule::optional(
        "title",
        "Title",
        FieldKind::Choice {
            values: Title::VALUES,
            message: "Title must be one of Mr, Mrs, Miss, Ms or Dr",
        },
    ),
    FieldRule::required("forename", "Forename", FieldKind::Text { max: Some(NAME_MAX) }),
    FieldRule::required("surname", "Surname", FieldKind::Text { max: Some(NAME_MAX) }),
    FieldRule::optional("email", "Email", FieldKind::Email),
    FieldRule::required("dob", "Date of birth", FieldKind::Date(DateRule::BirthDate)),
    FieldRule::required(
        "gender",
        "Gender",
        FieldKind::Choice {
            values: Gender::VALUES,
            message: "Gender must be Male, Female, or Other",
        },
    ),
    FieldRule::optional("home", "Contact details", FieldKind::Nested(CONTACT_FIELDS)),
    FieldRule::flag("allowTextMessaging", "Allow text messaging"),
    FieldRule::optional("pickupAddress", "Pickup address", FieldKind::Nested(ADDRESS_FIELDS)),
    FieldRule::optional("homeAddress", "Home address", FieldKind::Nested(ADDRESS_FIELDS)),
    FieldRule::defaulted(
        "pupilType",
        "Pupil type",
        FieldKind::Choice {
            values: PupilType::VALUES,
            message: "Invalid pupil type",
        },
        DefaultValue::Text("Manual Gearbox"),
    ),
    FieldRule::defaulted(
        "pupilOwner",
        "Pupil owner",
        FieldKind::Text { max: None },
        DefaultValue::Text("Instructor"),
    ),
    FieldRule::optional("allocatedTo", "Allocated to", FieldKind::Text { max: None }),
    FieldRule::defaulted(
        "licenseType",
        "License type",
        FieldKind::Choice {
            values: LicenseType::VALUES,
            message: "Invalid license type",
        },
        DefaultValue::Text("No License"),
    ),
    FieldRule::optional("licenseNo", "License number", FieldKind::Text { max: None }),
    FieldRule::flag("passedTheory", "Passed theory"),
    FieldRule::optional("certNo", "Certificate number", FieldKind::Text { max: None }),
    FieldRule::optional("datePassed", "Date passed", FieldKind::Date(DateRule::PastEvent)),
    FieldRule::flag("fott", "FOTT"),
    FieldRule::flag("fullAccess", "Full access"),
    FieldRule::optional("usualAvailability", "Usual availability", FieldKind::Text { max: None }),
    FieldRule::defaulted(
        "discount",
        "Discount",
        FieldKind::Text { max: None },
        DefaultValue::Text("0%"),
    ),
    FieldRule::optional("defaultProduct", "Default product", FieldKind::Text { max: None }),
    FieldRule::optional(
        "onlinePassword",
        "Password",
        FieldKind::Password { min: PASSWORD_MIN },
    ),
    FieldRule::flag("pupilCaution", "Pupil caution"),
    FieldRule::optional("notes", "Notes", FieldKind::Text { max: Some(NOTES_MAX) }),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = PUPIL_FIELDS.iter().map(|rule| rule.name).collect();
        assert_eq!(names.len(), PUPIL_FIELDS.len());
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<_> = PUPIL_FIELDS
            .iter()
            .filter(|rule| rule.required)
            .map(|rule| rule.name)
            .collect();
        assert_eq!(required, vec!["forename", "surname", "dob", "gender"]);
    }

    #[test]
    fn test_nested_fields_are_optional() {
        for rule in CONTACT_FIELDS.iter().chain(ADDRESS_FIELDS) {
            assert!(rule.clearable(), "{} should be optional", rule.name);
        }
    }
}
