//! Collect-All Validation Engine
//!
//! Runs [`ValidationRule`]s field by field and accumulates every failure into
//! one ordered list, so a client sees all problems with a payload in a single
//! response. Field paths are tracked with [`ValidationContext`] using dot
//! notation (`home.mobile`, `pickupAddress.postcode`).

use itertools::Itertools;

use crate::functional::validation_rules::{ValidationError, ValidationRule};

/// Validation context for tracking field paths
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Current field path (e.g., "pickupAddress.postcode")
    pub field_path: String,
}

impl ValidationContext {
    pub fn new(field_path: &str) -> Self {
        Self {
            field_path: field_path.to_string(),
        }
    }

    /// Extends the current context with a nested field name using dot notation.
    ///
    /// ```
    /// let ctx = ValidationContext::new("home");
    /// assert_eq!(ctx.child("mobile").field_path, "home.mobile");
    /// assert_eq!(ValidationContext::default().child("dob").field_path, "dob");
    /// ```
    pub fn child(&self, field_name: &str) -> Self {
        let field_path = if self.field_path.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_path, field_name)
        };

        Self { field_path }
    }
}

/// Validation result with detailed error collection
#[derive(Debug, Clone)]
pub struct ValidationOutcome<T> {
    /// The validated value (if validation succeeded)
    pub value: Option<T>,
    /// Collection of validation errors
    pub errors: Vec<ValidationError>,
    /// Whether validation passed
    pub is_valid: bool,
}

impl<T> ValidationOutcome<T> {
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
            is_valid: true,
        }
    }

    pub fn failure(errors: Vec<ValidationError>) -> Self {
        Self {
            value: None,
            errors,
            is_valid: false,
        }
    }

    /// Converts into a `Result`, keeping the error list on failure.
    pub fn into_result(self) -> Result<T, Vec<ValidationError>> {
        match (self.is_valid, self.value) {
            (true, Some(value)) => Ok(value),
            _ => Err(self.errors),
        }
    }
}

/// Accumulates field errors across many `validate_field` calls.
#[derive(Debug, Default)]
pub struct ValidationEngine {
    errors: Vec<ValidationError>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `rules` in order to one value and records the first failure.
    ///
    /// Returns `true` when every rule passed.
    pub fn validate_field<T: ?Sized>(
        &mut self,
        value: &T,
        context: &ValidationContext,
        rules: &[&dyn ValidationRule<T>],
    ) -> bool {
        match rules
            .iter()
            .find_map(|rule| rule.validate(value, &context.field_path).err())
        {
            Some(error) => {
                self.errors.push(error);
                false
            }
            None => true,
        }
    }

    /// Records an error produced outside a rule (type mismatches, parse failures).
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Comma separated list of failing paths, for log lines.
    pub fn failing_fields(&self) -> String {
        self.errors.iter().map(|e| e.field.as_str()).unique().join(", ")
    }

    /// Wraps `value` in a successful outcome when nothing failed.
    pub fn finish<T>(self, value: T) -> ValidationOutcome<T> {
        if self.errors.is_empty() {
            ValidationOutcome::success(value)
        } else {
            ValidationOutcome::failure(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional::validation_rules::{Email, Length, MaxWording, Required};

    #[test]
    fn test_child_paths() {
        let root = ValidationContext::default();
        assert_eq!(root.child("home").child("mobile").field_path, "home.mobile");
    }

    #[test]
    fn test_collects_errors_across_fields() {
        let mut engine = ValidationEngine::new();
        let root = ValidationContext::default();
        let required = Required {
            message: "Forename is required",
        };

        assert!(!engine.validate_field("", &root.child("forename"), &[&required]));
        assert!(!engine.validate_field("nope", &root.child("email"), &[&Email]));
        assert!(engine.validate_field("a@b.com", &root.child("email"), &[&Email]));

        let outcome = engine.finish(());
        assert!(!outcome.is_valid);
        let fields: Vec<_> = outcome.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["forename", "email"]);
    }

    #[test]
    fn test_first_failing_rule_per_field() {
        let mut engine = ValidationEngine::new();
        let required = Required {
            message: "Surname is required",
        };
        let length = Length {
            min: Some(1),
            max: Some(50),
            label: "Surname",
            wording: MaxWording::LessThan,
        };
        engine.validate_field("", &ValidationContext::new("surname"), &[&required, &length]);
        assert_eq!(engine.errors().len(), 1);
        assert_eq!(engine.errors()[0].code, "REQUIRED");
    }

    #[test]
    fn test_failing_fields_are_deduplicated() {
        let mut engine = ValidationEngine::new();
        engine.validate_field("x", &ValidationContext::new("email"), &[&Email]);
        engine.push(ValidationError::new("email", "INVALID_TYPE", "Email must be a string"));
        engine.validate_field("y", &ValidationContext::new("home.mobile"), &[&Email]);
        assert_eq!(engine.errors().len(), 3);
        assert_eq!(engine.failing_fields(), "email, home.mobile");
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(ValidationOutcome::success(3).into_result(), Ok(3));
        let err = ValidationError::new("dob", "INVALID_DATE", "bad");
        assert_eq!(
            ValidationOutcome::<i32>::failure(vec![err.clone()]).into_result(),
            Err(vec![err])
        );
    }
}
