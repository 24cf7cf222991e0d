//! Request-level pupil validation.
//!
//! Walks [`PUPIL_FIELDS`] over an untyped JSON payload, collecting every
//! violation with its dotted path and building a normalized copy of the
//! payload on the way: strings trimmed, emails lowercased, postcodes
//! uppercased, dates rewritten as `YYYY-MM-DD`, create-time defaults filled in
//! and unknown keys dropped. Nothing here touches storage.

use chrono::NaiveDate;
use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::functional::validation_engine::{ValidationContext, ValidationEngine, ValidationOutcome};
use crate::functional::validation_rules::{
    parse_calendar_date, AgeRange, Email, Length, MaxWording, NotInFuture, OneOf, PostcodeShape,
    UkPhone, UkPostcode, ValidationError,
};
use crate::models::pupil::fields::{
    DateRule, DefaultValue, FieldKind, FieldRule, Mode, MAX_AGE, MIN_AGE, PUPIL_FIELDS,
};
use crate::models::pupil::PupilFields;

/// Every field-level violation found in one payload, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    fn single(field: &str, code: &str, message: &str) -> Self {
        ValidationErrors(vec![ValidationError::new(field, code, message)])
    }
}

/// Validates `payload` in `mode`, returning the normalized object on success.
pub fn validate_payload(
    payload: &Value,
    mode: Mode,
    today: NaiveDate,
) -> ValidationOutcome<Map<String, Value>> {
    let mut engine = ValidationEngine::new();

    let Some(object) = payload.as_object() else {
        engine.push(ValidationError::new(
            "body",
            "INVALID_TYPE",
            "Request body must be a JSON object",
        ));
        return engine.finish(Map::new());
    };

    let mut validator = PayloadValidator {
        engine,
        mode,
        today,
    };
    let normalized = validator.object(object, PUPIL_FIELDS, &ValidationContext::default());

    if validator.engine.has_errors() {
        debug!(
            "Pupil payload rejected ({:?}): {}",
            mode,
            validator.engine.failing_fields()
        );
    }
    validator.engine.finish(normalized)
}

/// Stage-1 check for a create request.
pub fn validate_create(payload: &Value, today: NaiveDate) -> Result<PupilFields, ValidationErrors> {
    let normalized = validate_payload(payload, Mode::Create, today)
        .into_result()
        .map_err(ValidationErrors)?;

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| ValidationErrors::single("body", "INVALID_TYPE", &e.to_string()))
}

/// Stage-1 check for an update request.
pub fn validate_update(payload: &Value, today: NaiveDate) -> Result<PupilPatch, ValidationErrors> {
    validate_payload(payload, Mode::Update, today)
        .into_result()
        .map(PupilPatch)
        .map_err(ValidationErrors)
}

/// A validated partial update. A `null` value clears an optional field;
/// nested objects are merged field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PupilPatch(pub Map<String, Value>);

impl PupilPatch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The email this patch sets, if it touches the field at all.
    /// `Some(None)` means the patch clears it.
    pub fn email(&self) -> Option<Option<&str>> {
        self.0.get("email").map(Value::as_str)
    }

    pub fn apply(&self, current: &PupilFields) -> Result<PupilFields, serde_json::Error> {
        let mut document = match serde_json::to_value(current)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in &self.0 {
            match (value, document.get_mut(key)) {
                (Value::Null, _) => {
                    document.remove(key);
                }
                (Value::Object(changes), Some(Value::Object(existing))) => {
                    merge_nested(existing, changes);
                }
                (value, _) => {
                    document.insert(key.clone(), strip_nulls(value));
                }
            }
        }

        serde_json::from_value(Value::Object(document))
    }
}

fn merge_nested(existing: &mut Map<String, Value>, changes: &Map<String, Value>) {
    for (key, value) in changes {
        if value.is_null() {
            existing.remove(key);
        } else {
            existing.insert(key.clone(), value.clone());
        }
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

struct PayloadValidator {
    engine: ValidationEngine,
    mode: Mode,
    today: NaiveDate,
}

impl PayloadValidator {
    fn object(
        &mut self,
        object: &Map<String, Value>,
        rules: &[FieldRule],
        context: &ValidationContext,
    ) -> Map<String, Value> {
        let mut normalized = Map::new();

        for rule in rules {
            let field = context.child(rule.name);
            match object.get(rule.name) {
                Some(value) if !is_blank(value) => {
                    if let Some(clean) = self.value(rule, value, &field) {
                        normalized.insert(rule.name.to_string(), clean);
                    }
                }
                supplied => self.absent(rule, supplied.is_some(), &field, &mut normalized),
            }
        }

        for key in object.keys() {
            if !rules.iter().any(|rule| rule.name == key) {
                debug!("Dropping unknown field {}", context.child(key).field_path);
            }
        }

        normalized
    }

    /// Handles a field that is missing, `null` or an empty string.
    fn absent(
        &mut self,
        rule: &FieldRule,
        supplied: bool,
        field: &ValidationContext,
        normalized: &mut Map<String, Value>,
    ) {
        match self.mode {
            Mode::Create if rule.required => self.engine.push(ValidationError::new(
                &field.field_path,
                "REQUIRED",
                &format!("{} is required", rule.label),
            )),
            Mode::Create => {
                if let Some(default) = rule.default {
                    normalized.insert(rule.name.to_string(), default_value(default));
                }
            }
            Mode::Update if !supplied => {}
            Mode::Update if rule.required => self.engine.push(ValidationError::new(
                &field.field_path,
                "REQUIRED",
                &format!("{} cannot be empty if provided", rule.label),
            )),
            Mode::Update => match rule.kind {
                // An enum has no blank member; clearing is not an option.
                FieldKind::Choice { message, .. } => self.engine.push(ValidationError::new(
                    &field.field_path,
                    "INVALID_VALUE",
                    message,
                )),
                _ if rule.clearable() => {
                    normalized.insert(rule.name.to_string(), Value::Null);
                }
                _ => {}
            },
        }
    }

    fn value(&mut self, rule: &FieldRule, value: &Value, field: &ValidationContext) -> Option<Value> {
        match rule.kind {
            FieldKind::Nested(children) => match value.as_object() {
                Some(nested) => Some(Value::Object(self.object(nested, children, field))),
                None => {
                    self.type_error(field, &format!("{} must be an object", rule.label));
                    None
                }
            },
            FieldKind::Flag => match value {
                Value::Bool(_) => Some(value.clone()),
                _ => {
                    self.type_error(field, &format!("{} must be true or false", rule.label));
                    None
                }
            },
            _ => {
                let Some(raw) = value.as_str() else {
                    self.type_error(field, &format!("{} must be a string", rule.label));
                    return None;
                };
                self.text(rule, raw.trim(), field)
            }
        }
    }

    fn text(&mut self, rule: &FieldRule, trimmed: &str, field: &ValidationContext) -> Option<Value> {
        let engine = &mut self.engine;
        let clean = match rule.kind {
            FieldKind::Text { max } => {
                let length = Length {
                    min: None,
                    max,
                    label: rule.label,
                    wording: MaxWording::LessThan,
                };
                engine
                    .validate_field(trimmed, field, &[&length])
                    .then(|| trimmed.to_string())
            }
            FieldKind::Email => {
                let email = trimmed.to_lowercase();
                engine
                    .validate_field(email.as_str(), field, &[&Email])
                    .then_some(email)
            }
            FieldKind::Choice { values, message } => {
                let one_of = OneOf {
                    allowed_values: values,
                    message,
                };
                engine
                    .validate_field(trimmed, field, &[&one_of])
                    .then(|| trimmed.to_string())
            }
            FieldKind::Password { min } => {
                let length = Length {
                    min: Some(min),
                    max: None,
                    label: rule.label,
                    wording: MaxWording::LessThan,
                };
                engine
                    .validate_field(trimmed, field, &[&length])
                    .then(|| trimmed.to_string())
            }
            FieldKind::Phone { label } => engine
                .validate_field(trimmed, field, &[&UkPhone { label }])
                .then(|| trimmed.to_string()),
            FieldKind::Postcode => {
                let postcode = trimmed.to_uppercase();
                let rule = UkPostcode {
                    shape: PostcodeShape::Request,
                };
                engine
                    .validate_field(postcode.as_str(), field, &[&rule])
                    .then_some(postcode)
            }
            FieldKind::Date(date_rule) => return self.date(date_rule, trimmed, field),
            FieldKind::Flag | FieldKind::Nested(_) => None,
        };
        clean.map(Value::String)
    }

    fn date(&mut self, rule: DateRule, raw: &str, field: &ValidationContext) -> Option<Value> {
        let (format_message, future_message) = match rule {
            DateRule::BirthDate => (
                "Invalid date format. Use YYYY-MM-DD format",
                "Date of birth cannot be in the future",
            ),
            DateRule::PastEvent => (
                "Invalid date format for date passed. Use YYYY-MM-DD format",
                "Date passed cannot be in the future",
            ),
        };

        let Some(date) = parse_calendar_date(raw) else {
            self.engine.push(ValidationError::new(
                &field.field_path,
                "INVALID_DATE",
                format_message,
            ));
            return None;
        };

        let not_in_future = NotInFuture {
            today: self.today,
            message: future_message,
        };
        let passed = match rule {
            DateRule::BirthDate => {
                let age_range = AgeRange {
                    min: MIN_AGE,
                    max: MAX_AGE,
                    today: self.today,
                };
                self.engine
                    .validate_field(&date, field, &[&not_in_future, &age_range])
            }
            DateRule::PastEvent => self.engine.validate_field(&date, field, &[&not_in_future]),
        };

        passed.then(|| Value::String(date.format("%Y-%m-%d").to_string()))
    }

    fn type_error(&mut self, field: &ValidationContext, message: &str) {
        self.engine
            .push(ValidationError::new(&field.field_path, "INVALID_TYPE", message));
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn default_value(default: DefaultValue) -> Value {
    match default {
        DefaultValue::Text(text) => Value::String(text.to_string()),
        DefaultValue::Flag(flag) => Value::Bool(flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pupil::{Address, Gender, LicenseType, PupilType};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn minimal() -> Value {
        json!({
            "forename": "John",
            "surname": "Smith",
            "dob": "1995-03-15",
            "gender": "Male"
        })
    }

    fn fields_of(errors: &ValidationErrors) -> Vec<&str> {
        errors.0.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_create_fills_defaults() {
        let fields = validate_create(&minimal(), today()).unwrap();
        assert_eq!(fields.pupil_type, PupilType::ManualGearbox);
        assert_eq!(fields.license_type, LicenseType::NoLicense);
        assert_eq!(fields.discount, "0%");
        assert_eq!(fields.pupil_owner.as_deref(), Some("Instructor"));
        assert!(!fields.passed_theory && !fields.fott && !fields.full_access);
    }

    #[test]
    fn test_create_collects_every_error() {
        let payload = json!({
            "forename": "   ",
            "dob": "2030-01-01",
            "gender": "male",
            "email": "not-an-email",
            "home": { "mobile": "123" },
            "pickupAddress": { "postcode": "INVALID" }
        });
        let errors = validate_create(&payload, today()).unwrap_err();
        assert_eq!(
            fields_of(&errors),
            vec![
                "forename",
                "surname",
                "email",
                "dob",
                "gender",
                "home.mobile",
                "pickupAddress.postcode"
            ]
        );
        assert_eq!(errors.0[0].message, "Forename is required");
        assert_eq!(errors.0[3].code, "DATE_IN_FUTURE");
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let mut payload = minimal();
        payload["forename"] = json!("  John ");
        payload["email"] = json!(" John.Smith@Example.COM ");
        payload["pickupAddress"] = json!({ "postcode": " so16 3ab ", "houseNo": " 12 " });
        let fields = validate_create(&payload, today()).unwrap();
        assert_eq!(fields.forename, "John");
        assert_eq!(fields.email.as_deref(), Some("john.smith@example.com"));
        assert_eq!(
            fields.pickup_address,
            Some(Address {
                postcode: Some("SO16 3AB".into()),
                house_no: Some("12".into()),
                address: None,
            })
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut payload = minimal();
        payload["email"] = json!("A@B.com");
        payload["dob"] = json!("1995-03-15T00:00:00.000Z");
        payload["homeAddress"] = json!({ "postcode": "m1 1aa" });
        let once = validate_payload(&payload, Mode::Create, today()).into_result().unwrap();
        let twice = validate_payload(&Value::Object(once.clone()), Mode::Create, today())
            .into_result()
            .unwrap();
        assert_eq!(once, twice);
        assert_eq!(once["dob"], json!("1995-03-15"));
    }

    #[test]
    fn test_age_boundaries() {
        for (dob, ok) in [
            ("2010-10-18", true),
            ("1926-10-18", true),
            ("2010-10-19", false),
            ("1925-10-18", false),
        ] {
            let mut payload = minimal();
            payload["dob"] = json!(dob);
            match validate_create(&payload, today()) {
                Ok(_) => assert!(ok, "{dob} should fail"),
                Err(errors) => {
                    assert!(!ok, "{dob} should pass");
                    assert_eq!(fields_of(&errors), vec!["dob"]);
                    assert_eq!(errors.0[0].code, "AGE_OUT_OF_RANGE");
                }
            }
        }
    }

    #[test]
    fn test_empty_strings_are_not_provided() {
        let mut payload = minimal();
        payload["email"] = json!("");
        payload["home"] = json!({ "mobile": "", "work": "07123 456789" });
        let fields = validate_create(&payload, today()).unwrap();
        assert_eq!(fields.email, None);
        let home = fields.home.unwrap();
        assert_eq!(home.mobile, None);
        assert_eq!(home.work.as_deref(), Some("07123 456789"));
    }

    #[test]
    fn test_type_mismatches() {
        let mut payload = minimal();
        payload["fott"] = json!("yes");
        payload["home"] = json!("07123456789");
        let errors = validate_create(&payload, today()).unwrap_err();
        assert!(errors.0.iter().all(|e| e.code == "INVALID_TYPE"));
        assert_eq!(fields_of(&errors), vec!["home", "fott"]);

        let errors = validate_create(&json!([1, 2]), today()).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["body"]);
    }

    #[test]
    fn test_unknown_keys_are_stripped() {
        let mut payload = minimal();
        payload["id"] = json!("507f1f77bcf86cd799439011");
        payload["createdAt"] = json!("2020-01-01T00:00:00Z");
        let normalized = validate_payload(&payload, Mode::Create, today())
            .into_result()
            .unwrap();
        assert!(!normalized.contains_key("id"));
        assert!(!normalized.contains_key("createdAt"));
    }

    #[test]
    fn test_update_only_touches_supplied_fields() {
        let patch = validate_update(&json!({ "pickupAddress": { "postcode": "so16 3ab" } }), today())
            .unwrap();
        assert_eq!(patch.0.len(), 1);
        assert_eq!(patch.email(), None);

        let mut current = validate_create(&minimal(), today()).unwrap();
        current.pickup_address = Some(Address {
            postcode: None,
            house_no: Some("12".into()),
            address: Some("High Street".into()),
        });
        let updated = patch.apply(&current).unwrap();
        let pickup = updated.pickup_address.clone().unwrap();
        assert_eq!(pickup.postcode.as_deref(), Some("SO16 3AB"));
        assert_eq!(pickup.house_no.as_deref(), Some("12"));
        assert_eq!(updated.forename, current.forename);
        assert_eq!(updated.gender, Gender::Male);
    }

    #[test]
    fn test_update_rejects_emptied_required_field() {
        let errors = validate_update(&json!({ "forename": "" }), today()).unwrap_err();
        assert_eq!(errors.0[0].message, "Forename cannot be empty if provided");
        assert_eq!(errors.0[0].code, "REQUIRED");
    }

    #[test]
    fn test_update_clears_optional_fields() {
        let mut current = validate_create(&minimal(), today()).unwrap();
        current.email = Some("a@b.com".into());
        current.notes = Some("note".into());

        let patch = validate_update(&json!({ "email": "", "notes": null, "discount": "" }), today())
            .unwrap();
        assert_eq!(patch.email(), Some(None));
        let updated = patch.apply(&current).unwrap();
        assert_eq!(updated.email, None);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.discount, "0%");
    }

    #[test]
    fn test_create_enforces_field_rules() {
        let mut payload = minimal();
        payload["title"] = json!("Sir");
        payload["pupilType"] = json!("Bus");
        payload["licenseType"] = json!("Full");
        payload["datePassed"] = json!("2027-01-01");
        payload["onlinePassword"] = json!("12345");
        payload["notes"] = json!("x".repeat(501));

        let errors = validate_create(&payload, today()).unwrap_err();
        let found: Vec<(&str, &str, &str)> = errors
            .0
            .iter()
            .map(|e| (e.field.as_str(), e.code.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("title", "INVALID_VALUE", "Title must be one of Mr, Mrs, Miss, Ms or Dr"),
                ("pupilType", "INVALID_VALUE", "Invalid pupil type"),
                ("licenseType", "INVALID_VALUE", "Invalid license type"),
                ("datePassed", "DATE_IN_FUTURE", "Date passed cannot be in the future"),
                ("onlinePassword", "TOO_SHORT", "Password must be at least 6 characters"),
                ("notes", "TOO_LONG", "Notes must be less than 500 characters"),
            ]
        );
    }

    #[test]
    fn test_create_accepts_field_rule_limits() {
        let mut payload = minimal();
        payload["title"] = json!("Dr");
        payload["pupilType"] = json!("Automatic");
        payload["licenseType"] = json!("Provisional");
        payload["datePassed"] = json!("2026-10-18");
        payload["onlinePassword"] = json!("123456");
        payload["notes"] = json!("x".repeat(500));

        let fields = validate_create(&payload, today()).unwrap();
        assert_eq!(fields.pupil_type, PupilType::Automatic);
        assert_eq!(fields.license_type, LicenseType::Provisional);
        assert_eq!(fields.date_passed, Some(today()));
        assert_eq!(fields.notes.map(|n| n.len()), Some(500));
    }

    #[test]
    fn test_update_rejects_blank_enums() {
        for (payload, field, message) in [
            (json!({ "pupilType": "" }), "pupilType", "Invalid pupil type"),
            (json!({ "licenseType": null }), "licenseType", "Invalid license type"),
            (
                json!({ "title": "  " }),
                "title",
                "Title must be one of Mr, Mrs, Miss, Ms or Dr",
            ),
        ] {
            let errors = validate_update(&payload, today()).unwrap_err();
            assert_eq!(fields_of(&errors), vec![field]);
            assert_eq!(errors.0[0].code, "INVALID_VALUE");
            assert_eq!(errors.0[0].message, message);
        }
    }

    #[test]
    fn test_update_checks_field_rules() {
        let errors = validate_update(
            &json!({ "datePassed": "2027-01-01", "onlinePassword": "12345" }),
            today(),
        )
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["datePassed", "onlinePassword"]);
    }

    #[test]
    fn test_update_revalidates_age_bound() {
        let errors = validate_update(&json!({ "dob": "2015-01-01" }), today()).unwrap_err();
        assert_eq!(errors.0[0].code, "AGE_OUT_OF_RANGE");
    }
}
