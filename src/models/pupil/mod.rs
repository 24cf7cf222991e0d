//! Pupil Module
//!
//! The single record type managed by the service: a driving-school pupil with
//! personal details, contact numbers, two postal addresses and licence
//! metadata. Identity and timestamps are owned by storage and the constraint
//! enforcer; everything else lives in [`PupilFields`].

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::functional::validation_rules::age_on;

pub mod fields;
pub mod id;
pub mod projection;
pub mod validators;

pub use id::{IdError, PupilId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Title {
    Mr,
    Mrs,
    Miss,
    Ms,
    Dr,
}

impl Title {
    pub const VALUES: &'static [&'static str] = &["Mr", "Mrs", "Miss", "Ms", "Dr"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const VALUES: &'static [&'static str] = &["Male", "Female", "Other"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum PupilType {
    #[default]
    #[serde(rename = "Manual Gearbox")]
    #[display(fmt = "Manual Gearbox")]
    ManualGearbox,
    Automatic,
    Motorcycle,
    #[serde(rename = "HGV")]
    #[display(fmt = "HGV")]
    Hgv,
}

impl PupilType {
    pub const VALUES: &'static [&'static str] = &["Manual Gearbox", "Automatic", "Motorcycle", "HGV"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum LicenseType {
    #[default]
    #[serde(rename = "No License")]
    #[display(fmt = "No License")]
    NoLicense,
    Provisional,
    #[serde(rename = "Full License")]
    #[display(fmt = "Full License")]
    FullLicense,
}

impl LicenseType {
    pub const VALUES: &'static [&'static str] = &["No License", "Provisional", "Full License"];
}

/// Phone numbers for the `home` contact block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
}

/// A pickup or home address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn default_pupil_owner() -> Option<String> {
    Some("Instructor".to_string())
}

fn default_discount() -> String {
    "0%".to_string()
}

/// Every client-settable attribute of a pupil.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PupilFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub forename: String,
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub dob: NaiveDate,
    pub gender: Gender,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Contact>,
    #[serde(default)]
    pub allow_text_messaging: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_address: Option<Address>,

    #[serde(default)]
    pub pupil_type: PupilType,
    #[serde(default = "default_pupil_owner", skip_serializing_if = "Option::is_none")]
    pub pupil_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_to: Option<String>,
    #[serde(default)]
    pub license_type: LicenseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_no: Option<String>,
    #[serde(default)]
    pub passed_theory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_passed: Option<NaiveDate>,
    #[serde(default)]
    pub fott: bool,
    #[serde(default)]
    pub full_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usual_availability: Option<String>,
    #[serde(default = "default_discount")]
    pub discount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_password: Option<String>,
    #[serde(default)]
    pub pupil_caution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PupilFields {
    /// A record holding only the required fields, every other field defaulted.
    pub fn new(forename: &str, surname: &str, dob: NaiveDate, gender: Gender) -> Self {
        Self {
            title: None,
            forename: forename.to_string(),
            surname: surname.to_string(),
            email: None,
            dob,
            gender,
            home: None,
            allow_text_messaging: false,
            pickup_address: None,
            home_address: None,
            pupil_type: PupilType::default(),
            pupil_owner: default_pupil_owner(),
            allocated_to: None,
            license_type: LicenseType::default(),
            license_no: None,
            passed_theory: false,
            cert_no: None,
            date_passed: None,
            fott: false,
            full_access: false,
            usual_availability: None,
            discount: default_discount(),
            default_product: None,
            online_password: None,
            pupil_caution: false,
            notes: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }

    pub fn mobile(&self) -> Option<&str> {
        self.home.as_ref().and_then(|home| home.mobile.as_deref())
    }
}

/// A stored pupil: storage-assigned identity, the client fields and the
/// lifecycle timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pupil {
    pub id: PupilId,
    #[serde(flatten)]
    pub fields: PupilFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pupil {
    pub fn full_name(&self) -> String {
        self.fields.full_name()
    }

    /// Age in whole years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.fields.dob, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PupilFields {
        PupilFields::new(
            "John",
            "Smith",
            NaiveDate::from_ymd_opt(1995, 3, 15).unwrap(),
            Gender::Male,
        )
    }

    #[test]
    fn test_defaults() {
        let fields = sample();
        assert_eq!(fields.pupil_type, PupilType::ManualGearbox);
        assert_eq!(fields.license_type, LicenseType::NoLicense);
        assert_eq!(fields.discount, "0%");
        assert_eq!(fields.pupil_owner.as_deref(), Some("Instructor"));
        assert!(!fields.allow_text_messaging);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(PupilType::Hgv).unwrap(), json!("HGV"));
        assert_eq!(
            serde_json::to_value(LicenseType::FullLicense).unwrap(),
            json!("Full License")
        );
        assert_eq!(PupilType::ManualGearbox.to_string(), "Manual Gearbox");
        for value in PupilType::VALUES {
            assert!(serde_json::from_value::<PupilType>(json!(value)).is_ok());
        }
        for value in LicenseType::VALUES {
            assert!(serde_json::from_value::<LicenseType>(json!(value)).is_ok());
        }
        for value in Title::VALUES {
            assert!(serde_json::from_value::<Title>(json!(value)).is_ok());
        }
        for value in Gender::VALUES {
            assert!(serde_json::from_value::<Gender>(json!(value)).is_ok());
        }
    }

    #[test]
    fn test_camel_case_wire_shape() {
        let mut fields = sample();
        fields.pickup_address = Some(Address {
            postcode: Some("SO16 3AB".into()),
            house_no: Some("12".into()),
            address: None,
        });
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["dob"], json!("1995-03-15"));
        assert_eq!(value["pupilType"], json!("Manual Gearbox"));
        assert_eq!(value["pickupAddress"]["houseNo"], json!("12"));
        assert!(value.get("email").is_none());
        assert!(value["pickupAddress"].get("address").is_none());
    }

    #[test]
    fn test_full_name_and_age() {
        let pupil = Pupil {
            id: PupilId::generate(),
            fields: sample(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(pupil.full_name(), "John Smith");
        assert_eq!(pupil.age_on(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()), 30);
        assert_eq!(pupil.age_on(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()), 31);
    }
}
