//! Pupil constraint enforcement.
//!
//! The write path for validated records. Before anything reaches a
//! [`PupilStore`] the record is normalized again and re-checked against the
//! storage-level field rules, the email-uniqueness pre-check runs, and the
//! lifecycle timestamps are assigned. The pre-check and the write are not
//! atomic; a store's unique index is the authority and a rejection from it
//! surfaces as [`ConstraintError::StorageConstraintViolation`].

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::functional::validation_engine::{ValidationContext, ValidationEngine};
use crate::functional::validation_rules::{
    Email, Length, MaxWording, NotInFuture, PhoneCharset, PostcodeShape, Required, UkPostcode, ValidationError,
};
use crate::models::pupil::fields::{NAME_MAX, STORED_NOTES_MAX};
use crate::models::pupil::validators::PupilPatch;
use crate::models::pupil::{Address, Contact, Pupil, PupilFields, PupilId};
use crate::repository::{PupilStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("email {email} already belongs to another pupil")]
    DuplicateEmail { email: String },

    #[error("pupil {0} not found")]
    NotFound(PupilId),

    /// The store's unique index rejected the write.
    #[error("storage rejected duplicate {field}")]
    StorageConstraintViolation { field: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Storage-level field rules failed.
    #[error("{} field(s) failed storage validation", .0.len())]
    FieldViolations(Vec<ValidationError>),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ConstraintError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateKey { field } => {
                ConstraintError::StorageConstraintViolation { field }
            }
            StoreError::NotFound(id) => ConstraintError::NotFound(id),
            StoreError::Unavailable(cause) => ConstraintError::StorageUnavailable(cause),
            StoreError::Corrupt(_) | StoreError::Backend(_) => {
                ConstraintError::Internal(error.to_string())
            }
        }
    }
}

pub type ConstraintResult<T> = Result<T, ConstraintError>;

/// What remains of a deleted pupil for the response body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub id: PupilId,
    pub full_name: String,
    pub deleted_at: DateTime<Utc>,
}

pub fn create(store: &dyn PupilStore, fields: PupilFields) -> ConstraintResult<Pupil> {
    create_at(store, fields, Utc::now())
}

pub fn create_at(
    store: &dyn PupilStore,
    fields: PupilFields,
    now: DateTime<Utc>,
) -> ConstraintResult<Pupil> {
    let fields = enforce(fields, now.date_naive())?;
    ensure_email_available(store, fields.email.as_deref(), None)?;

    let pupil = store.insert(&fields, now)?;
    info!("Created pupil {}", pupil.id);
    Ok(pupil)
}

/// Applies `patch` to the stored record. Read-modify-write: a concurrent
/// update of the same record may be overwritten.
pub fn update(store: &dyn PupilStore, id: &PupilId, patch: &PupilPatch) -> ConstraintResult<Pupil> {
    update_at(store, id, patch, Utc::now())
}

pub fn update_at(
    store: &dyn PupilStore,
    id: &PupilId,
    patch: &PupilPatch,
    now: DateTime<Utc>,
) -> ConstraintResult<Pupil> {
    let current = get(store, id)?;
    let merged = patch
        .apply(&current.fields)
        .map_err(|e| ConstraintError::Internal(format!("failed to merge update: {}", e)))?;
    let fields = enforce(merged, now.date_naive())?;

    if fields.email != current.fields.email {
        ensure_email_available(store, fields.email.as_deref(), Some(id))?;
    }

    let pupil = store.replace(id, &fields, now)?;
    info!("Updated pupil {}", pupil.id);
    Ok(pupil)
}

pub fn get(store: &dyn PupilStore, id: &PupilId) -> ConstraintResult<Pupil> {
    store
        .find_by_id(id)?
        .ok_or_else(|| ConstraintError::NotFound(id.clone()))
}

/// All pupils, newest first.
pub fn list(store: &dyn PupilStore) -> ConstraintResult<Vec<Pupil>> {
    Ok(store.list_newest_first()?)
}

pub fn delete(store: &dyn PupilStore, id: &PupilId) -> ConstraintResult<DeletionSummary> {
    let pupil = store
        .delete(id)?
        .ok_or_else(|| ConstraintError::NotFound(id.clone()))?;
    info!("Deleted pupil {}", pupil.id);
    Ok(DeletionSummary {
        full_name: pupil.full_name(),
        id: pupil.id,
        deleted_at: Utc::now(),
    })
}

/// Case-insensitive lookup by email.
pub fn find_by_email(store: &dyn PupilStore, email: &str) -> ConstraintResult<Option<Pupil>> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Ok(None);
    }
    Ok(store.find_by_email(&email, None)?)
}

pub fn find_by_mobile(store: &dyn PupilStore, mobile: &str) -> ConstraintResult<Vec<Pupil>> {
    let mobile = mobile.trim();
    if mobile.is_empty() {
        return Ok(Vec::new());
    }
    Ok(store.find_by_mobile(mobile)?)
}

fn ensure_email_available(
    store: &dyn PupilStore,
    email: Option<&str>,
    exclude: Option<&PupilId>,
) -> ConstraintResult<()> {
    let Some(email) = email else {
        return Ok(());
    };
    match store.find_by_email(email, exclude)? {
        Some(existing) => {
            warn!("Email {} already used by pupil {}", email, existing.id);
            Err(ConstraintError::DuplicateEmail {
                email: email.to_string(),
            })
        }
        None => Ok(()),
    }
}

/// Normalizes `fields` and re-checks the storage-level field rules.
pub fn enforce(fields: PupilFields, today: NaiveDate) -> ConstraintResult<PupilFields> {
    let fields = normalize(fields);
    let mut engine = ValidationEngine::new();
    let root = ValidationContext::default();

    for (name, value, label) in [
        ("forename", &fields.forename, "Forename"),
        ("surname", &fields.surname, "Surname"),
    ] {
        let required = Required {
            message: if name == "forename" {
                "Forename is required"
            } else {
                "Surname is required"
            },
        };
        let length = Length {
            min: None,
            max: Some(NAME_MAX),
            label,
            wording: MaxWording::CannotExceed,
        };
        engine.validate_field(value.as_str(), &root.child(name), &[&required, &length]);
    }

    if let Some(email) = &fields.email {
        engine.validate_field(email.as_str(), &root.child("email"), &[&Email]);
    }

    let dob_rule = NotInFuture {
        today,
        message: "Date of birth cannot be in the future",
    };
    engine.validate_field(&fields.dob, &root.child("dob"), &[&dob_rule]);
    if let Some(date_passed) = &fields.date_passed {
        let rule = NotInFuture {
            today,
            message: "Date passed cannot be in the future",
        };
        engine.validate_field(date_passed, &root.child("datePassed"), &[&rule]);
    }

    if let Some(home) = &fields.home {
        let context = root.child("home");
        for (name, value) in [("mobile", &home.mobile), ("work", &home.work)] {
            if let Some(number) = value {
                engine.validate_field(
                    number.as_str(),
                    &context.child(name),
                    &[&PhoneCharset { label: name }],
                );
            }
        }
    }

    for (name, address) in [
        ("pickupAddress", &fields.pickup_address),
        ("homeAddress", &fields.home_address),
    ] {
        if let Some(postcode) = address.as_ref().and_then(|a| a.postcode.as_ref()) {
            let rule = UkPostcode {
                shape: PostcodeShape::Stored,
            };
            engine.validate_field(
                postcode.as_str(),
                &root.child(name).child("postcode"),
                &[&rule],
            );
        }
    }

    if let Some(notes) = &fields.notes {
        let length = Length {
            min: None,
            max: Some(STORED_NOTES_MAX),
            label: "Notes",
            wording: MaxWording::CannotExceed,
        };
        engine.validate_field(notes.as_str(), &root.child("notes"), &[&length]);
    }

    if engine.has_errors() {
        debug!("Storage validation failed: {}", engine.failing_fields());
    }
    engine
        .finish(fields)
        .into_result()
        .map_err(ConstraintError::FieldViolations)
}

fn normalize(mut fields: PupilFields) -> PupilFields {
    fields.forename = fields.forename.trim().to_string();
    fields.surname = fields.surname.trim().to_string();
    fields.email = clean(fields.email).map(|email| email.to_lowercase());
    fields.home = fields.home.map(|home| Contact {
        mobile: clean(home.mobile),
        work: clean(home.work),
    });
    fields.pickup_address = fields.pickup_address.map(normalize_address);
    fields.home_address = fields.home_address.map(normalize_address);
    fields.notes = clean(fields.notes);
    fields
}

fn normalize_address(address: Address) -> Address {
    Address {
        postcode: clean(address.postcode).map(|postcode| postcode.to_uppercase()),
        house_no: clean(address.house_no),
        address: clean(address.address),
    }
}

/// Trims, mapping an empty result to `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
