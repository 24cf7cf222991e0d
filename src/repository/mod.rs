//! Pupil storage.
//!
//! [`PupilStore`] is the narrow contract the constraint enforcer writes
//! through. Implementations are blocking; async callers run them on the
//! blocking pool. Every store must reject a second record with the same
//! non-empty email with [`StoreError::DuplicateKey`], independently of any
//! pre-check done by the caller.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::pupil::{Pupil, PupilFields, PupilId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryPupilStore;
pub use postgres::PgPupilStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate value for unique field {field}")]
    DuplicateKey { field: String },
    #[error("record {0} not found")]
    NotFound(PupilId),
    /// The backend could not be reached (pool exhausted, connection lost).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A stored document could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("storage error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait PupilStore: Send + Sync {
    /// Stores a new record, assigning its id and both timestamps from `at`.
    fn insert(&self, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil>;

    /// Overwrites the fields of an existing record and sets `updatedAt` to `at`.
    fn replace(&self, id: &PupilId, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil>;

    fn find_by_id(&self, id: &PupilId) -> StoreResult<Option<Pupil>>;

    /// Looks up a record by its normalized (lowercase) email, ignoring `exclude`.
    fn find_by_email(&self, email: &str, exclude: Option<&PupilId>) -> StoreResult<Option<Pupil>>;

    fn find_by_mobile(&self, mobile: &str) -> StoreResult<Vec<Pupil>>;

    /// Every record, most recently created first.
    fn list_newest_first(&self) -> StoreResult<Vec<Pupil>>;

    /// Removes a record, returning it if it existed.
    fn delete(&self, id: &PupilId) -> StoreResult<Option<Pupil>>;

    /// Cheap liveness probe used by the health endpoint.
    fn ping(&self) -> StoreResult<()>;
}
