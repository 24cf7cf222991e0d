use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::models::pupil::{Pupil, PupilFields, PupilId};
use crate::repository::{PupilStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    records: HashMap<PupilId, Pupil>,
    /// Lowercased email -> owning record, the in-memory unique index.
    email_index: HashMap<String, PupilId>,
}

impl Tables {
    fn claim_email(&mut self, fields: &PupilFields, owner: &PupilId) -> StoreResult<()> {
        let Some(email) = index_key(fields) else {
            return Ok(());
        };
        if matches!(self.email_index.get(&email), Some(existing) if existing != owner) {
            return Err(StoreError::DuplicateKey {
                field: "email".to_string(),
            });
        }
        self.email_index.insert(email, owner.clone());
        Ok(())
    }

    fn release_email(&mut self, fields: &PupilFields) {
        if let Some(email) = index_key(fields) {
            self.email_index.remove(&email);
        }
    }
}

fn index_key(fields: &PupilFields) -> Option<String> {
    fields
        .email
        .as_deref()
        .filter(|email| !email.is_empty())
        .map(str::to_lowercase)
}

/// Process-local store with the same unique-email behaviour as the
/// Postgres table. Backs `STORAGE_BACKEND=memory` and the test suites.
#[derive(Default)]
pub struct MemoryPupilStore {
    tables: Mutex<Tables>,
}

impl MemoryPupilStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl PupilStore for MemoryPupilStore {
    fn insert(&self, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil> {
        let mut tables = self.lock()?;
        let id = PupilId::generate();
        tables.claim_email(fields, &id)?;

        let pupil = Pupil {
            id: id.clone(),
            fields: fields.clone(),
            created_at: at,
            updated_at: at,
        };
        tables.records.insert(id, pupil.clone());
        Ok(pupil)
    }

    fn replace(&self, id: &PupilId, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil> {
        let mut tables = self.lock()?;
        let previous = tables
            .records
            .get(id)
            .map(|pupil| pupil.fields.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if index_key(&previous) != index_key(fields) {
            tables.claim_email(fields, id)?;
            tables.release_email(&previous);
        }

        let pupil = tables
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        pupil.fields = fields.clone();
        pupil.updated_at = at;
        Ok(pupil.clone())
    }

    fn find_by_id(&self, id: &PupilId) -> StoreResult<Option<Pupil>> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn find_by_email(&self, email: &str, exclude: Option<&PupilId>) -> StoreResult<Option<Pupil>> {
        let tables = self.lock()?;
        Ok(tables
            .email_index
            .get(&email.to_lowercase())
            .filter(|id| Some(*id) != exclude)
            .and_then(|id| tables.records.get(id))
            .cloned())
    }

    fn find_by_mobile(&self, mobile: &str) -> StoreResult<Vec<Pupil>> {
        let tables = self.lock()?;
        let mut matches: Vec<Pupil> = tables
            .records
            .values()
            .filter(|pupil| pupil.fields.mobile() == Some(mobile))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    fn list_newest_first(&self) -> StoreResult<Vec<Pupil>> {
        let tables = self.lock()?;
        let mut pupils: Vec<Pupil> = tables.records.values().cloned().collect();
        pupils.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(pupils)
    }

    fn delete(&self, id: &PupilId) -> StoreResult<Option<Pupil>> {
        let mut tables = self.lock()?;
        let removed = tables.records.remove(id);
        if let Some(pupil) = &removed {
            tables.release_email(&pupil.fields);
        }
        Ok(removed)
    }

    fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}
