//! Postgres-backed pupil storage.
//!
//! Each pupil is one row: the client fields as a JSONB document, with the
//! email and mobile number lifted into their own columns so the unique email
//! index and the mobile lookup can use them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::config::db::{Connection, Pool};
use crate::models::pupil::{Pupil, PupilFields, PupilId};
use crate::repository::{PupilStore, StoreError, StoreResult};
use crate::schema::pupils;

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = pupils)]
struct PupilRow {
    id: String,
    email: Option<String>,
    mobile: Option<String>,
    document: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PupilRow {
    fn new(id: &PupilId, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Self> {
        Ok(PupilRow {
            id: id.to_string(),
            email: fields.email.as_deref().map(str::to_lowercase),
            mobile: fields.mobile().map(str::to_string),
            document: encode(fields)?,
            created_at: at,
            updated_at: at,
        })
    }

    fn into_pupil(self) -> StoreResult<Pupil> {
        let id = PupilId::parse(&self.id)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {}", self.id, e)))?;
        let fields = serde_json::from_value(self.document)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {}", id, e)))?;
        Ok(Pupil {
            id,
            fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn encode(fields: &PupilFields) -> StoreResult<serde_json::Value> {
    serde_json::to_value(fields).map_err(|e| StoreError::Backend(e.to_string()))
}

fn map_diesel_error(err: DieselError) -> StoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let field = match info.constraint_name() {
                Some(constraint) if constraint.contains("email") => "email",
                _ => "id",
            };
            StoreError::DuplicateKey {
                field: field.to_string(),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => {
            log::error!("Pupil storage query failed: {}", err);
            StoreError::Backend(err.to_string())
        }
    }
}

fn rows_into_pupils(rows: Vec<PupilRow>) -> StoreResult<Vec<Pupil>> {
    rows.into_iter().map(PupilRow::into_pupil).collect()
}

pub struct PgPupilStore {
    pool: Pool,
}

impl PgPupilStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn with_conn<T>(
        &self,
        query: impl FnOnce(&mut Connection) -> Result<T, DieselError>,
    ) -> StoreResult<T> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        query(&mut conn).map_err(map_diesel_error)
    }
}

impl PupilStore for PgPupilStore {
    fn insert(&self, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil> {
        let row = PupilRow::new(&PupilId::generate(), fields, at)?;
        self.with_conn(|conn| {
            diesel::insert_into(pupils::table)
                .values(&row)
                .get_result::<PupilRow>(conn)
        })?
        .into_pupil()
    }

    fn replace(&self, id: &PupilId, fields: &PupilFields, at: DateTime<Utc>) -> StoreResult<Pupil> {
        let row = PupilRow::new(id, fields, at)?;
        self.with_conn(|conn| {
            diesel::update(pupils::table.find(id.as_str()))
                .set((
                    pupils::email.eq(&row.email),
                    pupils::mobile.eq(&row.mobile),
                    pupils::document.eq(&row.document),
                    pupils::updated_at.eq(at),
                ))
                .get_result::<PupilRow>(conn)
                .optional()
        })?
        .ok_or_else(|| StoreError::NotFound(id.clone()))?
        .into_pupil()
    }

    fn find_by_id(&self, id: &PupilId) -> StoreResult<Option<Pupil>> {
        self.with_conn(|conn| {
            pupils::table
                .find(id.as_str())
                .first::<PupilRow>(conn)
                .optional()
        })?
        .map(PupilRow::into_pupil)
        .transpose()
    }

    fn find_by_email(&self, email: &str, exclude: Option<&PupilId>) -> StoreResult<Option<Pupil>> {
        let email = email.to_lowercase();
        self.with_conn(|conn| {
            let mut query = pupils::table
                .filter(pupils::email.eq(&email))
                .into_boxed();
            if let Some(excluded) = exclude {
                query = query.filter(pupils::id.ne(excluded.as_str()));
            }
            query.first::<PupilRow>(conn).optional()
        })?
        .map(PupilRow::into_pupil)
        .transpose()
    }

    fn find_by_mobile(&self, mobile: &str) -> StoreResult<Vec<Pupil>> {
        let rows = self.with_conn(|conn| {
            pupils::table
                .filter(pupils::mobile.eq(mobile))
                .order(pupils::created_at.desc())
                .load::<PupilRow>(conn)
        })?;
        rows_into_pupils(rows)
    }

    fn list_newest_first(&self) -> StoreResult<Vec<Pupil>> {
        let rows = self.with_conn(|conn| {
            pupils::table
                .order((pupils::created_at.desc(), pupils::id.desc()))
                .load::<PupilRow>(conn)
        })?;
        rows_into_pupils(rows)
    }

    fn delete(&self, id: &PupilId) -> StoreResult<Option<Pupil>> {
        self.with_conn(|conn| {
            diesel::delete(pupils::table.find(id.as_str()))
                .get_result::<PupilRow>(conn)
                .optional()
        })?
        .map(PupilRow::into_pupil)
        .transpose()
    }

    fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| diesel::sql_query("SELECT 1").execute(conn))
            .map(|_| ())
    }
}
