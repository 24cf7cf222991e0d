//! Pupil identifiers: 24 lowercase hex characters made of a 4-byte seconds
//! timestamp, 5 process-random bytes and a 3-byte counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ID_LEN: usize = 24;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| rand::thread_rng().gen());
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::thread_rng().gen()));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{0} parameter is required")]
    Missing(&'static str),
    #[error("Invalid {param} format: expected a 24 character hex string")]
    Malformed { param: &'static str, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PupilId(String);

impl PupilId {
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        PupilId(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Parses the `id` path parameter.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        Self::parse_param("id", raw)
    }

    pub fn parse_param(param: &'static str, raw: &str) -> Result<Self, IdError> {
        if raw.is_empty() {
            return Err(IdError::Missing(param));
        }
        if raw.len() != ID_LEN || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::Malformed {
                param,
                raw: raw.to_string(),
            });
        }
        Ok(PupilId(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PupilId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PupilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
