//! Reusable validation building blocks shared by the request validator and
//! the storage-boundary constraint checks.

pub mod validation_engine;
pub mod validation_rules;
