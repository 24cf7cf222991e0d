//! Pupil registration backend.
//!
//! Requests pass through two checks before anything is stored: request-level
//! validation of the untyped JSON body ([`models::pupil::validators`]) and
//! storage-level constraint enforcement ([`services::pupil_service`]). Every
//! failure from either stage, or from storage, leaves the service as one
//! [`error::ServiceError`] envelope.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod functional;
pub mod models;
pub mod repository;
pub mod schema;
pub mod services;
pub mod utils;
