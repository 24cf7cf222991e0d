//! Error translation.
//!
//! Every failure that can end a request is converted into a [`ServiceError`]
//! and rendered in exactly one place, [`ResponseError::error_response`], as
//! the envelope
//!
//! ```text
//! { "success": false, "error": { "message", "type", "details"? } }
//! ```
//!
//! Internal causes are logged and never written to the response body.

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use log::{error, warn};
use serde::Serialize;
use thiserror::Error;

use crate::constants;
use crate::functional::validation_rules::ValidationError;
use crate::models::pupil::validators::ValidationErrors;
use crate::models::pupil::IdError;
use crate::repository::StoreError;
use crate::services::pupil_service::ConstraintError;

/// Machine-readable `error.type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    #[display(fmt = "VALIDATION_ERROR")]
    ValidationError,
    #[display(fmt = "DUPLICATE_ERROR")]
    DuplicateError,
    #[display(fmt = "DATABASE_VALIDATION_ERROR")]
    DatabaseValidationError,
    #[display(fmt = "INVALID_OBJECT_ID")]
    InvalidObjectId,
    #[display(fmt = "MISSING_PARAMETER")]
    MissingParameter,
    #[display(fmt = "NOT_FOUND")]
    NotFound,
    #[display(fmt = "JSON_PARSE_ERROR")]
    JsonParseError,
    #[display(fmt = "STORAGE_UNAVAILABLE")]
    StorageUnavailable,
    #[display(fmt = "INTERNAL_ERROR")]
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetail {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            code: None,
        }
    }
}

impl From<&ValidationError> for ErrorDetail {
    fn from(error: &ValidationError) -> Self {
        Self {
            field: error.field.clone(),
            message: error.message.clone(),
            code: Some(error.code.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<ValidationError>),

    #[error("Database validation failed")]
    DatabaseValidation(Vec<ValidationError>),

    #[error("Duplicate value for {field}")]
    Duplicate { field: String },

    #[error("Invalid {param} format")]
    InvalidObjectId { param: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Pupil not found")]
    NotFound { id: String },

    #[error("Route not found")]
    RouteNotFound { url: String },

    #[error("Invalid JSON in request body: {0}")]
    JsonParse(String),

    /// Storage unreachable or too slow; carries the internal cause.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Anything unclassified; carries the internal cause.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            ServiceError::Validation(_) => ErrorType::ValidationError,
            ServiceError::DatabaseValidation(_) => ErrorType::DatabaseValidationError,
            ServiceError::Duplicate { .. } => ErrorType::DuplicateError,
            ServiceError::InvalidObjectId { .. } => ErrorType::InvalidObjectId,
            ServiceError::MissingParameter(_) => ErrorType::MissingParameter,
            ServiceError::NotFound { .. } | ServiceError::RouteNotFound { .. } => {
                ErrorType::NotFound
            }
            ServiceError::JsonParse(_) => ErrorType::JsonParseError,
            ServiceError::StorageUnavailable(_) => ErrorType::StorageUnavailable,
            ServiceError::Internal(_) => ErrorType::InternalError,
        }
    }

    /// Client-facing message; never includes an internal cause.
    fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(_) => constants::MESSAGE_VALIDATION_FAILED.to_string(),
            ServiceError::DatabaseValidation(_) => {
                constants::MESSAGE_DATABASE_VALIDATION_FAILED.to_string()
            }
            ServiceError::Duplicate { field } if field == "email" => {
                constants::MESSAGE_EMAIL_EXISTS.to_string()
            }
            ServiceError::Duplicate { .. } => "Duplicate value error".to_string(),
            ServiceError::NotFound { .. } => constants::MESSAGE_PUPIL_NOT_FOUND.to_string(),
            ServiceError::RouteNotFound { .. } => constants::MESSAGE_ROUTE_NOT_FOUND.to_string(),
            ServiceError::JsonParse(_) => constants::MESSAGE_INVALID_JSON.to_string(),
            ServiceError::StorageUnavailable(_) => {
                constants::MESSAGE_STORAGE_UNAVAILABLE.to_string()
            }
            ServiceError::Internal(_) => constants::MESSAGE_INTERNAL_SERVER_ERROR.to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Vec<ErrorDetail>> {
        match self {
            ServiceError::Validation(errors) | ServiceError::DatabaseValidation(errors) => {
                Some(errors.iter().map(ErrorDetail::from).collect())
            }
            ServiceError::Duplicate { field } if field == "email" => Some(vec![ErrorDetail::new(
                field,
                constants::MESSAGE_EMAIL_EXISTS_DETAIL,
            )]),
            ServiceError::Duplicate { field } => Some(vec![ErrorDetail::new(
                field,
                &format!("{} already exists", field),
            )]),
            ServiceError::InvalidObjectId { param } => Some(vec![ErrorDetail::new(
                param,
                "Must be a 24 character hexadecimal string",
            )]),
            ServiceError::MissingParameter(param) => Some(vec![ErrorDetail::new(
                param,
                &format!("{} parameter is required", param),
            )]),
            ServiceError::NotFound { id } => Some(vec![ErrorDetail::new(
                "id",
                &format!("No pupil found with ID: {}", id),
            )]),
            ServiceError::RouteNotFound { url } => Some(vec![ErrorDetail::new(
                "url",
                &format!("Cannot find {} on this server", url),
            )]),
            ServiceError::JsonParse(reason) => Some(vec![ErrorDetail::new("body", reason)]),
            ServiceError::StorageUnavailable(_) | ServiceError::Internal(_) => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                message: self.public_message(),
                error_type: self.error_type(),
                details: self.details(),
            },
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self.error_type() {
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorType::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} ({}): {}", self.error_type(), status.as_u16(), self);
        } else {
            warn!("{} ({}): {}", self.error_type(), status.as_u16(), self);
        }
        HttpResponse::build(status).json(self.envelope())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors.0)
    }
}

impl From<IdError> for ServiceError {
    fn from(error: IdError) -> Self {
        match error {
            IdError::Missing(param) => ServiceError::MissingParameter(param.to_string()),
            IdError::Malformed { param, .. } => ServiceError::InvalidObjectId {
                param: param.to_string(),
            },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateKey { field } => ServiceError::Duplicate { field },
            StoreError::NotFound(id) => ServiceError::NotFound { id: id.to_string() },
            StoreError::Unavailable(cause) => ServiceError::StorageUnavailable(cause),
            StoreError::Corrupt(_) | StoreError::Backend(_) => {
                ServiceError::Internal(error.to_string())
            }
        }
    }
}

impl From<ConstraintError> for ServiceError {
    fn from(error: ConstraintError) -> Self {
        match error {
            ConstraintError::DuplicateEmail { .. } => ServiceError::Duplicate {
                field: "email".to_string(),
            },
            ConstraintError::StorageConstraintViolation { field } => {
                ServiceError::Duplicate { field }
            }
            ConstraintError::NotFound(id) => ServiceError::NotFound { id: id.to_string() },
            ConstraintError::FieldViolations(errors) => ServiceError::DatabaseValidation(errors),
            ConstraintError::StorageUnavailable(cause) => ServiceError::StorageUnavailable(cause),
            ConstraintError::Internal(cause) => ServiceError::Internal(cause),
        }
    }
}

impl From<JsonPayloadError> for ServiceError {
    fn from(error: JsonPayloadError) -> Self {
        match error {
            JsonPayloadError::Overflow { limit } => {
                ServiceError::JsonParse(format!("Request body exceeds {} bytes", limit))
            }
            JsonPayloadError::ContentType => {
                ServiceError::JsonParse("Content type must be application/json".to_string())
            }
            other => ServiceError::JsonParse(other.to_string()),
        }
    }
}
