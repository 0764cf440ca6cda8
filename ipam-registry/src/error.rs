//! Error types for ipam-registry
//!
//! [`RegistryError`] is the failure taxonomy of the engine and the importer.
//! [`ApiError`] maps it onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ipam_common::AddressSummary;
use serde_json::json;
use thiserror::Error;

/// Engine and import failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Input rejected before touching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Address string already owned by another record
    #[error("Address already exists: {existing}")]
    DuplicateAddress { existing: AddressSummary },

    /// A write inside a transaction failed; the whole unit was rolled back
    #[error("Relation write failed: {0}")]
    RelationWriteFailure(String),

    /// Connection-level failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Record id does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for engine and import operations
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    pub fn duplicate(existing: AddressSummary) -> Self {
        RegistryError::DuplicateAddress { existing }
    }
}

/// True when the unique index on `addresses.address` rejected a write
pub fn is_address_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.message().contains("addresses.address")
        }
        _ => false,
    }
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => RegistryError::StoreUnavailable(err.to_string()),
            sqlx::Error::RowNotFound => RegistryError::NotFound(err.to_string()),
            other => RegistryError::RelationWriteFailure(other.to_string()),
        }
    }
}

impl From<ipam_common::Error> for RegistryError {
    fn from(err: ipam_common::Error) -> Self {
        match err {
            ipam_common::Error::Database(e) => e.into(),
            ipam_common::Error::Io(e) => RegistryError::StoreUnavailable(e.to_string()),
            other => RegistryError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<csv::Error> for RegistryError {
    fn from(err: csv::Error) -> Self {
        RegistryError::Validation(format!("delimited text: {}", err))
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Engine or importer failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// ipam-common error
    #[error("Common error: {0}")]
    Common(#[from] ipam_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, existing) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Registry(err) => {
                let message = err.to_string();
                match err {
                    RegistryError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, None)
                    }
                    RegistryError::DuplicateAddress { existing } => (
                        StatusCode::CONFLICT,
                        "DUPLICATE_ADDRESS",
                        message,
                        Some(existing),
                    ),
                    RegistryError::NotFound(_) => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", message, None)
                    }
                    RegistryError::StoreUnavailable(_) => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "STORE_UNAVAILABLE",
                        message,
                        None,
                    ),
                    RegistryError::RelationWriteFailure(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "RELATION_WRITE_FAILURE",
                        message,
                        None,
                    ),
                }
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
                None,
            ),
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(existing) = existing {
            error["existing"] = json!(existing);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
