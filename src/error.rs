//! Error types for index-checker
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (admission, database, persistence)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, UserId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for index-checker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for index-checker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "dispatch.batch_size")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Job could not be admitted
    #[error("admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    /// Result file could not be written
    #[error("failed to persist results to {path}: {source}")]
    Persistence {
        /// Target file
        path: PathBuf,
        /// Underlying I/O or CSV error
        source: std::io::Error,
    },

    /// Invalid request input
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Caller may not access the resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Caller did not identify itself
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Reasons a job is refused before any lookup runs
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The user's balance does not cover one credit per URL
    #[error("job {job_id}: insufficient credits, need {required}, have {available}")]
    InsufficientCredits {
        /// Job that was marked as errored
        job_id: JobId,
        /// Credits needed (one per URL)
        required: i64,
        /// Credits the user has
        available: i64,
    },

    /// The ledger has no such user
    #[error("job {job_id}: unknown user {user_id}")]
    UnknownUser {
        /// Job that was marked as errored
        job_id: JobId,
        /// Requested user
        user_id: UserId,
    },

    /// The ledger refused or failed the deduction
    #[error("job {job_id}: failed to deduct credits: {reason}")]
    DeductionFailed {
        /// Job that was marked as errored
        job_id: JobId,
        /// Ledger error message
        reason: String,
    },
}

impl AdmissionError {
    /// Job the rejection was recorded against
    pub fn job_id(&self) -> JobId {
        match self {
            AdmissionError::InsufficientCredits { job_id, .. }
            | AdmissionError::UnknownUser { job_id, .. }
            | AdmissionError::DeductionFailed { job_id, .. } => *job_id,
        }
    }

    /// Short message stored on the errored job
    pub fn job_message(&self) -> String {
        match self {
            AdmissionError::InsufficientCredits { .. } => "Insufficient credits".to_string(),
            AdmissionError::UnknownUser { .. } => "Unknown user".to_string(),
            AdmissionError::DeductionFailed { .. } => "Failed to deduct credits".to_string(),
        }
    }
}

/// Standard API error response
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "insufficient_credits",
///     "message": "admission rejected: job 3: insufficient credits, need 40, have 10",
///     "details": { "job_id": 3, "required": 40, "available": 10 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            Error::Unauthorized(_) => 401,

            // 402 Payment Required - the job was not paid for; details carry its ID
            Error::Admission(_) => 402,

            Error::Forbidden(_) => 403,

            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Persistence { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            Error::Network(_) => 502,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Admission(e) => match e {
                AdmissionError::InsufficientCredits { .. } => "insufficient_credits",
                AdmissionError::UnknownUser { .. } => "unknown_user",
                AdmissionError::DeductionFailed { .. } => "deduction_failed",
            },
            Error::Persistence { .. } => "persistence_error",
            Error::Validation(_) => "validation_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::Unauthorized(_) => "unauthorized",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Admission(AdmissionError::InsufficientCredits {
                job_id,
                required,
                available,
            }) => Some(serde_json::json!({
                "job_id": job_id,
                "required": required,
                "available": available,
            })),
            Error::Admission(AdmissionError::UnknownUser { job_id, user_id }) => {
                Some(serde_json::json!({
                    "job_id": job_id,
                    "user_id": user_id,
                }))
            }
            Error::Admission(AdmissionError::DeductionFailed { job_id, .. }) => {
                Some(serde_json::json!({
                    "job_id": job_id,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
