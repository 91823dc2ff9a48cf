//! Error types module
//!
//! `AppError` is the client-facing error for everything outside the processing
//! pipeline's own taxonomy: persistence failures, lookups that miss, invalid input.
//! Pipeline layers keep their own `thiserror` enums and convert at the boundary.
//!
//! The `Database` variant wraps `sqlx::Error` only when the `sqlx` feature is enabled.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::validation::PathError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as a bad asset path
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Describes how an error should be presented to a client.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from the internal message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid status transition for project {project_id}: {from} -> {to}")]
    InvalidTransition {
        project_id: uuid::Uuid,
        from: String,
        to: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

/// An invalid client path is reported as not-found so the response never reveals
/// whether anything exists behind it.
impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::InvalidTransition { .. } => 409,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::InvalidTransition { .. } => {
                "Project is already being processed".to_string()
            }
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidInput(_) | AppError::NotFound(_) => LogLevel::Debug,
            AppError::PayloadTooLarge(_) | AppError::InvalidTransition { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_maps_to_not_found() {
        let err: AppError = PathError::InvalidPath("../x".to_string()).into();
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.client_message(), "Resource not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::Internal("disk exploded at /var/lib".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(!err.client_message().contains("/var/lib"));
    }

    #[test]
    fn test_transition_conflict_is_a_warning() {
        let err = AppError::InvalidTransition {
            project_id: uuid::Uuid::nil(),
            from: "processing".to_string(),
            to: "processing".to_string(),
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_STATUS_TRANSITION");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }
}
