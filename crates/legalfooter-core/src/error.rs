//! Error types and result handling for webhook operations.
//!
//! `CoreError` covers storage failures. `WebhookError` is the pipeline
//! taxonomy: only verification and method errors reach the HTTP response,
//! downstream failures are logged with their code and swallowed.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for storage operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Webhook pipeline errors with stable codes for log correlation.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Payload could not be authenticated or parsed (E1001).
    #[error("[E1001] Verification failed: {reason}")]
    Verification {
        /// Human-readable reason, returned to the caller when exposure is
        /// enabled
        reason: String,
    },

    /// Request used a method other than POST (E1002).
    #[error("[E1002] Method not allowed")]
    MethodNotAllowed,

    /// Policy insert failed (E2001).
    #[error("[E2001] Persistence failed: {0}")]
    Persistence(#[from] CoreError),

    /// Confirmation email could not be sent (E2002).
    #[error("[E2002] Notification failed: {0}")]
    Notification(String),
}

impl WebhookError {
    /// Returns the error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Verification { .. } => "E1001",
            Self::MethodNotAllowed => "E1002",
            Self::Persistence(_) => "E2001",
            Self::Notification(_) => "E2002",
        }
    }
}
