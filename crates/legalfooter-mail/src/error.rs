//! Error types for email delivery.

use thiserror::Error;

/// Result type alias for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Email rendering and delivery errors.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// The policy has no email address to send to.
    #[error("no recipient address on policy {record_id}")]
    MissingRecipient {
        /// Record the email was for
        record_id: String,
    },

    /// Connection to the email API failed.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// The email API did not answer in time.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout in seconds
        timeout_seconds: u64,
    },

    /// The email API refused the message.
    #[error("email API rejected message: HTTP {status_code}: {body}")]
    Rejected {
        /// HTTP status code
        status_code: u16,
        /// Response body, truncated
        body: String,
    },

    /// The client could not be built.
    #[error("invalid mail client configuration: {message}")]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl MailError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}
