//! Unified error handling for avmctl-core
//!
//! Every failure in the operation chain maps onto one [`CoreError`] variant,
//! with helper methods for classifying it.
//!
//! # Example
//!
//! ```rust
//! use avmctl_core::CoreError;
//!
//! fn handle_error(err: CoreError) {
//!     if err.is_not_found() {
//!         println!("VM not found");
//!     } else if err.is_unauthorized() {
//!         println!("Check the service principal");
//!     }
//! }
//!
//! let err = CoreError::NotFound("virtualMachines/web-01".to_string());
//! assert!(err.is_not_found());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Core error type for the operation chain
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or malformed input (empty identity or credential field)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The identity provider rejected the credentials, or ARM rejected the token (401)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The VM or resource group does not exist (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The service principal lacks rights on the resource (403)
    #[error("Permission denied: {0}")]
    Permission(String),

    /// API or transport failure from the provider
    #[error("Provider error{}: {message}", fmt_status(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// Webhook mode selected without a webhook URL, or another bad setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Webhook delivery failed; never fatal to the VM operation
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Long-running operation reached a failed or canceled terminal state
    #[error("Operation failed: {0}")]
    TaskFailed(String),

    /// Long-running operation did not finish within the configured wait timeout
    #[error("Operation timed out after {0:?}")]
    TaskTimeout(Duration),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Build a provider error from an HTTP status and message
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        CoreError::Provider {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    /// Returns true if this is an authentication error (401 or token rejection)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Auth(_))
    }

    /// Returns true if this is a permission error (403)
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, CoreError::Permission(_))
    }

    /// Returns true if this is a validation error
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, CoreError::Provider { status: Some(s), .. } if *s >= 500)
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::TaskTimeout(_))
    }

    /// Returns true for errors raised by the notification step
    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self, CoreError::Notify(_) | CoreError::Config(_))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            CoreError::provider(status, format!("request timed out: {err}"))
        } else if err.is_connect() {
            CoreError::provider(status, format!("connection failed: {err}"))
        } else {
            CoreError::provider(status, err.to_string())
        }
    }
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::Config(format!("invalid URL: {err}"))
    }
}
