//! Error types for avmctl
//!
//! Core and config errors are mapped onto [`AvmCtlError`], which knows how to
//! print itself as a cargo-style diagnostic with suggestions.

use avmctl_core::config::ConfigError;
use avmctl_core::error::CoreError;
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Missing required settings: subscription id, client secret
///
///   tip: pass them as flags, e.g. --subscription-id <ID>
///
///   tip: or export AZURE_SUBSCRIPTION_ID, AZURE_CLIENT_SECRET
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// A required setting, with where it can come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSetting {
    pub name: &'static str,
    pub flag: &'static str,
    pub env: &'static str,
}

/// Main error type for the avmctl application
#[derive(Error, Debug)]
pub enum AvmCtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("Missing required settings: {}", .missing.iter().map(|m| m.name).collect::<Vec<_>>().join(", "))]
    MissingSettings { missing: Vec<MissingSetting> },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("VM not found: {message}")]
    VmNotFound { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("{failed} of {total} batch targets failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for avmctl operations
pub type Result<T> = std::result::Result<T, AvmCtlError>;

impl AvmCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            AvmCtlError::ProfileNotFound { name } => vec![
                "List available profiles: avmctl profile list".to_string(),
                format!(
                    "Create profile '{}': avmctl profile set {} --subscription-id <ID> --tenant-id <ID> --client-id <ID> --client-secret <SECRET>",
                    name, name
                ),
                "Check profile name spelling".to_string(),
            ],
            AvmCtlError::MissingSettings { missing } => {
                let mut tips: Vec<String> = missing
                    .iter()
                    .map(|m| format!("Set {} with {} or {}", m.name, m.flag, m.env))
                    .collect();
                tips.push("Or store them in a profile: avmctl profile set --help".to_string());
                tips
            }
            AvmCtlError::AuthenticationFailed { .. } => vec![
                "Check the service principal: avmctl profile show <profile>".to_string(),
                "Verify tenant id, client id and client secret are correct".to_string(),
                "Client secrets expire; create a new one if needed".to_string(),
            ],
            AvmCtlError::PermissionDenied { .. } => vec![
                "Grant the service principal 'Virtual Machine Contributor' on the VM or resource group".to_string(),
                "Check that you're using the correct subscription".to_string(),
            ],
            AvmCtlError::VmNotFound { .. } => vec![
                "Verify the VM name and resource group".to_string(),
                "Check that you're using the correct subscription".to_string(),
            ],
            AvmCtlError::Timeout { .. } => vec![
                "The operation may still be running; check with: avmctl status".to_string(),
                "Increase the limit with --wait-timeout <SECONDS>".to_string(),
            ],
            AvmCtlError::BatchFailed { .. } => vec![
                "Re-run with -o json to see the error for each target".to_string(),
            ],
            AvmCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: avmctl <command> --help".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if matches!(self, AvmCtlError::MissingSettings { .. }) {
            diag = diag.detail(
                "Settings are read from flags, then environment variables, then the selected profile.",
            );
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<CoreError> for AvmCtlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => AvmCtlError::InvalidInput { message },
            CoreError::Auth(message) => AvmCtlError::AuthenticationFailed { message },
            CoreError::NotFound(message) => AvmCtlError::VmNotFound { message },
            CoreError::Permission(message) => AvmCtlError::PermissionDenied { message },
            CoreError::Config(message) => AvmCtlError::Config(message),
            CoreError::TaskFailed(message) => AvmCtlError::OperationFailed { message },
            CoreError::TaskTimeout(duration) => AvmCtlError::Timeout {
                message: format!("Operation timed out after {} seconds", duration.as_secs()),
            },
            err @ (CoreError::Provider { .. } | CoreError::Notify(_)) => AvmCtlError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for AvmCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => AvmCtlError::ProfileNotFound { name },
            other => AvmCtlError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AvmCtlError {
    fn from(err: serde_json::Error) -> Self {
        AvmCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for AvmCtlError {
    fn from(err: std::io::Error) -> Self {
        AvmCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for AvmCtlError {
    fn from(err: anyhow::Error) -> Self {
        AvmCtlError::Config(format!("{:#}", err))
    }
}
