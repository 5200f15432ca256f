//! Configuration for VM operations
//!
//! Two layers live here:
//!
//! - [`OperationConfig`]: the explicit, validated settings one facade runs with
//! - [`Config`]: the TOML profile file the CLI reads at the process boundary,
//!   with `${VAR}` expansion and optional keyring-backed client secrets

// Allow nested config module - the profile file type lives in config::config
#![allow(clippy::module_inception)]

pub mod config;
pub mod credential;
pub mod error;
pub mod operation;

// Re-export main types for convenience
pub use config::{Config, Profile};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
pub use operation::{CloudEndpoints, OperationConfig};
