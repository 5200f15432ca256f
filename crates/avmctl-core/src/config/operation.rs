//! Explicit operation configuration
//!
//! [`OperationConfig`] enumerates every setting the facade recognises along
//! with its default. It is built once at the process boundary (CLI flags,
//! environment, profile) and handed to the facade; nothing below it reads the
//! environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};
use crate::types::{OperationMode, ServicePrincipal, VmIdentity};

/// Azure public cloud identity endpoint
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Azure public cloud Resource Manager endpoint
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";

/// Compute API version used for VM operations
pub const DEFAULT_COMPUTE_API_VERSION: &str = "2024-07-01";

/// Default interval between long-running operation polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout for the single webhook POST
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloud endpoints; override for sovereign clouds or test servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEndpoints {
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    #[serde(default = "default_resource_manager")]
    pub resource_manager: String,
    #[serde(default = "default_api_version")]
    pub compute_api_version: String,
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            authority_host: default_authority_host(),
            resource_manager: default_resource_manager(),
            compute_api_version: default_api_version(),
        }
    }
}

impl CloudEndpoints {
    /// OAuth2 scope for the configured Resource Manager
    pub fn management_scope(&self) -> String {
        format!("{}/.default", self.resource_manager.trim_end_matches('/'))
    }

    pub fn authority_url(&self) -> Result<Url> {
        parse_base(&self.authority_host)
    }

    pub fn resource_manager_url(&self) -> Result<Url> {
        parse_base(&self.resource_manager)
    }
}

/// Parse a base URL and make sure it ends with '/' so `join` appends
fn parse_base(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Ok(Url::parse(&with_slash)?)
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_resource_manager() -> String {
    DEFAULT_RESOURCE_MANAGER.to_string()
}

fn default_api_version() -> String {
    DEFAULT_COMPUTE_API_VERSION.to_string()
}

/// Everything one facade instance needs
#[derive(Debug, Clone)]
pub struct OperationConfig {
    pub vm: VmIdentity,
    pub credentials: ServicePrincipal,
    pub mode: OperationMode,
    pub webhook_url: Option<String>,
    pub endpoints: CloudEndpoints,
    /// Interval between polls when the provider sends no Retry-After
    pub poll_interval: Duration,
    /// Upper bound on waiting for start/stop; `None` waits until terminal
    pub wait_timeout: Option<Duration>,
    pub webhook_timeout: Duration,
}

impl OperationConfig {
    /// Create a config with the required fields and defaults for the rest
    pub fn new(vm: VmIdentity, credentials: ServicePrincipal) -> Self {
        Self {
            vm,
            credentials,
            mode: OperationMode::Dev,
            webhook_url: None,
            endpoints: CloudEndpoints::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: None,
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: OperationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the webhook URL; blank strings are treated as unset
    #[must_use]
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.webhook_url = if url.trim().is_empty() {
            None
        } else {
            Some(url)
        };
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: CloudEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_webhook_timeout(mut self, timeout: Duration) -> Self {
        self.webhook_timeout = timeout;
        self
    }

    /// Same config aimed at a different VM
    #[must_use]
    pub fn for_vm(&self, vm: VmIdentity) -> Self {
        Self {
            vm,
            ..self.clone()
        }
    }

    /// Check identity and credential fields are all non-empty.
    ///
    /// A remote mode without a webhook URL is not rejected here: it only
    /// affects the notification step, which reports it as a configuration
    /// error without failing the VM operation.
    pub fn validate(&self) -> Result<()> {
        self.vm.validate()?;
        self.credentials.validate()?;
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
