//! Shared domain types: VM identity, service principal, operation mode,
//! actions and power states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Addresses one virtual machine within one Azure subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmIdentity {
    pub subscription_id: String,
    pub resource_group: String,
    pub vm_name: String,
}

impl VmIdentity {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        vm_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            vm_name: vm_name.into(),
        }
    }

    /// Fail with a validation error naming every empty field
    pub fn validate(&self) -> Result<()> {
        let missing = missing_fields(&[
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("vm_name", &self.vm_name),
        ]);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "missing VM identity field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// ARM resource path of the VM, without the management endpoint host
    pub fn resource_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
            self.subscription_id, self.resource_group, self.vm_name
        )
    }
}

impl fmt::Display for VmIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.vm_name)
    }
}

/// Service principal used for the client-credentials grant.
///
/// `Debug` redacts the secret so the struct can sit inside logged config.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
}

impl ServicePrincipal {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Fail with a validation error naming every empty field
    pub fn validate(&self) -> Result<()> {
        let missing = missing_fields(&[
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "missing credential field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePrincipal")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

fn missing_fields<'a>(fields: &[(&'a str, &String)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

/// Where notifications are routed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationMode {
    /// Print locally ("dev" or empty)
    #[default]
    Dev,
    /// Any other mode name; notifications go to the webhook
    Remote(String),
}

impl OperationMode {
    /// Parse a mode flag; "dev" (any case) and blank select local output
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("dev") {
            OperationMode::Dev
        } else {
            OperationMode::Remote(trimmed.to_string())
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, OperationMode::Dev)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperationMode::Dev => "dev",
            OperationMode::Remote(name) => name,
        }
    }
}

impl FromStr for OperationMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(OperationMode::parse(s))
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationMode {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OperationMode::parse(&raw))
    }
}

/// The VM operations the facade can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VmAction {
    Start,
    Stop,
    Deallocate,
    Status,
}

impl VmAction {
    /// Event name used in webhook payloads
    pub fn event_name(&self) -> &'static str {
        match self {
            VmAction::Start => "vm.start",
            VmAction::Stop => "vm.stop",
            VmAction::Deallocate => "vm.deallocate",
            VmAction::Status => "vm.status",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            VmAction::Start => "started",
            VmAction::Stop => "stopped",
            VmAction::Deallocate => "deallocated",
            VmAction::Status => "queried",
        }
    }

    /// Human message for a successful run
    pub fn success_message(&self, vm_name: &str) -> String {
        format!("VM '{}' {} successfully", vm_name, self.past_tense())
    }

    /// Human message for a failed run
    pub fn failure_message(&self, vm_name: &str, error: &str) -> String {
        format!("Failed to {} VM '{}': {}", self, vm_name, error)
    }
}

impl fmt::Display for VmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmAction::Start => write!(f, "start"),
            VmAction::Stop => write!(f, "stop"),
            VmAction::Deallocate => write!(f, "deallocate"),
            VmAction::Status => write!(f, "status"),
        }
    }
}

/// VM power state from the `PowerState/<code>` instance view status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deallocating,
    Deallocated,
    Unknown(String),
}

impl PowerState {
    /// Parse either a full status code (`PowerState/running`) or the bare code
    pub fn from_code(code: &str) -> Self {
        let bare = code.strip_prefix("PowerState/").unwrap_or(code);
        match bare.to_ascii_lowercase().as_str() {
            "starting" => PowerState::Starting,
            "running" => PowerState::Running,
            "stopping" => PowerState::Stopping,
            "stopped" => PowerState::Stopped,
            "deallocating" => PowerState::Deallocating,
            "deallocated" => PowerState::Deallocated,
            _ => PowerState::Unknown(bare.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PowerState::Running)
    }

    pub fn code(&self) -> &str {
        match self {
            PowerState::Starting => "starting",
            PowerState::Running => "running",
            PowerState::Stopping => "stopping",
            PowerState::Stopped => "stopped",
            PowerState::Deallocating => "deallocating",
            PowerState::Deallocated => "deallocated",
            PowerState::Unknown(code) => code,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VM {}", self.code())
    }
}
