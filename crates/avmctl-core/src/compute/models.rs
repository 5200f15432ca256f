//! ARM compute response models.

use serde::{Deserialize, Serialize};

use crate::types::PowerState;

/// VM instance view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    /// Guest computer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    /// Guest OS name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    /// Provisioning and power statuses.
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

/// One instance view status entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    /// Code, e.g. `PowerState/running` or `ProvisioningState/succeeded`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Display text, e.g. `VM running`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl InstanceView {
    fn status_with_prefix(&self, prefix: &str) -> Option<&InstanceViewStatus> {
        self.statuses.iter().find(|s| s.code.starts_with(prefix))
    }

    /// Power state, if the view carries one
    pub fn power_state(&self) -> Option<PowerState> {
        self.status_with_prefix("PowerState/")
            .map(|s| PowerState::from_code(&s.code))
    }

    /// Provisioning state code without its prefix (e.g. `succeeded`)
    pub fn provisioning_state(&self) -> Option<&str> {
        self.status_with_prefix("ProvisioningState/")
            .and_then(|s| s.code.split_once('/'))
            .map(|(_, state)| state)
    }

    /// Normalised status string: the power state's display text, else `VM <code>`,
    /// else `VM unknown` when the provider reports no power state at all.
    pub fn status_text(&self) -> String {
        match self.status_with_prefix("PowerState/") {
            Some(InstanceViewStatus {
                display_status: Some(display),
                ..
            }) if !display.trim().is_empty() => display.clone(),
            Some(status) => PowerState::from_code(&status.code).to_string(),
            None => PowerState::Unknown("unknown".to_string()).to_string(),
        }
    }
}
