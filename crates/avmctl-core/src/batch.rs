//! Sequential batch runs over several VMs in one subscription

use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::operation::AvmOperation;
use crate::types::{VmAction, VmIdentity};

/// One batch target; `resource_group` falls back to the operation's own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmTarget {
    pub vm_name: String,
    pub resource_group: Option<String>,
}

impl VmTarget {
    pub fn new(vm_name: impl Into<String>, resource_group: Option<String>) -> Self {
        Self {
            vm_name: vm_name.into(),
            resource_group,
        }
    }

    fn identity(&self, base: &VmIdentity) -> VmIdentity {
        VmIdentity {
            subscription_id: base.subscription_id.clone(),
            resource_group: self
                .resource_group
                .clone()
                .unwrap_or_else(|| base.resource_group.clone()),
            vm_name: self.vm_name.clone(),
        }
    }
}

/// Parses `NAME` or `NAME:RESOURCE_GROUP`
impl FromStr for VmTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, group) = match s.split_once(':') {
            Some((name, group)) => (name.trim(), Some(group.trim())),
            None => (s.trim(), None),
        };

        if name.is_empty() {
            return Err(CoreError::Validation(format!(
                "invalid target '{}': VM name is empty",
                s
            )));
        }
        if group.is_some_and(str::is_empty) {
            return Err(CoreError::Validation(format!(
                "invalid target '{}': resource group is empty",
                s
            )));
        }

        Ok(Self::new(name, group.map(str::to_string)))
    }
}

/// Outcome for a single target
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub vm_name: String,
    pub resource_group: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-target results, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub action: VmAction,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.success).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Apply `action` to each target in turn. A failing target is recorded and
/// the run moves on to the next one.
pub async fn run_batch(op: &AvmOperation, targets: &[VmTarget], action: VmAction) -> BatchReport {
    let mut items = Vec::with_capacity(targets.len());

    for (index, target) in targets.iter().enumerate() {
        let vm = target.identity(op.vm());
        info!(
            vm = %vm,
            action = %action,
            position = index + 1,
            total = targets.len(),
            "Batch target"
        );

        let item = match op.for_vm(vm.clone()).perform(action).await {
            Ok(status) => BatchItem {
                vm_name: vm.vm_name,
                resource_group: vm.resource_group,
                success: action != VmAction::Status || status.is_some(),
                error: match (&status, action) {
                    (None, VmAction::Status) => Some("VM not found".to_string()),
                    _ => None,
                },
                status,
            },
            Err(e) => {
                warn!(vm = %vm, error = %e, "Batch target failed");
                BatchItem {
                    vm_name: vm.vm_name,
                    resource_group: vm.resource_group,
                    success: false,
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        };
        items.push(item);
    }

    BatchReport { action, items }
}
