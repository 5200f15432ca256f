//! Compute client adapter
//!
//! [`ComputeApi`] is the seam between the operation facade and the provider:
//! three power verbs that block until the provider reports a terminal state,
//! and an instance-view fetch. [`AzureComputeClient`] talks to ARM; tests
//! substitute their own implementation.

pub mod azure;
pub mod models;

pub use azure::AzureComputeClient;
pub use models::{InstanceView, InstanceViewStatus};

use async_trait::async_trait;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::progress::ProgressCallback;
use crate::types::VmIdentity;

/// VM control operations against one provider
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Start the VM and wait until the provider reports success or failure
    async fn start(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()>;

    /// Power the VM off (compute stays allocated) and wait for a terminal state
    async fn power_off(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()>;

    /// Stop and release the VM's compute resources, waiting for a terminal state
    async fn deallocate(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()>;

    /// Fetch the instance view; `None` when the VM or its resource group does not exist
    async fn instance_view(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
    ) -> Result<Option<InstanceView>>;
}
