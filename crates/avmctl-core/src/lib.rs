//! # avmctl-core
//!
//! Start, stop and query a single Azure virtual machine through the Azure
//! Resource Manager REST API, and announce each outcome either on stdout
//! ("dev" mode) or to a webhook.
//!
//! ## Layers
//!
//! - [`auth`] - client-credentials token acquisition
//! - [`compute`] - ARM VM verbs, waiting on long-running operations
//! - [`notify`] - dev/remote notification sink
//! - [`operation`] - the [`AvmOperation`] facade and the `start_vm` /
//!   `stop_vm` / `check_status` free functions
//! - [`batch`] - one action over several VMs, sequentially
//! - [`config`] - [`OperationConfig`] plus the TOML profile file used by the CLI
//!
//! ## Example
//!
//! ```rust,no_run
//! use avmctl_core::{AvmOperation, OperationConfig, ServicePrincipal, VmIdentity};
//!
//! # async fn run() -> avmctl_core::Result<()> {
//! let config = OperationConfig::new(
//!     VmIdentity::new("subscription-id", "my-rg", "my-vm"),
//!     ServicePrincipal::new("tenant-id", "client-id", "client-secret"),
//! );
//!
//! let op = AvmOperation::new(config)?;
//! op.start_vm().await?;
//! println!("{:?}", op.get_status().await?);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod compute;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod operation;
pub mod progress;
pub mod types;

pub use auth::{AccessToken, ClientSecretCredential, TokenCredential};
pub use batch::{BatchItem, BatchReport, VmTarget, run_batch};
pub use compute::{AzureComputeClient, ComputeApi, InstanceView};
pub use config::{CloudEndpoints, Config, OperationConfig, Profile};
pub use error::{CoreError, Result};
pub use notify::{NotificationSink, Notifier, OperationEvent, Outcome};
pub use operation::{AvmOperation, EnsureOutcome, check_status, start_vm, stop_vm};
pub use progress::{ProgressCallback, ProgressEvent};
pub use types::{OperationMode, PowerState, ServicePrincipal, VmAction, VmIdentity};
