//! Operation facade
//!
//! [`AvmOperation`] runs each VM verb as a fixed chain: validate the config,
//! acquire a token, call the compute adapter, then hand the outcome to the
//! notification sink. The outcome is settled before the sink runs and a
//! failing sink never changes it.
//!
//! The free functions [`start_vm`], [`stop_vm`] and [`check_status`] wrap the
//! facade for callers that only want a yes/no answer or a status string.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::auth::{AccessToken, ClientSecretCredential, TokenCredential};
use crate::compute::{AzureComputeClient, ComputeApi, InstanceView};
use crate::config::OperationConfig;
use crate::error::Result;
use crate::http::build_client;
use crate::notify::{NotificationSink, Notifier, OperationEvent};
use crate::progress::ProgressCallback;
use crate::types::{VmAction, VmIdentity};

/// Result of [`AvmOperation::ensure_running`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    AlreadyRunning,
    Started,
}

/// Stateful facade over one VM
#[derive(Clone)]
pub struct AvmOperation {
    config: OperationConfig,
    credential: Arc<dyn TokenCredential>,
    compute: Arc<dyn ComputeApi>,
    notifier: Arc<dyn NotificationSink>,
    on_progress: Option<ProgressCallback>,
}

impl AvmOperation {
    /// Build a facade talking to Azure with the endpoints in `config`
    pub fn new(config: OperationConfig) -> Result<Self> {
        config.validate()?;

        let http = build_client(None)?;
        let credential = ClientSecretCredential::new(
            config.credentials.clone(),
            config.endpoints.authority_url()?,
            http.clone(),
        );
        let compute = AzureComputeClient::from_config(&config, http)?;
        let notifier = Notifier::new(
            config.mode.clone(),
            config.webhook_url.clone(),
            config.webhook_timeout,
        )?;

        Ok(Self {
            config,
            credential: Arc::new(credential),
            compute: Arc::new(compute),
            notifier: Arc::new(notifier),
            on_progress: None,
        })
    }

    /// Build a facade over caller-supplied backends
    pub fn with_backends(
        config: OperationConfig,
        credential: Arc<dyn TokenCredential>,
        compute: Arc<dyn ComputeApi>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            credential,
            compute,
            notifier,
            on_progress: None,
        })
    }

    /// Receive progress events while long-running operations are polled
    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Replace the notification sink, keeping the other backends
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Same backends and settings, aimed at another VM
    pub fn for_vm(&self, vm: VmIdentity) -> Self {
        Self {
            config: self.config.for_vm(vm),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    pub fn vm(&self) -> &VmIdentity {
        &self.config.vm
    }

    async fn token(&self) -> Result<AccessToken> {
        self.credential
            .get_token(&self.config.endpoints.management_scope())
            .await
    }

    /// Start the VM and wait for the provider to finish
    pub async fn start_vm(&self) -> Result<()> {
        self.run(VmAction::Start).await
    }

    /// Power off the VM (compute stays allocated)
    pub async fn stop_vm(&self) -> Result<()> {
        self.run(VmAction::Stop).await
    }

    /// Stop the VM and release its compute resources
    pub async fn deallocate_vm(&self) -> Result<()> {
        self.run(VmAction::Deallocate).await
    }

    /// Run a power action, or fetch the status when `action` is
    /// [`VmAction::Status`]. Used by the batch runner and the CLI.
    pub async fn perform(&self, action: VmAction) -> Result<Option<String>> {
        match action {
            VmAction::Status => self.get_status().await,
            action => self.run(action).await.map(|()| None),
        }
    }

    /// Normalised power state such as `VM running`; `None` when the VM does not exist
    pub async fn get_status(&self) -> Result<Option<String>> {
        Ok(self.instance_view().await?.map(|view| view.status_text()))
    }

    /// Full instance view; `None` when the VM does not exist
    pub async fn instance_view(&self) -> Result<Option<InstanceView>> {
        self.config.validate()?;
        let token = self.token().await?;
        self.compute.instance_view(&self.config.vm, &token).await
    }

    /// Start the VM unless it already reports running
    pub async fn ensure_running(&self) -> Result<EnsureOutcome> {
        let view = self.instance_view().await?;
        if view
            .as_ref()
            .and_then(InstanceView::power_state)
            .is_some_and(|state| state.is_running())
        {
            info!(vm = %self.config.vm, "VM already running");
            return Ok(EnsureOutcome::AlreadyRunning);
        }

        self.start_vm().await?;
        Ok(EnsureOutcome::Started)
    }

    async fn run(&self, action: VmAction) -> Result<()> {
        self.config.validate()?;
        let vm = &self.config.vm;

        let outcome = self.call_compute(action).await;

        let event = match &outcome {
            Ok(()) => {
                info!(vm = %vm, action = %action, "VM operation succeeded");
                OperationEvent::success(action, vm, action.success_message(&vm.vm_name))
            }
            Err(e) => {
                error!(vm = %vm, action = %action, error = %e, "VM operation failed");
                OperationEvent::failure(
                    action,
                    vm,
                    action.failure_message(&vm.vm_name, &e.to_string()),
                )
            }
        };

        if let Err(e) = self.notifier.notify(&event).await {
            warn!(vm = %vm, error = %e, "Notification not delivered");
        }

        outcome
    }

    async fn call_compute(&self, action: VmAction) -> Result<()> {
        let token = self.token().await?;
        let vm = &self.config.vm;
        let progress = self.on_progress.as_ref();

        match action {
            VmAction::Start => self.compute.start(vm, &token, progress).await,
            VmAction::Stop => self.compute.power_off(vm, &token, progress).await,
            VmAction::Deallocate => self.compute.deallocate(vm, &token, progress).await,
            VmAction::Status => self.compute.instance_view(vm, &token).await.map(|_| ()),
        }
    }
}

/// Start the VM described by `config`; errors are logged and reported as `false`
pub async fn start_vm(config: OperationConfig) -> bool {
    match AvmOperation::new(config) {
        Ok(op) => op.start_vm().await.is_ok(),
        Err(e) => {
            error!(error = %e, "Cannot start VM");
            false
        }
    }
}

/// Power off the VM described by `config`; errors are logged and reported as `false`
pub async fn stop_vm(config: OperationConfig) -> bool {
    match AvmOperation::new(config) {
        Ok(op) => op.stop_vm().await.is_ok(),
        Err(e) => {
            error!(error = %e, "Cannot stop VM");
            false
        }
    }
}

/// Power state string for the VM described by `config`
///
/// Returns `None` when the VM does not exist or the lookup fails.
pub async fn check_status(config: OperationConfig) -> Option<String> {
    let op = match AvmOperation::new(config) {
        Ok(op) => op,
        Err(e) => {
            error!(error = %e, "Cannot check VM status");
            return None;
        }
    };

    match op.get_status().await {
        Ok(status) => status,
        Err(e) => {
            error!(vm = %op.vm(), error = %e, "Status check failed");
            None
        }
    }
}
