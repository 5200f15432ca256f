//! ARM implementation of [`ComputeApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use super::{ComputeApi, InstanceView};
use crate::auth::AccessToken;
use crate::config::OperationConfig;
use crate::error::{CoreError, Result};
use crate::http::ensure_success;
use crate::progress::{
    PollSettings, PollTarget, ProgressCallback, ProgressEvent, emit, poll_operation, retry_after,
};
use crate::types::VmIdentity;

/// Compute client for Azure Resource Manager
#[derive(Clone)]
pub struct AzureComputeClient {
    http: reqwest::Client,
    base: Url,
    api_version: String,
    poll: PollSettings,
}

impl AzureComputeClient {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        api_version: impl Into<String>,
        poll_interval: Duration,
        wait_timeout: Option<Duration>,
    ) -> Self {
        Self {
            http,
            base,
            api_version: api_version.into(),
            poll: PollSettings {
                interval: poll_interval,
                timeout: wait_timeout,
            },
        }
    }

    /// Build a client from the endpoints and wait settings in `config`
    pub fn from_config(config: &OperationConfig, http: reqwest::Client) -> Result<Self> {
        Ok(Self::new(
            http,
            config.endpoints.resource_manager_url()?,
            config.endpoints.compute_api_version.clone(),
            config.poll_interval,
            config.wait_timeout,
        ))
    }

    /// URL of the VM resource, or one of its sub-resources/actions
    fn vm_url(&self, vm: &VmIdentity, suffix: Option<&str>) -> Result<Url> {
        let path = match suffix {
            Some(suffix) => format!("{}/{}", vm.resource_path(), suffix),
            None => vm.resource_path(),
        };
        let mut url = self.base.join(&path)?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// POST a power action and wait for it to become terminal
    async fn run_action(
        &self,
        vm: &VmIdentity,
        action: &str,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        let operation = format!("{} {}", action, vm.vm_name);
        let url = self.vm_url(vm, Some(action))?;
        debug!(%url, "Submitting VM action");

        let response = self
            .http
            .post(url)
            .bearer_auth(token.secret())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;
        let response = ensure_success(response, &format!("virtual machine '{}'", vm)).await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation: operation.clone(),
                        error: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        emit(
            on_progress,
            ProgressEvent::Started {
                operation: operation.clone(),
            },
        );

        let status = response.status();
        let target = PollTarget::from_headers(response.headers());
        let first_wait = retry_after(response.headers());

        match (status, target) {
            (StatusCode::ACCEPTED | StatusCode::CREATED, Some(target)) => {
                poll_operation(
                    &self.http,
                    token,
                    &operation,
                    target,
                    first_wait,
                    self.poll,
                    on_progress,
                )
                .await?;
            }
            (status, _) => {
                // Synchronous completion, or an accepted request with nothing to poll
                debug!(status = status.as_u16(), "Action completed without polling");
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        operation: operation.clone(),
                    },
                );
            }
        }

        info!(vm = %vm, action, "VM action succeeded");
        Ok(())
    }
}

#[async_trait]
impl ComputeApi for AzureComputeClient {
    async fn start(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        self.run_action(vm, "start", token, on_progress).await
    }

    async fn power_off(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        self.run_action(vm, "powerOff", token, on_progress).await
    }

    async fn deallocate(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        self.run_action(vm, "deallocate", token, on_progress).await
    }

    async fn instance_view(
        &self,
        vm: &VmIdentity,
        token: &AccessToken,
    ) -> Result<Option<InstanceView>> {
        let url = self.vm_url(vm, Some("instanceView"))?;
        debug!(%url, "Fetching instance view");

        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await?;

        match ensure_success(response, &format!("virtual machine '{}'", vm)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(CoreError::NotFound(message)) => {
                debug!(%message, "VM not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
