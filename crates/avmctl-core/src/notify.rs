//! Operation outcome notifications
//!
//! In dev mode the notifier prints to stdout and never touches the network.
//! In any other mode it POSTs a JSON payload to the webhook; a failed
//! delivery is reported to the caller, which logs and discards it.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::http::{build_client, error_message};
use crate::types::{OperationMode, VmAction, VmIdentity};

/// Outcome of a VM operation, as delivered to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// A finished operation, ready to be announced
#[derive(Debug, Clone)]
pub struct OperationEvent {
    pub action: VmAction,
    pub vm: VmIdentity,
    pub outcome: Outcome,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl OperationEvent {
    pub fn success(action: VmAction, vm: &VmIdentity, message: impl Into<String>) -> Self {
        Self::new(action, vm, Outcome::Success, message)
    }

    pub fn failure(action: VmAction, vm: &VmIdentity, message: impl Into<String>) -> Self {
        Self::new(action, vm, Outcome::Failure, message)
    }

    fn new(action: VmAction, vm: &VmIdentity, outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            action,
            vm: vm.clone(),
            outcome,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Single-line form used for local output
    pub fn format_line(&self) -> String {
        let marker = match self.outcome {
            Outcome::Success => "\u{2713}",
            Outcome::Failure => "\u{2717}",
        };
        format!(
            "[{}] {} {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            marker,
            self.action.event_name(),
            self.message
        )
    }
}

/// JSON body POSTed to the webhook
#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload<'a> {
    pub event: &'static str,
    pub vm_name: &'a str,
    pub resource_group: &'a str,
    pub subscription_id: &'a str,
    pub result: &'a Outcome,
    pub message: &'a str,
    pub mode: &'a str,
    pub timestamp: String,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(event: &'a OperationEvent, mode: &'a OperationMode) -> Self {
        Self {
            event: event.action.event_name(),
            vm_name: &event.vm.vm_name,
            resource_group: &event.vm.resource_group,
            subscription_id: &event.vm.subscription_id,
            result: &event.outcome,
            message: &event.message,
            mode: mode.as_str(),
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Destination for operation events
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &OperationEvent) -> Result<()>;
}

/// Dual-mode notifier: stdout in dev mode, webhook otherwise
pub struct Notifier {
    mode: OperationMode,
    webhook_url: Option<String>,
    http: reqwest::Client,
}

impl Notifier {
    /// Create a notifier; the HTTP client is only used in remote mode
    pub fn new(
        mode: OperationMode,
        webhook_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            mode,
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            http: build_client(Some(timeout))?,
        })
    }

    pub fn mode(&self) -> &OperationMode {
        &self.mode
    }

    async fn post_webhook(&self, url: &str, event: &OperationEvent) -> Result<()> {
        let payload = WebhookPayload::new(event, &self.mode);
        debug!(event = payload.event, vm = %event.vm, "Posting webhook notification");

        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Notify(format!("webhook delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Notify(format!(
                "webhook returned {}: {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        info!(status = status.as_u16(), "Webhook notification delivered");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    async fn notify(&self, event: &OperationEvent) -> Result<()> {
        match &self.mode {
            OperationMode::Dev => {
                println!("{}", event.format_line());
                Ok(())
            }
            OperationMode::Remote(name) => match self.webhook_url.as_deref() {
                Some(url) => self.post_webhook(url, event).await,
                None => Err(CoreError::Config(format!(
                    "mode '{}' sends notifications to a webhook but no webhook URL is configured",
                    name
                ))),
            },
        }
    }
}
