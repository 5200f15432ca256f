//! Progress tracking and polling for long-running ARM operations
//!
//! VM start, power-off and deallocate answer `202 Accepted` and hand back a
//! URL to poll, either in `Azure-AsyncOperation` (a status document) or in
//! `Location` (202 while running, 200/204 when done). This module waits on
//! either form until the operation is terminal, emitting progress events for
//! UI updates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use crate::auth::AccessToken;
use crate::error::{CoreError, Result};
use crate::http::ensure_success;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Request accepted by the provider
    Started { operation: String },
    /// Polling iteration with the provider's current status
    Polling {
        operation: String,
        status: String,
        elapsed: Duration,
    },
    /// Terminal success
    Completed { operation: String },
    /// Terminal failure
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive a spinner; library callers usually pass nothing.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Where to poll for the outcome of an accepted request
#[derive(Debug, Clone, PartialEq)]
pub enum PollTarget {
    /// `Azure-AsyncOperation` status document
    AsyncOperation(Url),
    /// `Location` header; 202 until done
    Location(Url),
}

impl PollTarget {
    /// Pick the poll target from response headers, preferring `Azure-AsyncOperation`
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header_url = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| Url::parse(v).ok())
        };

        header_url(AZURE_ASYNC_OPERATION)
            .map(PollTarget::AsyncOperation)
            .or_else(|| header_url(LOCATION.as_str()).map(PollTarget::Location))
    }
}

/// Parse `Retry-After` as whole seconds
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct AsyncOperationStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<AsyncOperationError>,
}

#[derive(Debug, Deserialize)]
struct AsyncOperationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AsyncOperationError {
    fn describe(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        }
    }
}

/// Settings for one wait
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Used when the provider sends no `Retry-After`
    pub interval: Duration,
    /// `None` waits until terminal
    pub timeout: Option<Duration>,
}

/// Poll an accepted operation until it reaches a terminal state
///
/// Every error, including transport and decode failures, is reported to
/// `on_progress` as [`ProgressEvent::Failed`] before it is returned.
///
/// # Arguments
///
/// * `http` - Client used for the poll requests
/// * `token` - Bearer token for ARM
/// * `operation` - Label used in progress events and errors (e.g. "start web-01")
/// * `target` - Where to poll
/// * `first_wait` - Delay before the first poll (the accepted response's `Retry-After`)
/// * `settings` - Interval and optional timeout
/// * `on_progress` - Optional callback for progress updates
pub async fn poll_operation(
    http: &reqwest::Client,
    token: &AccessToken,
    operation: &str,
    target: PollTarget,
    first_wait: Option<Duration>,
    settings: PollSettings,
    on_progress: Option<&ProgressCallback>,
) -> Result<()> {
    let result = poll_until_terminal(
        http,
        token,
        operation,
        &target,
        first_wait,
        settings,
        on_progress,
    )
    .await;

    if let Err(e) = &result {
        let error = match e {
            CoreError::TaskFailed(message) => message.clone(),
            CoreError::TaskTimeout(timeout) => format!("timed out after {:?}", timeout),
            other => other.to_string(),
        };
        emit(
            on_progress,
            ProgressEvent::Failed {
                operation: operation.to_string(),
                error,
            },
        );
    }
    result
}

async fn poll_until_terminal(
    http: &reqwest::Client,
    token: &AccessToken,
    operation: &str,
    target: &PollTarget,
    first_wait: Option<Duration>,
    settings: PollSettings,
    on_progress: Option<&ProgressCallback>,
) -> Result<()> {
    let start = Instant::now();
    let mut wait = first_wait.unwrap_or(settings.interval);

    loop {
        tokio::time::sleep(wait).await;

        let elapsed = start.elapsed();
        if let Some(timeout) = settings.timeout
            && elapsed > timeout
        {
            return Err(CoreError::TaskTimeout(timeout));
        }

        let url = match target {
            PollTarget::AsyncOperation(url) | PollTarget::Location(url) => url.clone(),
        };
        trace!(%url, "Polling operation");
        let response = http.get(url).bearer_auth(token.secret()).send().await?;
        let response = ensure_success(response, operation).await?;
        wait = retry_after(response.headers()).unwrap_or(settings.interval);

        let status = match target {
            PollTarget::AsyncOperation(_) => {
                let body: AsyncOperationStatus = response.json().await?;
                match body.status.to_ascii_lowercase().as_str() {
                    "succeeded" => None,
                    "failed" | "canceled" | "cancelled" => {
                        let error = body
                            .error
                            .as_ref()
                            .and_then(AsyncOperationError::describe)
                            .unwrap_or_else(|| format!("operation ended with status {}", body.status));
                        return Err(CoreError::TaskFailed(error));
                    }
                    "" => {
                        return Err(CoreError::provider(
                            None,
                            format!("{}: status document has no status", operation),
                        ));
                    }
                    _ => Some(body.status),
                }
            }
            PollTarget::Location(_) => {
                if response.status() == reqwest::StatusCode::ACCEPTED {
                    Some("InProgress".to_string())
                } else {
                    None
                }
            }
        };

        match status {
            None => {
                debug!(operation, elapsed = ?start.elapsed(), "Operation succeeded");
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        operation: operation.to_string(),
                    },
                );
                return Ok(());
            }
            Some(status) => {
                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        operation: operation.to_string(),
                        status,
                        elapsed,
                    },
                );
            }
        }
    }
}

/// Helper to emit progress events
pub(crate) fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
