//! Shared HTTP client construction

use std::time::Duration;

use tracing::debug;

use crate::error::{CoreError, Result};

/// User agent string for avmctl HTTP requests
pub const AVMCTL_USER_AGENT: &str = concat!("avmctl/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the avmctl user agent and an optional request timeout
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(AVMCTL_USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Map a non-2xx ARM response onto the error taxonomy; pass 2xx through.
///
/// `what` names the resource for not-found and permission messages.
pub async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    debug!(status = status.as_u16(), %message, "Request failed");

    Err(match status.as_u16() {
        401 => CoreError::Auth(format!("{}: {}", what, message)),
        403 => CoreError::Permission(format!("{}: {}", what, message)),
        404 => CoreError::NotFound(format!("{}: {}", what, message)),
        code => CoreError::provider(Some(code), message),
    })
}

/// Pull a readable message out of an Azure error body.
///
/// ARM returns `{"error": {"code", "message"}}`, the identity endpoint returns
/// `{"error", "error_description"}`; anything else is passed through trimmed.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    if let Some(err) = value.get("error") {
        if let Some(obj) = err.as_object() {
            let code = obj.get("code").and_then(|c| c.as_str());
            let message = obj.get("message").and_then(|m| m.as_str());
            return match (code, message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message.to_string(),
                (Some(code), None) => code.to_string(),
                (None, None) => err.to_string(),
            };
        }
        if let Some(code) = err.as_str() {
            return match value.get("error_description").and_then(|d| d.as_str()) {
                Some(description) => format!("{}: {}", code, description),
                None => code.to_string(),
            };
        }
    }

    body.trim().to_string()
}
