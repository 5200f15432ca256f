//! Credential context: service principal -> ARM access token
//!
//! [`ClientSecretCredential`] runs the OAuth2 client-credentials grant against
//! the Microsoft identity platform. Failures are never retried.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};
use url::Url;

use crate::error::{CoreError, Result};
use crate::http::error_message;
use crate::types::ServicePrincipal;

/// Bearer token for the compute management API
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_on,
        }
    }

    /// Raw token value for the Authorization header
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[redacted]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Something that can hand out access tokens for a scope
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Absolute expiry for a token valid for `expires_in` seconds from `now`
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            CoreError::Auth(format!(
                "token response has out-of-range expires_in: {}",
                expires_in
            ))
        })
}

/// Client-credentials grant for one service principal
pub struct ClientSecretCredential {
    principal: ServicePrincipal,
    authority: Url,
    http: reqwest::Client,
}

impl ClientSecretCredential {
    pub fn new(principal: ServicePrincipal, authority: Url, http: reqwest::Client) -> Self {
        Self {
            principal,
            authority,
            http,
        }
    }

    fn token_url(&self) -> Result<Url> {
        Ok(self
            .authority
            .join(&format!("{}/oauth2/v2.0/token", self.principal.tenant_id))?)
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.principal
            .validate()
            .map_err(|e| CoreError::Auth(e.to_string()))?;

        let url = self.token_url()?;
        debug!(
            tenant_id = %self.principal.tenant_id,
            client_id = %self.principal.client_id,
            "Requesting access token"
        );

        let body = serde_urlencoded::to_string(TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.principal.client_id,
            client_secret: &self.principal.client_secret,
            scope,
        })
        .map_err(|e| CoreError::Auth(format!("failed to encode token request: {}", e)))?;

        let response = self
            .http
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::Auth(format!("identity endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!(
                "identity provider rejected credentials ({}): {}",
                status.as_u16(),
                error_message(&text)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Auth(format!("malformed token response: {}", e)))?;
        trace!(expires_in = token.expires_in, "Access token acquired");

        let expires_on = expiry_after(Utc::now(), token.expires_in)?;
        Ok(AccessToken::new(token.access_token, expires_on))
    }
}
