//! # Sync Transport
//!
//! HTTP transport to the cloud endpoint, behind the [`RemoteEndpoint`]
//! trait so the engine can be driven by a mock in tests.
//!
//! ## Wire Protocol
//! ```text
//! push:  POST {endpoint}?action=push
//!        body: { "action": "push", "secret": "...", "payload": "<base64>" }
//!
//! pull:  GET  {endpoint}?action=pull&secret=...&t=<millis cache buster>
//!        body: base64 payload | raw envelope JSON | {"status":"error",...}
//! ```
//! The shared secret travels with every call; there is no session or token
//! exchange. Redirects are followed; no headers beyond content type are
//! assumed to survive intermediaries.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::payload::remote_error;

/// Per-request timeout.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The engine's view of the cloud endpoint.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Uploads a base64 payload. `Ok` means the endpoint confirmed receipt.
    async fn push(&self, payload: &str) -> SyncResult<()>;

    /// Downloads the endpoint's current payload body, undecoded.
    async fn pull(&self) -> SyncResult<String>;
}

// =============================================================================
// HTTP Endpoint
// =============================================================================

/// Production transport over reqwest.
pub struct HttpEndpoint {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl HttpEndpoint {
    pub fn new(endpoint: impl Into<String>, secret: impl Into<String>) -> SyncResult<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SyncError::InvalidUrl(endpoint));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::ConnectionFailed(e.to_string()))?;
        Ok(HttpEndpoint {
            client,
            endpoint,
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl RemoteEndpoint for HttpEndpoint {
    async fn push(&self, payload: &str) -> SyncResult<()> {
        debug!(url = %self.endpoint, bytes = payload.len(), "Pushing payload");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("action", "push")])
            .json(&json!({
                "action": "push",
                "secret": self.secret,
                "payload": payload,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
            });
        }

        // A 200 body can still carry an application-level rejection.
        let body = response.text().await?;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(err) = remote_error(&value) {
                return Err(err);
            }
        }
        Ok(())
    }

    async fn pull(&self) -> SyncResult<String> {
        // `t` is a cache buster: some hosts cache GET aggressively. Query
        // values are percent-encoded, so any secret survives the URL.
        let cache_buster = Utc::now().timestamp_millis().to_string();
        debug!(url = %self.endpoint, "Pulling payload");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "pull"),
                ("secret", self.secret.as_str()),
                ("t", cache_buster.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

// =============================================================================
// Tests (against an in-process HTTP server)
// =============================================================================
