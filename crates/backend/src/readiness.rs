//! Backend readiness probe.
//!
//! The backend counts as ready when its base URL answers 200 or 404;
//! any other status, or no answer at all, means it still has to be
//! launched.

use std::time::Duration;

use serde::Serialize;

/// Result of one readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Ready { status: u16 },
    NotReady { reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Whether an HTTP status from the backend root means "ready".
pub fn is_ready_status(status: u16) -> bool {
    status == 200 || status == 404
}

/// HTTP probe for a single backend instance.
pub struct BackendProbe {
    client: reqwest::Client,
    base_url: String,
}

impl BackendProbe {
    /// Create a probe for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a probe reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one `GET` to the base URL and classify the answer.
    pub async fn check(&self) -> Readiness {
        match self.client.get(&self.base_url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if is_ready_status(status) {
                    tracing::debug!(url = %self.base_url, status, "Backend is ready");
                    Readiness::Ready { status }
                } else {
                    tracing::warn!(url = %self.base_url, status, "Backend answered but is not ready");
                    Readiness::NotReady {
                        reason: format!("unexpected status {status}"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %self.base_url, error = %e, "Backend is not reachable");
                Readiness::NotReady {
                    reason: e.to_string(),
                }
            }
        }
    }
}
