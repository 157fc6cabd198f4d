use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::ActionResponse;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request was cancelled")]
    Cancelled,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Sends one action request to the action server.
///
/// Implementations must stop waiting and return `TransportError::Cancelled`
/// once `cancel` fires.
#[async_trait::async_trait]
pub trait ActionClient: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<ActionResponse, TransportError>;
}

pub struct HttpActionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpActionClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<ActionResponse, TransportError> {
        let response = self.client.post(self.url(endpoint)).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ActionClient for HttpActionClient {
    async fn send(
        &self,
        endpoint: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<ActionResponse, TransportError> {
        // Dropping the in-flight future aborts the underlying connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.post(endpoint, body) => result,
        }
    }
}
