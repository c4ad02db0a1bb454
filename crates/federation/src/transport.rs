use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{RpcRequest, RpcResponse};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("provider unreachable: {0}")]
    Connect(String),
    #[error("provider call timed out: {0}")]
    Timeout(String),
    #[error("provider returned http status {0}")]
    Status(u16),
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// One request/response exchange with a provider endpoint. The production
/// implementation is plain HTTP; tests script this seam.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn exchange(
        &self,
        endpoint: &str,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError>;
}

pub struct HttpRpcTransport {
    client: reqwest::Client,
}

impl HttpRpcTransport {
    /// Both timeouts are enforced per call; either expiring surfaces as
    /// `TransportError::Timeout`.
    pub fn new(connect_timeout: Duration, call_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(call_timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "http client build failed; using default client");
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpRpcTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(30))
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn exchange(
        &self,
        endpoint: &str,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        let response = self.client.post(endpoint).json(request).send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout(err.to_string())
            } else {
                TransportError::Connect(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.json::<RpcResponse>().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout(err.to_string())
            } else {
                TransportError::Decode(err.to_string())
            }
        })
    }
}
