use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One administrative command on the wire: UTF-8 JSON, at-least-once
/// delivery, no ordering guarantee. Ephemeral; never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub action: String,
    pub payload: Value,
}

impl CommandEnvelope {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self { action: action.into(), payload }
    }
}

/// How a dispatched command actually travelled, witnessed at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Queued,
    Fallback,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker connect failed: {0}")]
    Connect(String),
    #[error("broker is not connected")]
    NotConnected,
    #[error("broker publish failed: {0}")]
    Publish(String),
    #[error("broker receive failed: {0}")]
    Receive(String),
    #[error("broker disconnect failed: {0}")]
    Disconnect(String),
}

/// Broker seam. The production implementation is NATS with a queue-group
/// subscription; tests script this trait.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn connect(&self) -> Result<(), BrokerError>;
    async fn publish(&self, payload: &[u8]) -> Result<(), BrokerError>;
    /// Next raw message from the shared consumer group; `Ok(None)` means the
    /// subscription has closed.
    async fn next_message(&self) -> Result<Option<Vec<u8>>, BrokerError>;
    async fn close(&self) -> Result<(), BrokerError>;
}
