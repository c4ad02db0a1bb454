use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use tavola_core::domain::tool::ToolDescriptor;

use crate::protocol::{RpcRequest, ToolSpec};
use crate::transport::{RpcTransport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRegistration {
    pub provider_id: String,
    pub endpoint: String,
    pub tools: Vec<ToolSpec>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("invalid provider endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("provider introspection failed: {0}")]
    Introspection(#[from] TransportError),
    #[error("provider catalog rejected: {0}")]
    Protocol(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("provider `{0}` is not registered")]
    ProviderNotFound(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote tool error: {0}")]
    Remote(String),
}

/// Registry of external capability providers. Shared process-wide; the cache
/// map is the only guarded state. Introspection happens outside the lock, so
/// concurrent registrations of one provider id race last-writer-wins.
pub struct ProviderRegistry {
    transport: Arc<dyn RpcTransport>,
    providers: RwLock<BTreeMap<String, ProviderRegistration>>,
}

impl ProviderRegistry {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport, providers: RwLock::new(BTreeMap::new()) }
    }

    /// Registers (or re-registers) a provider. The endpoint is validated
    /// before any network call; a failed introspection leaves any prior
    /// registration for the id untouched.
    pub async fn register(
        &self,
        provider_id: &str,
        endpoint: &str,
    ) -> Result<ProviderRegistration, RegistrationError> {
        validate_endpoint(endpoint)?;

        info!(
            event_name = "federation.provider.registering",
            provider_id,
            endpoint,
            "introspecting capability provider"
        );

        let response = self.transport.exchange(endpoint, &RpcRequest::list_tools()).await?;
        let tools = response.into_tool_list().map_err(RegistrationError::Protocol)?;

        let registration = ProviderRegistration {
            provider_id: provider_id.to_string(),
            endpoint: endpoint.to_string(),
            tools,
            registered_at: Utc::now(),
        };

        let mut providers = self.providers.write().await;
        providers.insert(provider_id.to_string(), registration.clone());

        info!(
            event_name = "federation.provider.registered",
            provider_id,
            tool_count = registration.tools.len(),
            "capability provider registered"
        );

        Ok(registration)
    }

    /// Live aggregate catalog: the union of every cached provider catalog
    /// with names rewritten `<providerId>_<toolName>`. Deterministic order.
    pub async fn aggregate_catalog(&self) -> Vec<ToolDescriptor> {
        let providers = self.providers.read().await;
        providers
            .values()
            .flat_map(|registration| {
                registration.tools.iter().map(|tool| {
                    ToolDescriptor::federated(
                        &registration.provider_id,
                        &tool.name,
                        &tool.description,
                        tool.input_schema.clone(),
                    )
                })
            })
            .collect()
    }

    /// Executes one remote tool call. Every failure mode collapses to an
    /// error value the caller can hand back to the model.
    pub async fn invoke(
        &self,
        provider_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, InvokeError> {
        let endpoint = {
            let providers = self.providers.read().await;
            providers
                .get(provider_id)
                .map(|registration| registration.endpoint.clone())
                .ok_or_else(|| InvokeError::ProviderNotFound(provider_id.to_string()))?
        };

        let request = RpcRequest::call_tool(tool_name, arguments);
        let response = self.transport.exchange(&endpoint, &request).await.map_err(|err| {
            warn!(
                event_name = "federation.tool.transport_failed",
                provider_id,
                tool_name,
                error = %err,
                "remote tool call failed in transport"
            );
            err
        })?;

        response.into_call_content().map_err(InvokeError::Remote)
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), RegistrationError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(RegistrationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint must declare an http:// or https:// scheme".to_string(),
        })
    }
}
