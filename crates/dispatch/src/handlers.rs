use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use tavola_federation::ProviderRegistry;

use crate::broker::CommandEnvelope;

pub const ACTION_CONNECT_PROVIDER: &str = "provider.connect";
pub const EVENT_CONNECTION_RESULT: &str = "provider.connection_result";

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown command action `{0}`")]
    UnknownAction(String),
    #[error("invalid command payload: {0}")]
    InvalidPayload(String),
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn action(&self) -> &'static str;
    async fn handle(&self, payload: Value) -> Result<(), HandlerError>;
}

/// Routes consumed envelopes to the handler registered for their action.
#[derive(Default)]
pub struct CommandHandlers {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.handlers.insert(handler.action(), Arc::new(handler));
    }

    pub async fn handle(&self, envelope: &CommandEnvelope) -> Result<(), HandlerError> {
        let Some(handler) = self.handlers.get(envelope.action.as_str()) else {
            return Err(HandlerError::UnknownAction(envelope.action.clone()));
        };

        handler.handle(envelope.payload.clone()).await
    }
}

/// Persisted provider record as returned by the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: String,
    pub name: String,
    pub endpoint: String,
}

/// Persistence seam for provider records. Implementations must be idempotent
/// per provider name so at-least-once delivery is safe to retry.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn register_provider(
        &self,
        name: &str,
        endpoint: &str,
    ) -> anyhow::Result<ProviderRecord>;
}

/// Fire-and-forget notification seam; `emit` must never fail or block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event_type: &str, data: Value);
}

#[derive(Debug, Deserialize)]
struct ConnectProviderPayload {
    name: String,
    #[serde(alias = "url")]
    endpoint: String,
}

/// Handles `provider.connect`: registry handshake, then persistence, then
/// exactly one terminal `provider.connection_result` notification whatever
/// the outcome.
pub struct ConnectProviderHandler {
    registry: Arc<ProviderRegistry>,
    directory: Arc<dyn ProviderDirectory>,
    events: Arc<dyn EventSink>,
}

impl ConnectProviderHandler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        directory: Arc<dyn ProviderDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self { registry, directory, events }
    }

    fn emit_error(&self, name: &str, cause: &str) {
        self.events.emit(
            EVENT_CONNECTION_RESULT,
            json!({ "status": "error", "name": name, "error": cause }),
        );
    }
}

#[async_trait]
impl CommandHandler for ConnectProviderHandler {
    fn action(&self) -> &'static str {
        ACTION_CONNECT_PROVIDER
    }

    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        let request: ConnectProviderPayload = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(err) => {
                self.emit_error("unknown", &err.to_string());
                return Err(HandlerError::InvalidPayload(err.to_string()));
            }
        };

        match self.registry.register(&request.name, &request.endpoint).await {
            Ok(registration) => {
                match self.directory.register_provider(&request.name, &request.endpoint).await {
                    Ok(record) => {
                        info!(
                            event_name = "dispatch.provider_connect.succeeded",
                            provider = %request.name,
                            tool_count = registration.tools.len(),
                            "capability provider connected"
                        );
                        self.events.emit(
                            EVENT_CONNECTION_RESULT,
                            json!({
                                "status": "success",
                                "name": request.name,
                                "provider": record,
                                "tool_count": registration.tools.len(),
                            }),
                        );
                    }
                    Err(err) => {
                        warn!(
                            event_name = "dispatch.provider_connect.persist_failed",
                            provider = %request.name,
                            error = %err,
                            "provider registered but persistence failed"
                        );
                        self.emit_error(&request.name, &err.to_string());
                    }
                }
            }
            Err(err) => {
                warn!(
                    event_name = "dispatch.provider_connect.failed",
                    provider = %request.name,
                    error = %err,
                    "capability provider handshake failed"
                );
                self.emit_error(&request.name, &err.to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use tavola_federation::protocol::{RpcRequest, RpcResponse};
    use tavola_federation::transport::{RpcTransport, TransportError};
    use tavola_federation::ProviderRegistry;

    use super::{
        CommandHandler, ConnectProviderHandler, EventSink, ProviderDirectory, ProviderRecord,
        EVENT_CONNECTION_RESULT,
    };

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<RpcResponse, TransportError>>>,
    }

    impl ScriptedTransport {
        fn with_script(responses: Vec<Result<RpcResponse, TransportError>>) -> Self {
            Self { responses: Mutex::new(responses.into()) }
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn exchange(
            &self,
            _endpoint: &str,
            _request: &RpcRequest,
        ) -> Result<RpcResponse, TransportError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connect("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingDirectory {
        saved: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ProviderDirectory for RecordingDirectory {
        async fn register_provider(
            &self,
            name: &str,
            endpoint: &str,
        ) -> anyhow::Result<ProviderRecord> {
            if self.fail {
                anyhow::bail!("database unavailable");
            }
            self.saved.lock().await.push((name.to_string(), endpoint.to_string()));
            Ok(ProviderRecord {
                id: "p-1".to_string(),
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        events: std::sync::Mutex<Vec<(String, Value)>>,
    }

    impl CollectingSink {
        fn events(&self) -> Vec<(String, Value)> {
            self.events.lock().map(|events| events.clone()).unwrap_or_default()
        }
    }

    impl EventSink for CollectingSink {
        fn emit(&self, event_type: &str, data: Value) {
            if let Ok(mut events) = self.events.lock() {
                events.push((event_type.to_string(), data));
            }
        }
    }

    fn registry_with(responses: Vec<Result<RpcResponse, TransportError>>) -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry::new(Arc::new(ScriptedTransport::with_script(responses))))
    }

    fn ok_list() -> RpcResponse {
        serde_json::from_value(json!({ "result": { "tools": [{ "name": "check_stock" }] } }))
            .expect("decode fixture")
    }

    #[tokio::test]
    async fn successful_connect_persists_and_emits_one_success_notification() {
        let registry = registry_with(vec![Ok(ok_list())]);
        let directory = Arc::new(RecordingDirectory::default());
        let sink = Arc::new(CollectingSink::default());
        let handler =
            ConnectProviderHandler::new(registry, directory.clone(), sink.clone());

        handler
            .handle(json!({ "name": "erp", "endpoint": "http://erp.internal/rpc" }))
            .await
            .expect("handler should succeed");

        assert_eq!(
            directory.saved.lock().await.as_slice(),
            &[("erp".to_string(), "http://erp.internal/rpc".to_string())]
        );

        let events = sink.events();
        assert_eq!(events.len(), 1, "exactly one terminal notification");
        assert_eq!(events[0].0, EVENT_CONNECTION_RESULT);
        assert_eq!(events[0].1["status"], "success");
        assert_eq!(events[0].1["provider"]["name"], "erp");
    }

    #[tokio::test]
    async fn failed_handshake_emits_one_error_notification_and_skips_persistence() {
        let registry =
            registry_with(vec![Err(TransportError::Connect("refused".to_string()))]);
        let directory = Arc::new(RecordingDirectory::default());
        let sink = Arc::new(CollectingSink::default());
        let handler =
            ConnectProviderHandler::new(registry, directory.clone(), sink.clone());

        handler
            .handle(json!({ "name": "erp", "url": "http://erp.internal/rpc" }))
            .await
            .expect("handshake failure is not a handler failure");

        assert!(directory.saved.lock().await.is_empty());

        let events = sink.events();
        assert_eq!(events.len(), 1, "exactly one terminal notification");
        assert_eq!(events[0].1["status"], "error");
        assert_eq!(events[0].1["name"], "erp");
        assert!(events[0].1["error"].as_str().unwrap_or("").contains("unreachable"));
    }

    #[tokio::test]
    async fn persistence_failure_after_handshake_still_emits_one_error() {
        let registry = registry_with(vec![Ok(ok_list())]);
        let directory = Arc::new(RecordingDirectory { fail: true, ..Default::default() });
        let sink = Arc::new(CollectingSink::default());
        let handler = ConnectProviderHandler::new(registry, directory, sink.clone());

        handler
            .handle(json!({ "name": "erp", "endpoint": "http://erp.internal/rpc" }))
            .await
            .expect("persistence failure is reported through the notification");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1["status"], "error");
        assert!(events[0].1["error"].as_str().unwrap_or("").contains("database unavailable"));
    }

    #[tokio::test]
    async fn malformed_payload_emits_error_notification_and_fails() {
        let registry = registry_with(vec![]);
        let directory = Arc::new(RecordingDirectory::default());
        let sink = Arc::new(CollectingSink::default());
        let handler = ConnectProviderHandler::new(registry, directory, sink.clone());

        let result = handler.handle(json!({ "endpoint": "http://erp.internal/rpc" })).await;

        assert!(result.is_err());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1["status"], "error");
    }
}
