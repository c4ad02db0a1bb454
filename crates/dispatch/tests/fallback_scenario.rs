//! End-to-end fallback scenario: a provider-connect command dispatched while
//! the broker is down must run inline and emit exactly one terminal
//! connection-result notification reflecting the registry outcome.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use tavola_dispatch::{
    BrokerError, BrokerTransport, CommandDispatcher, CommandHandlers, ConnectProviderHandler,
    DeliveryMode, EventSink, ProviderDirectory, ProviderRecord, ACTION_CONNECT_PROVIDER,
    EVENT_CONNECTION_RESULT,
};
use tavola_federation::{
    ProviderRegistry, RpcRequest, RpcResponse, RpcTransport, TransportError,
};

struct DownBroker;

#[async_trait]
impl BrokerTransport for DownBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        Err(BrokerError::Connect("no route to broker".to_string()))
    }

    async fn publish(&self, _payload: &[u8]) -> Result<(), BrokerError> {
        Err(BrokerError::NotConnected)
    }

    async fn next_message(&self) -> Result<Option<Vec<u8>>, BrokerError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

struct FixedTransport {
    healthy: bool,
}

#[async_trait]
impl RpcTransport for FixedTransport {
    async fn exchange(
        &self,
        _endpoint: &str,
        _request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        if self.healthy {
            serde_json::from_value(json!({
                "result": { "tools": [{ "name": "check_stock", "description": "Check stock" }] }
            }))
            .map_err(|err| TransportError::Decode(err.to_string()))
        } else {
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }
}

#[derive(Default)]
struct RecordingDirectory {
    saved: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ProviderDirectory for RecordingDirectory {
    async fn register_provider(
        &self,
        name: &str,
        endpoint: &str,
    ) -> anyhow::Result<ProviderRecord> {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push((name.to_string(), endpoint.to_string()));
        }
        Ok(ProviderRecord {
            id: "p-1".to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<(String, Value)>>,
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

fn dispatcher_with(
    healthy_provider: bool,
) -> (CommandDispatcher, Arc<ProviderRegistry>, Arc<RecordingDirectory>, Arc<CollectingSink>) {
    let registry = Arc::new(ProviderRegistry::new(Arc::new(FixedTransport {
        healthy: healthy_provider,
    })));
    let directory = Arc::new(RecordingDirectory::default());
    let sink = Arc::new(CollectingSink::default());

    let mut handlers = CommandHandlers::new();
    handlers.register(ConnectProviderHandler::new(
        Arc::clone(&registry),
        directory.clone(),
        sink.clone(),
    ));

    (CommandDispatcher::new(Arc::new(DownBroker), handlers), registry, directory, sink)
}

#[tokio::test]
async fn broker_down_connect_succeeds_inline_with_one_success_notification() {
    let (dispatcher, registry, directory, sink) = dispatcher_with(true);
    dispatcher.start().await;
    assert!(!dispatcher.is_connected());

    let mode = dispatcher
        .dispatch(
            ACTION_CONNECT_PROVIDER,
            json!({ "name": "erp", "endpoint": "http://erp.internal/rpc" }),
        )
        .await;

    assert_eq!(mode, DeliveryMode::Fallback);

    let catalog = registry.aggregate_catalog().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].name, "erp_check_stock");

    assert_eq!(
        directory.saved.lock().expect("directory lock").as_slice(),
        &[("erp".to_string(), "http://erp.internal/rpc".to_string())]
    );

    let events = sink.events();
    assert_eq!(events.len(), 1, "exactly one terminal notification");
    assert_eq!(events[0].0, EVENT_CONNECTION_RESULT);
    assert_eq!(events[0].1["status"], "success");
}

#[tokio::test]
async fn broker_down_connect_failure_emits_one_error_notification() {
    let (dispatcher, registry, directory, sink) = dispatcher_with(false);
    dispatcher.start().await;

    let mode = dispatcher
        .dispatch(
            ACTION_CONNECT_PROVIDER,
            json!({ "name": "erp", "endpoint": "http://erp.internal/rpc" }),
        )
        .await;

    assert_eq!(mode, DeliveryMode::Fallback);
    assert!(registry.aggregate_catalog().await.is_empty(), "failed handshake caches nothing");
    assert!(directory.saved.lock().expect("directory lock").is_empty());

    let events = sink.events();
    assert_eq!(events.len(), 1, "exactly one terminal notification");
    assert_eq!(events[0].1["status"], "error");
    assert_eq!(events[0].1["name"], "erp");
}
