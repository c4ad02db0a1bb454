use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// One event broadcast to in-process observers (websocket fan-out, tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundEvent {
    pub event_type: String,
    pub data: Value,
    pub emitted_at: DateTime<Utc>,
}

/// Fire-and-forget notification bus. `emit` never fails: with no observers
/// subscribed the event is dropped, and a slow observer only loses its own
/// backlog once the channel capacity is exceeded.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OutboundEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event_type: &str, data: Value) {
        let event = OutboundEvent {
            event_type: event_type.to_string(),
            data,
            emitted_at: Utc::now(),
        };
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(event_type, delivered, "event emitted");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::EventBus;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::default();
        let mut receiver = bus.subscribe();

        bus.emit("provider.connection_result", json!({ "status": "success" }));

        let event = receiver.recv().await.expect("event should be delivered");
        assert_eq!(event.event_type, "provider.connection_result");
        assert_eq!(event.data["status"], "success");
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.emit("conversation.message", json!({ "thread_id": "t-1" }));
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_copy() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit("menu.updated", json!({}));

        assert_eq!(first.recv().await.expect("first copy").event_type, "menu.updated");
        assert_eq!(second.recv().await.expect("second copy").event_type, "menu.updated");
    }
}
