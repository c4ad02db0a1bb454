use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::broker::{BrokerError, BrokerTransport};

/// Core-NATS broker transport. One subject carries all command envelopes;
/// consumers share a queue group so exactly one instance processes each
/// envelope. `publish` flushes before returning, which is the broker-side
/// acknowledgment the dispatcher waits for.
pub struct NatsBroker {
    url: String,
    subject: String,
    queue_group: String,
    client: RwLock<Option<async_nats::Client>>,
    subscriber: Mutex<Option<async_nats::Subscriber>>,
}

impl NatsBroker {
    pub fn new(
        url: impl Into<String>,
        subject: impl Into<String>,
        queue_group: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            subject: subject.into(),
            queue_group: queue_group.into(),
            client: RwLock::new(None),
            subscriber: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BrokerTransport for NatsBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|err| BrokerError::Connect(err.to_string()))?;

        let subscriber = client
            .queue_subscribe(self.subject.clone(), self.queue_group.clone())
            .await
            .map_err(|err| BrokerError::Connect(err.to_string()))?;

        info!(
            event_name = "dispatch.broker.connected",
            url = %self.url,
            subject = %self.subject,
            queue_group = %self.queue_group,
            "broker connection established"
        );

        *self.client.write().await = Some(client);
        *self.subscriber.lock().await = Some(subscriber);
        Ok(())
    }

    async fn publish(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(BrokerError::NotConnected)?;

        client
            .publish(self.subject.clone(), payload.to_vec().into())
            .await
            .map_err(|err| BrokerError::Publish(err.to_string()))?;
        client.flush().await.map_err(|err| BrokerError::Publish(err.to_string()))
    }

    async fn next_message(&self) -> Result<Option<Vec<u8>>, BrokerError> {
        let mut guard = self.subscriber.lock().await;
        let Some(subscriber) = guard.as_mut() else {
            return Ok(None);
        };

        Ok(subscriber.next().await.map(|message| message.payload.to_vec()))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if let Some(mut subscriber) = self.subscriber.lock().await.take() {
            subscriber
                .unsubscribe()
                .await
                .map_err(|err| BrokerError::Disconnect(err.to_string()))?;
        }
        self.client.write().await.take();
        Ok(())
    }
}
