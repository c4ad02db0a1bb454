use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::{BrokerTransport, CommandEnvelope, DeliveryMode};
use crate::handlers::CommandHandlers;

/// Dispatches administrative commands through the broker when it is
/// reachable and falls back to inline execution when it is not. A broker
/// failure must never lose a command or prevent the process from starting.
pub struct CommandDispatcher {
    broker: Arc<dyn BrokerTransport>,
    handlers: Arc<CommandHandlers>,
    connected: AtomicBool,
    consume_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CommandDispatcher {
    pub fn new(broker: Arc<dyn BrokerTransport>, handlers: CommandHandlers) -> Self {
        Self {
            broker,
            handlers: Arc::new(handlers),
            connected: AtomicBool::new(false),
            consume_handle: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Attempts broker connectivity and launches the background consumption
    /// loop. Connection failure leaves the dispatcher in fallback mode.
    pub async fn start(&self) {
        match self.broker.connect().await {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                let broker = Arc::clone(&self.broker);
                let handlers = Arc::clone(&self.handlers);
                let handle = tokio::spawn(async move {
                    consume_loop(broker, handlers).await;
                });
                *self.consume_handle.lock().await = Some(handle);
                info!(
                    event_name = "dispatch.started",
                    mode = "queued",
                    "command dispatcher connected to broker"
                );
            }
            Err(error) => {
                self.connected.store(false, Ordering::SeqCst);
                warn!(
                    event_name = "dispatch.started",
                    mode = "fallback",
                    error = %error,
                    "broker unavailable; commands will execute inline"
                );
            }
        }
    }

    /// Publishes the command, or runs its handler inline when the broker is
    /// unavailable or the publish fails. Returns the witnessed delivery mode.
    pub async fn dispatch(&self, action: &str, payload: Value) -> DeliveryMode {
        let envelope = CommandEnvelope::new(action, payload);

        if self.is_connected() {
            match serde_json::to_vec(&envelope) {
                Ok(bytes) => match self.broker.publish(&bytes).await {
                    Ok(()) => {
                        debug!(
                            event_name = "dispatch.command.queued",
                            action = %envelope.action,
                            "command published to broker"
                        );
                        return DeliveryMode::Queued;
                    }
                    Err(error) => {
                        warn!(
                            event_name = "dispatch.command.publish_failed",
                            action = %envelope.action,
                            error = %error,
                            "publish failed; executing command inline"
                        );
                    }
                },
                Err(error) => {
                    warn!(
                        event_name = "dispatch.command.encode_failed",
                        action = %envelope.action,
                        error = %error,
                        "envelope encoding failed; executing command inline"
                    );
                }
            }
        } else {
            info!(
                event_name = "dispatch.command.fallback",
                action = %envelope.action,
                "broker unavailable; executing command inline"
            );
        }

        self.run_inline(&envelope).await;
        DeliveryMode::Fallback
    }

    async fn run_inline(&self, envelope: &CommandEnvelope) {
        if let Err(error) = self.handlers.handle(envelope).await {
            warn!(
                event_name = "dispatch.command.handler_failed",
                action = %envelope.action,
                error = %error,
                "inline command handler failed"
            );
        }
    }

    /// Stops the consumption loop and closes the broker connection. The loop
    /// task is aborted first so its subscription lock is released before the
    /// transport is closed.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.consume_handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        if let Err(error) = self.broker.close().await {
            warn!(
                event_name = "dispatch.shutdown.close_failed",
                error = %error,
                "broker close failed during shutdown"
            );
        }
        self.connected.store(false, Ordering::SeqCst);
        info!(event_name = "dispatch.stopped", "command dispatcher stopped");
    }
}

async fn consume_loop(broker: Arc<dyn BrokerTransport>, handlers: Arc<CommandHandlers>) {
    loop {
        match broker.next_message().await {
            Ok(Some(bytes)) => {
                let envelope = match serde_json::from_slice::<CommandEnvelope>(&bytes) {
                    Ok(envelope) => envelope,
                    Err(error) => {
                        warn!(
                            event_name = "dispatch.consume.decode_failed",
                            error = %error,
                            "skipping malformed command envelope"
                        );
                        continue;
                    }
                };

                debug!(
                    event_name = "dispatch.consume.received",
                    action = %envelope.action,
                    "consuming command envelope"
                );

                if let Err(error) = handlers.handle(&envelope).await {
                    warn!(
                        event_name = "dispatch.consume.handler_failed",
                        action = %envelope.action,
                        error = %error,
                        "command handler failed; loop continues"
                    );
                }
            }
            Ok(None) => {
                info!(event_name = "dispatch.consume.closed", "broker stream closed");
                break;
            }
            Err(error) => {
                warn!(
                    event_name = "dispatch.consume.receive_failed",
                    error = %error,
                    "broker receive failed; stopping consumption loop"
                );
                break;
            }
        }
    }
}
