//! Command dispatch - administrative operations off the request path
//!
//! Commands are published to a message broker and consumed by a background
//! loop; when the broker is unavailable (or a publish fails) the matching
//! handler runs synchronously and inline instead, so a command is never
//! lost. The only producer of commands today is the admin surface, and the
//! only consumer of the handlers is the capability federation layer.

pub mod broker;
pub mod dispatcher;
pub mod handlers;
pub mod nats;

pub use broker::{BrokerError, BrokerTransport, CommandEnvelope, DeliveryMode};
pub use dispatcher::CommandDispatcher;
pub use handlers::{
    CommandHandler, CommandHandlers, ConnectProviderHandler, EventSink, HandlerError,
    ProviderDirectory, ProviderRecord, ACTION_CONNECT_PROVIDER, EVENT_CONNECTION_RESULT,
};
pub use nats::NatsBroker;
