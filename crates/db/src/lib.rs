pub mod connection;
pub mod events;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use events::{EventBus, OutboundEvent};
