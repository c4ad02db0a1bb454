pub mod config;
pub mod domain;
pub mod turn;

pub use domain::message::{ChatMessage, Role, ToolCallRequest, ToolLink};
pub use domain::profile::UserProfile;
pub use domain::tool::{ToolDescriptor, ToolOrigin};
pub use turn::engine::{TurnMachine, TurnTransitionError};
pub use turn::states::{ConversationTurn, TurnEvent, TurnPhase, TurnTransition};
