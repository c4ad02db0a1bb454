pub mod engine;
pub mod states;

pub use engine::{TurnMachine, TurnTransitionError};
pub use states::{ConversationTurn, TurnEvent, TurnPhase, TurnTransition};
