use thiserror::Error;

use crate::turn::states::{TurnEvent, TurnPhase, TurnTransition};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnTransitionError {
    #[error("invalid turn transition from {phase:?} using event {event:?}")]
    InvalidTransition { phase: TurnPhase, event: TurnEvent },
}

/// The turn state machine. Pure transition table; all side effects live in
/// the orchestrator that drives it.
#[derive(Clone, Debug, Default)]
pub struct TurnMachine;

impl TurnMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_phase(&self) -> TurnPhase {
        TurnPhase::RetrieveContext
    }

    pub fn apply(
        &self,
        current: &TurnPhase,
        event: &TurnEvent,
    ) -> Result<TurnTransition, TurnTransitionError> {
        use TurnEvent::{
            ContextRetrieved, HumanOverrideActive, ModelAnsweredDirectly, ModelRequestedTools,
            ToolResultsAppended,
        };
        use TurnPhase::{ExecuteTools, InvokeModel, RetrieveContext, Terminal};

        let to = match (current, event) {
            (RetrieveContext, ContextRetrieved) => InvokeModel,
            (InvokeModel, HumanOverrideActive) => Terminal,
            (InvokeModel, ModelAnsweredDirectly) => Terminal,
            (InvokeModel, ModelRequestedTools) => ExecuteTools,
            (ExecuteTools, ToolResultsAppended) => InvokeModel,
            _ => {
                return Err(TurnTransitionError::InvalidTransition {
                    phase: current.clone(),
                    event: event.clone(),
                });
            }
        };

        Ok(TurnTransition { from: current.clone(), to, event: event.clone() })
    }
}
