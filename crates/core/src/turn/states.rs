use serde::{Deserialize, Serialize};

use crate::domain::message::ChatMessage;
use crate::domain::profile::UserProfile;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    RetrieveContext,
    InvokeModel,
    ExecuteTools,
    Terminal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    ContextRetrieved,
    HumanOverrideActive,
    ModelAnsweredDirectly,
    ModelRequestedTools,
    ToolResultsAppended,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTransition {
    pub from: TurnPhase,
    pub to: TurnPhase,
    pub event: TurnEvent,
}

/// State for one in-flight conversation turn. Owned exclusively by the task
/// handling the inbound message; never shared across threads' turns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    pub context: String,
    pub profile: UserProfile,
    pub human_override: bool,
}

impl ConversationTurn {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self { thread_id: thread_id.into(), ..Self::default() }
    }

    pub fn with_history(thread_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self { thread_id: thread_id.into(), messages, ..Self::default() }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == crate::domain::message::Role::User)
            .map(|message| message.content.as_str())
    }

    pub fn has_system_message(&self) -> bool {
        self.messages.iter().any(|message| message.role == crate::domain::message::Role::System)
    }
}
