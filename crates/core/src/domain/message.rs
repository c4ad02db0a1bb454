use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

/// A tool invocation requested by the model within an assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Links a tool message back to the assistant call that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLink {
    pub call_id: String,
    pub tool_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_link: Option<ToolLink>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_calls: Vec::new(), tool_link: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_calls: Vec::new(), tool_link: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_link: None,
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_calls: calls, tool_link: None }
    }

    pub fn tool(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_link: Some(ToolLink { call_id: call_id.into(), tool_name: tool_name.into() }),
        }
    }

    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum MessageOrderError {
    #[error("tool message `{call_id}` has no originating assistant call")]
    OrphanToolMessage { call_id: String },
    #[error("tool messages out of order: expected call `{expected}`, found `{found}`")]
    OutOfOrder { expected: String, found: String },
    #[error("assistant call `{call_id}` received no tool reply")]
    MissingToolReply { call_id: String },
}

/// Checks the tool-reply invariant over a message sequence: every assistant
/// message that requests tools must be followed by exactly its tool replies,
/// in request order, before any other message.
pub fn verify_tool_reply_order(messages: &[ChatMessage]) -> Result<(), MessageOrderError> {
    let mut pending: Vec<&ToolCallRequest> = Vec::new();

    for message in messages {
        match message.role {
            Role::Tool => {
                let link = message.tool_link.as_ref();
                let call_id = link.map(|l| l.call_id.as_str()).unwrap_or("");
                match pending.first() {
                    None => {
                        return Err(MessageOrderError::OrphanToolMessage {
                            call_id: call_id.to_string(),
                        });
                    }
                    Some(expected) if expected.call_id != call_id => {
                        return Err(MessageOrderError::OutOfOrder {
                            expected: expected.call_id.clone(),
                            found: call_id.to_string(),
                        });
                    }
                    Some(_) => {
                        pending.remove(0);
                    }
                }
            }
            _ => {
                if let Some(unanswered) = pending.first() {
                    return Err(MessageOrderError::MissingToolReply {
                        call_id: unanswered.call_id.clone(),
                    });
                }
                if message.requests_tools() {
                    pending = message.tool_calls.iter().collect();
                }
            }
        }
    }

    match pending.first() {
        Some(unanswered) => {
            Err(MessageOrderError::MissingToolReply { call_id: unanswered.call_id.clone() })
        }
        None => Ok(()),
    }
}
