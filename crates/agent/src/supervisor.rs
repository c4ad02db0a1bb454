use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tavola_core::domain::message::ChatMessage;

use crate::llm::ChatModel;

pub const DEFAULT_SPECIALIST_ID: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistProfile {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Classifies an inbound message against the available specialists with one
/// model call. Stateless; no retries. Any failure (model error, empty reply,
/// an id that is not on offer) falls back deterministically to the first
/// specialist, or to the fixed default id when none were provided.
pub struct SupervisorRouter {
    model: Arc<dyn ChatModel>,
}

impl SupervisorRouter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn route(&self, message: &str, specialists: &[SpecialistProfile]) -> String {
        let Some(first) = specialists.first() else {
            return DEFAULT_SPECIALIST_ID.to_string();
        };

        let prompt = classification_prompt(message, specialists);
        match self.model.complete(&[ChatMessage::user(prompt)], &[]).await {
            Ok(reply) => {
                let candidate = reply.content.trim();
                if specialists.iter().any(|specialist| specialist.id == candidate) {
                    candidate.to_string()
                } else {
                    warn!(
                        event_name = "agent.supervisor.unrecognized_choice",
                        candidate,
                        "classifier returned an unknown specialist id; using first"
                    );
                    first.id.clone()
                }
            }
            Err(error) => {
                warn!(
                    event_name = "agent.supervisor.classification_failed",
                    error = %error,
                    "specialist classification failed; using first"
                );
                first.id.clone()
            }
        }
    }
}

fn classification_prompt(message: &str, specialists: &[SpecialistProfile]) -> String {
    let roster = specialists
        .iter()
        .map(|specialist| {
            format!("- {}: {} ({})", specialist.id, specialist.name, specialist.description)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the service supervisor of a pizzeria. Read the customer \
         message and pick the best-suited specialist.\n\
         \n\
         AVAILABLE SPECIALISTS:\n\
         {roster}\n\
         \n\
         CUSTOMER MESSAGE: {message}\n\
         \n\
         Reply with ONLY the specialist id (for example: a1). No explanation."
    )
}
