use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use tavola_core::domain::message::ChatMessage;
use tavola_core::turn::{ConversationTurn, TurnEvent, TurnMachine, TurnPhase, TurnTransitionError};

use crate::collab::{ContextSearch, LessonSource};
use crate::llm::ChatModel;
use crate::prompt::compile_system_prompt;
use crate::router::ToolRouter;

/// Fixed reply while a human operator owns the thread.
pub const HUMAN_OVERRIDE_REPLY: &str = "[human operator active]";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model invocation failed: {0}")]
    Model(String),
    #[error("tool loop exceeded {limit} cycles")]
    ToolLoopExceeded { limit: u32 },
    #[error(transparent)]
    Transition(#[from] TurnTransitionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_cycles: u32,
}

/// Drives one conversation turn through the turn state machine. The turn
/// state is owned by the calling task; this service only holds shared,
/// read-side collaborators and is safe to use from many turns concurrently.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    router: Arc<ToolRouter>,
    retriever: Arc<dyn ContextSearch>,
    lessons: Arc<dyn LessonSource>,
    max_tool_cycles: u32,
    context_limit: u32,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        router: Arc<ToolRouter>,
        retriever: Arc<dyn ContextSearch>,
        lessons: Arc<dyn LessonSource>,
        max_tool_cycles: u32,
        context_limit: u32,
    ) -> Self {
        Self { model, router, retriever, lessons, max_tool_cycles, context_limit }
    }

    pub async fn run_turn(&self, turn: &mut ConversationTurn) -> Result<TurnOutcome, TurnError> {
        let machine = TurnMachine::new();
        let mut phase = machine.initial_phase();
        let mut tool_cycles = 0u32;
        let mut reply = String::new();

        loop {
            match phase {
                TurnPhase::RetrieveContext => {
                    self.retrieve_context(turn).await;
                    phase = machine.apply(&phase, &TurnEvent::ContextRetrieved)?.to;
                }
                TurnPhase::InvokeModel => {
                    if turn.human_override {
                        info!(
                            event_name = "agent.turn.human_override",
                            thread_id = %turn.thread_id,
                            "human override active; suppressing model invocation"
                        );
                        reply = HUMAN_OVERRIDE_REPLY.to_string();
                        turn.push(ChatMessage::assistant(reply.clone()));
                        phase = machine.apply(&phase, &TurnEvent::HumanOverrideActive)?.to;
                        continue;
                    }

                    self.ensure_system_message(turn).await;
                    let catalog = self.router.catalog().await;
                    let model_reply = self
                        .model
                        .complete(&turn.messages, &catalog)
                        .await
                        .map_err(|err| TurnError::Model(err.to_string()))?;

                    if model_reply.tool_calls.is_empty() {
                        reply = model_reply.content.clone();
                        turn.push(ChatMessage::assistant(model_reply.content));
                        phase = machine.apply(&phase, &TurnEvent::ModelAnsweredDirectly)?.to;
                    } else {
                        if tool_cycles >= self.max_tool_cycles {
                            warn!(
                                event_name = "agent.turn.tool_loop_exceeded",
                                thread_id = %turn.thread_id,
                                limit = self.max_tool_cycles,
                                "model kept requesting tools past the cycle bound"
                            );
                            return Err(TurnError::ToolLoopExceeded {
                                limit: self.max_tool_cycles,
                            });
                        }
                        turn.push(ChatMessage::assistant_with_calls(
                            model_reply.content,
                            model_reply.tool_calls,
                        ));
                        phase = machine.apply(&phase, &TurnEvent::ModelRequestedTools)?.to;
                    }
                }
                TurnPhase::ExecuteTools => {
                    tool_cycles += 1;
                    self.execute_requested_tools(turn).await;
                    phase = machine.apply(&phase, &TurnEvent::ToolResultsAppended)?.to;
                }
                TurnPhase::Terminal => break,
            }
        }

        Ok(TurnOutcome { reply, tool_cycles })
    }

    async fn retrieve_context(&self, turn: &mut ConversationTurn) {
        let Some(query) = turn.last_user_text().map(str::to_string) else {
            return;
        };

        match self.retriever.search(&query, self.context_limit).await {
            Ok(chunks) if !chunks.is_empty() => {
                turn.context = chunks.join("\n");
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    event_name = "agent.turn.retrieval_degraded",
                    thread_id = %turn.thread_id,
                    error = %error,
                    "context retrieval failed; continuing with empty context"
                );
            }
        }
    }

    async fn ensure_system_message(&self, turn: &mut ConversationTurn) {
        if turn.has_system_message() {
            return;
        }

        let lessons = match self.lessons.active_lessons().await {
            Ok(lessons) => lessons,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.lessons_unavailable",
                    thread_id = %turn.thread_id,
                    error = %error,
                    "lesson lookup failed; compiling prompt without lessons"
                );
                Vec::new()
            }
        };

        let prompt =
            compile_system_prompt(&turn.context, &lessons, turn.profile.display_name());
        turn.messages.insert(0, ChatMessage::system(prompt));
    }

    /// Executes the calls of the latest assistant message in request order,
    /// sequentially. Failures become in-band tool messages, never faults.
    async fn execute_requested_tools(&self, turn: &mut ConversationTurn) {
        let calls = turn
            .messages
            .iter()
            .rev()
            .find(|message| message.requests_tools())
            .map(|message| message.tool_calls.clone())
            .unwrap_or_default();

        // Resolve against the catalog as it exists now, not at bind time.
        let catalog = self.router.catalog().await;

        for call in calls {
            let content = match self.router.execute(&catalog, &call).await {
                Ok(value) => render_tool_content(value),
                Err(error) => error.to_string(),
            };

            debug!(
                event_name = "agent.turn.tool_executed",
                thread_id = %turn.thread_id,
                tool = %call.name,
                call_id = %call.call_id,
                "tool call resolved"
            );

            turn.push(ChatMessage::tool(call.call_id, call.name, content));
        }
    }
}

fn render_tool_content(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
