//! End-to-end properties of the turn loop: tool-reply ordering, human
//! override, and isolation of concurrent turns on distinct threads.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use tavola_agent::collab::{ContextSearch, LessonSource};
use tavola_agent::llm::{ChatModel, ModelReply};
use tavola_agent::orchestrator::{Orchestrator, HUMAN_OVERRIDE_REPLY};
use tavola_agent::router::ToolRouter;
use tavola_agent::tools::{Tool, ToolRegistry};
use tavola_core::domain::message::{verify_tool_reply_order, ChatMessage, Role, ToolCallRequest};
use tavola_core::domain::tool::ToolDescriptor;
use tavola_core::turn::ConversationTurn;
use tavola_federation::{ProviderRegistry, RpcRequest, RpcResponse, RpcTransport, TransportError};

struct EmptySearch;

#[async_trait]
impl ContextSearch for EmptySearch {
    async fn search(&self, _query: &str, _limit: u32) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct NoLessons;

#[async_trait]
impl LessonSource for NoLessons {
    async fn active_lessons(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct DeadTransport;

#[async_trait]
impl RpcTransport for DeadTransport {
    async fn exchange(
        &self,
        _endpoint: &str,
        _request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        Err(TransportError::Connect("no federated providers in this test".to_string()))
    }
}

/// Echoes its arguments; used to observe per-thread payloads downstream.
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echo the arguments back"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        Ok(input)
    }
}

/// Deterministic per-history model: first invocation of a turn requests two
/// echo calls tagged with the thread's inbound text, the second produces a
/// final answer quoting it. Yields between steps to encourage interleaving
/// of concurrent turns.
struct ThreadAwareModel;

#[async_trait]
impl ChatModel for ThreadAwareModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDescriptor],
    ) -> anyhow::Result<ModelReply> {
        tokio::task::yield_now().await;

        let inbound = messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();

        let already_ran_tools = messages.iter().any(|message| message.role == Role::Tool);
        if already_ran_tools {
            return Ok(ModelReply { content: format!("done:{inbound}"), tool_calls: Vec::new() });
        }

        Ok(ModelReply {
            content: String::new(),
            tool_calls: vec![
                ToolCallRequest {
                    call_id: format!("{inbound}-call-1"),
                    name: "echo".to_string(),
                    arguments: json!({ "origin": inbound, "step": 1 }),
                },
                ToolCallRequest {
                    call_id: format!("{inbound}-call-2"),
                    name: "echo".to_string(),
                    arguments: json!({ "origin": inbound, "step": 2 }),
                },
            ],
        })
    }
}

fn orchestrator() -> Arc<Orchestrator> {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool);
    let router = Arc::new(ToolRouter::new(
        registry,
        Arc::new(ProviderRegistry::new(Arc::new(DeadTransport))),
    ));

    Arc::new(Orchestrator::new(
        Arc::new(ThreadAwareModel),
        router,
        Arc::new(EmptySearch),
        Arc::new(NoLessons),
        8,
        3,
    ))
}

#[tokio::test]
async fn tool_replies_are_ordered_and_linked_before_the_next_invocation() {
    let orchestrator = orchestrator();

    let mut turn = ConversationTurn::new("thread-a");
    turn.push(ChatMessage::user("alpha"));

    let outcome = orchestrator.run_turn(&mut turn).await.expect("turn succeeds");

    assert_eq!(outcome.reply, "done:alpha");
    verify_tool_reply_order(&turn.messages).expect("ordering invariant holds");

    let tool_ids: Vec<String> = turn
        .messages
        .iter()
        .filter(|message| message.role == Role::Tool)
        .filter_map(|message| message.tool_link.as_ref().map(|link| link.call_id.clone()))
        .collect();
    assert_eq!(tool_ids, vec!["alpha-call-1", "alpha-call-2"]);
}

#[tokio::test]
async fn human_override_suppresses_the_model_for_any_message() {
    let orchestrator = orchestrator();

    for text in ["hello", "cancel everything", "loop please"] {
        let mut turn = ConversationTurn::new("thread-h");
        turn.human_override = true;
        turn.push(ChatMessage::user(text));

        let outcome = orchestrator.run_turn(&mut turn).await.expect("turn succeeds");
        assert_eq!(outcome.reply, HUMAN_OVERRIDE_REPLY);
        assert_eq!(outcome.tool_cycles, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_on_distinct_threads_never_interleave_messages() {
    let orchestrator = orchestrator();

    let mut tasks = Vec::new();
    for label in ["red", "green", "blue", "amber"] {
        let orchestrator = Arc::clone(&orchestrator);
        tasks.push(tokio::spawn(async move {
            let mut turn = ConversationTurn::new(format!("thread-{label}"));
            turn.push(ChatMessage::user(label));
            let outcome = orchestrator.run_turn(&mut turn).await.expect("turn succeeds");
            (label, outcome, turn)
        }));
    }

    for task in tasks {
        let (label, outcome, turn) = task.await.expect("task completes");

        assert_eq!(outcome.reply, format!("done:{label}"));
        verify_tool_reply_order(&turn.messages).expect("each thread's sequence is consistent");

        // Every tool message in this turn must belong to this thread.
        for message in turn.messages.iter().filter(|message| message.role == Role::Tool) {
            let link = message.tool_link.as_ref().expect("tool link present");
            assert!(
                link.call_id.starts_with(label),
                "thread `{label}` saw foreign call id `{}`",
                link.call_id
            );
            assert!(message.content.contains(label));
        }
    }
}
