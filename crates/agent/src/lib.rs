//! Agent runtime - the conversation orchestration engine
//!
//! One inbound customer message becomes one *turn*: retrieve supporting
//! context, invoke the model with the live tool catalog bound, execute any
//! tools the model requests, and loop until the model produces a final
//! answer. The tool catalog is the union of the builtin tools in this crate
//! and whatever the capability federation registry currently exposes.
//!
//! # Key types
//!
//! - `Orchestrator` - drives the turn state machine (see `orchestrator`)
//! - `ChatModel` - pluggable model seam; `ModelGateway` makes the active
//!   provider/model/credential selection swappable at runtime
//! - `Tool` / `ToolRegistry` - builtin capability surface
//! - `ToolRouter` - one generic execution path over builtin and federated
//!   tools
//! - `SupervisorRouter` - one-shot specialist classification
//!
//! # Failure principle
//!
//! A failing tool call is data, not a fault: the result (or the error text)
//! is appended as a `tool` message so the model can reason about it. Only a
//! failure of the model invocation itself aborts a turn.

pub mod collab;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod router;
pub mod supervisor;
pub mod tools;

pub use collab::{ContextSearch, LessonSource, MenuEntry, MenuSource, StaffNotifier};
pub use llm::{
    ChatModel, ModelConfigSource, ModelGateway, ModelReply, ModelSelection, OpenAiCompatModel,
};
pub use orchestrator::{Orchestrator, TurnError, TurnOutcome, HUMAN_OVERRIDE_REPLY};
pub use router::{ToolRouteError, ToolRouter};
pub use supervisor::{SpecialistProfile, SupervisorRouter, DEFAULT_SPECIALIST_ID};
pub use tools::{
    CreatePaymentLinkTool, DelegateTaskTool, SearchKnowledgeTool, SearchMenuTool, Tool,
    ToolRegistry,
};
