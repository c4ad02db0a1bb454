//! Conversation and admin API. The message endpoint is the request path;
//! provider connection goes through the command dispatcher so the handshake
//! never blocks an admin request.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use tavola_agent::orchestrator::{Orchestrator, TurnError};
use tavola_agent::router::ToolRouter;
use tavola_agent::supervisor::{SpecialistProfile, SupervisorRouter};
use tavola_core::domain::message::ChatMessage;
use tavola_core::domain::profile::UserProfile;
use tavola_core::domain::tool::ToolDescriptor;
use tavola_core::turn::ConversationTurn;
use tavola_db::repositories::{
    InterventionRepository, MessageRepository, ProviderRepository, StoredMessage,
};
use tavola_db::EventBus;
use tavola_dispatch::{CommandDispatcher, DeliveryMode, ACTION_CONNECT_PROVIDER};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub supervisor: Arc<SupervisorRouter>,
    pub tool_router: Arc<ToolRouter>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub messages: Arc<dyn MessageRepository>,
    pub interventions: Arc<dyn InterventionRepository>,
    pub providers: Arc<dyn ProviderRepository>,
    pub events: EventBus,
    pub history_limit: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/conversations/message", post(handle_message))
        .route("/api/conversations/intervene", post(toggle_intervention))
        .route("/api/providers/connect", post(connect_provider))
        .route("/api/providers", get(list_providers))
        .route("/api/tools", get(list_tools))
        .route("/api/supervisor/route", post(route_supervisor))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub conversation_id: String,
    pub reply: String,
    pub tool_cycles: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

fn service_error(error: impl std::fmt::Display) -> (StatusCode, Json<ApiError>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(ApiError { error: error.to_string() }))
}

pub async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ApiError>)> {
    let thread_id = request.conversation_id.clone();

    state
        .messages
        .save(&thread_id, "user", &request.text)
        .await
        .map_err(service_error)?;

    let override_active =
        state.interventions.state(&thread_id).await.map_err(service_error)?;

    let history = state
        .messages
        .history(&thread_id, state.history_limit)
        .await
        .map_err(service_error)?;

    let mut turn = ConversationTurn::with_history(&thread_id, history_to_messages(&history));
    turn.human_override = override_active;
    if let Some(user_name) = request.user_name {
        turn.profile = UserProfile::named(user_name);
    }

    let outcome = state.orchestrator.run_turn(&mut turn).await.map_err(|error| {
        warn!(
            event_name = "api.conversation.turn_failed",
            thread_id = %thread_id,
            error = %error,
            "turn failed"
        );
        let status = match error {
            TurnError::Model(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ApiError { error: error.to_string() }))
    })?;

    if !override_active {
        state
            .messages
            .save(&thread_id, "assistant", &outcome.reply)
            .await
            .map_err(service_error)?;
    }

    state.events.emit(
        "conversation.message",
        json!({
            "conversation_id": thread_id,
            "reply": outcome.reply,
            "tool_cycles": outcome.tool_cycles,
        }),
    );

    info!(
        event_name = "api.conversation.turn_completed",
        thread_id = %thread_id,
        tool_cycles = outcome.tool_cycles,
        "turn completed"
    );

    Ok(Json(MessageResponse {
        conversation_id: thread_id,
        reply: outcome.reply,
        tool_cycles: outcome.tool_cycles,
    }))
}

fn history_to_messages(history: &[StoredMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter_map(|stored| match stored.sender.as_str() {
            "user" => Some(ChatMessage::user(&stored.body)),
            "assistant" => Some(ChatMessage::assistant(&stored.body)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct InterventionRequest {
    pub conversation_id: String,
    pub active: bool,
}

pub async fn toggle_intervention(
    State(state): State<AppState>,
    Json(request): Json<InterventionRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    state
        .interventions
        .set_state(&request.conversation_id, request.active)
        .await
        .map_err(service_error)?;

    let status = if request.active { "human takeover activated" } else { "bot resumed" };
    state.events.emit(
        "conversation.intervention",
        json!({
            "conversation_id": request.conversation_id,
            "active": request.active,
            "message": status,
        }),
    );

    Ok(Json(json!({
        "status": status,
        "conversation_id": request.conversation_id,
        "intervention_active": request.active,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ConnectProviderRequest {
    pub name: String,
    #[serde(alias = "url")]
    pub endpoint: String,
}

pub async fn connect_provider(
    State(state): State<AppState>,
    Json(request): Json<ConnectProviderRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let delivery = state
        .dispatcher
        .dispatch(
            ACTION_CONNECT_PROVIDER,
            json!({ "name": request.name, "endpoint": request.endpoint }),
        )
        .await;

    let delivery_label = match delivery {
        DeliveryMode::Queued => "queued",
        DeliveryMode::Fallback => "fallback",
    };

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "processing",
            "name": request.name,
            "delivery": delivery_label,
        })),
    )
}

pub async fn list_providers(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    let providers = state.providers.list().await.map_err(service_error)?;
    Ok(Json(json!({ "providers": providers })))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.tool_router.catalog().await)
}

#[derive(Debug, Deserialize)]
pub struct SupervisorRequest {
    pub message: String,
    #[serde(default)]
    pub specialists: Vec<SpecialistProfile>,
}

pub async fn route_supervisor(
    State(state): State<AppState>,
    Json(request): Json<SupervisorRequest>,
) -> Json<serde_json::Value> {
    let specialist_id = state.supervisor.route(&request.message, &request.specialists).await;
    Json(json!({ "specialist_id": specialist_id }))
}
