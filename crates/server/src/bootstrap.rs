use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use tavola_agent::llm::{ModelGateway, OpenAiCompatModel};
use tavola_agent::orchestrator::Orchestrator;
use tavola_agent::router::ToolRouter;
use tavola_agent::supervisor::SupervisorRouter;
use tavola_agent::tools::{
    CreatePaymentLinkTool, DelegateTaskTool, SearchKnowledgeTool, SearchMenuTool, ToolRegistry,
};
use tavola_core::config::{AppConfig, ConfigError, LoadOptions};
use tavola_db::repositories::{
    SqlInterventionRepository, SqlKnowledgeRepository, SqlLessonRepository, SqlMenuRepository,
    SqlMessageRepository, SqlModelConfigRepository, SqlProviderRepository,
};
use tavola_db::{connect_with_settings, migrations, DbPool, EventBus};
use tavola_dispatch::{CommandDispatcher, CommandHandlers, ConnectProviderHandler, NatsBroker};
use tavola_federation::{HttpRpcTransport, ProviderRegistry};

use crate::collaborators::{
    BusEventSink, BusStaffNotifier, DbContextSearch, DbLessonSource, DbMenuSource,
    DbModelConfigSource, DbProviderDirectory,
};
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Builds every service object once and injects them by reference; nothing
/// in the process relies on global state.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let events = EventBus::default();

    let messages = Arc::new(SqlMessageRepository::new(db_pool.clone()));
    let interventions = Arc::new(SqlInterventionRepository::new(db_pool.clone()));
    let providers = Arc::new(SqlProviderRepository::new(db_pool.clone()));
    let knowledge = Arc::new(SqlKnowledgeRepository::new(db_pool.clone()));
    let menu = Arc::new(SqlMenuRepository::new(db_pool.clone()));
    let lessons = Arc::new(SqlLessonRepository::new(db_pool.clone()));
    let model_configs = Arc::new(SqlModelConfigRepository::new(db_pool.clone()));

    let registry = Arc::new(ProviderRegistry::new(Arc::new(HttpRpcTransport::new(
        Duration::from_secs(config.federation.connect_timeout_secs),
        Duration::from_secs(config.federation.call_timeout_secs),
    ))));

    let mut handlers = CommandHandlers::new();
    handlers.register(ConnectProviderHandler::new(
        Arc::clone(&registry),
        Arc::new(DbProviderDirectory::new(providers.clone())),
        Arc::new(BusEventSink::new(events.clone())),
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(NatsBroker::new(
            config.broker.url.clone(),
            config.broker.subject.clone(),
            config.broker.queue_group.clone(),
        )),
        handlers,
    ));

    let retriever = Arc::new(DbContextSearch::new(knowledge));
    let model = Arc::new(ModelGateway::new(
        Arc::new(DbModelConfigSource::new(model_configs)),
        Arc::new(OpenAiCompatModel::from_config(&config.llm)),
        Duration::from_secs(config.llm.timeout_secs),
    ));

    let mut tools = ToolRegistry::new();
    tools.register(SearchMenuTool::new(Arc::new(DbMenuSource::new(menu))));
    tools.register(SearchKnowledgeTool::new(retriever.clone()));
    tools.register(CreatePaymentLinkTool);
    tools.register(DelegateTaskTool::new(Arc::new(BusStaffNotifier::new(events.clone()))));

    let tool_router = Arc::new(ToolRouter::new(tools, Arc::clone(&registry)));

    let orchestrator = Arc::new(Orchestrator::new(
        model.clone(),
        tool_router.clone(),
        retriever,
        Arc::new(DbLessonSource::new(lessons)),
        config.agent.max_tool_cycles,
        config.agent.context_limit,
    ));

    let state = AppState {
        orchestrator,
        supervisor: Arc::new(SupervisorRouter::new(model)),
        tool_router,
        dispatcher,
        messages,
        interventions,
        providers,
        events,
        history_limit: config.agent.history_limit,
    };

    Ok(Application { config, db_pool, state })
}
