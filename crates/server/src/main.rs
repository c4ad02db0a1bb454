mod bootstrap;
mod collaborators;
mod health;
mod routes;

use anyhow::Result;
use tavola_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use tavola_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    if std::env::var("TAVOLA_SEED_DEMO").is_ok_and(|value| value == "1") {
        tavola_db::fixtures::seed_demo(&app.db_pool).await?;
        tracing::info!(
            event_name = "system.bootstrap.demo_seeded",
            correlation_id = "bootstrap",
            "demo fixtures applied"
        );
    }

    // A broker failure leaves the dispatcher in fallback mode; it never
    // blocks startup.
    app.state.dispatcher.start().await;

    let dispatcher = app.state.dispatcher.clone();
    let db_pool = app.db_pool.clone();
    let shutdown_window =
        std::time::Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "tavola-server listening"
    );

    let router = routes::router(app.state).merge(health::router(app.db_pool.clone()));
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "tavola-server stopping"
    );

    let cleanup = async {
        dispatcher.shutdown().await;
        db_pool.close().await;
    };
    if tokio::time::timeout(shutdown_window, cleanup).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timed_out",
            correlation_id = "shutdown",
            window_secs = app.config.server.graceful_shutdown_secs,
            "graceful shutdown window exceeded; exiting with resources unreleased"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
