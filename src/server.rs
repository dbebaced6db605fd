/// Server setup and initialization
///
/// Wires together all components: storage, cache, collaborators, trigger
/// scheduler, the workflow store and HTTP routes.

use crate::{
    api::workflows::{create_workflow_routes, AppState},
    collaborators::{
        cache::HOSTED_WORKFLOWS_KEY, HostedWorkflows, HttpBackend, LocalCache, SqliteCache,
        StaticSecret,
    },
    config::Config,
    lifecycle::CleanupOrchestrator,
    triggers::{CronTriggerService, TriggerFired},
    workflow::{storage::SqliteStorage, store::WorkflowStore},
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes
///
/// Opens the local database, restores persisted workflows and their triggers,
/// and returns the router together with the store it serves and the trigger
/// scheduler to stop on shutdown.
pub async fn create_app(
    config: Config,
) -> Result<(Router, Arc<WorkflowStore>, Arc<CronTriggerService>)> {
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    let db_path = config.database_path();
    tracing::info!("🗄️ Opening database: {}", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    let storage = SqliteStorage::new(pool.clone());
    storage.init_schema().await?;
    let cache = Arc::new(SqliteCache::new(pool));
    cache.init_schema().await?;

    tracing::info!("🌐 Loading hosted workflow registry");
    let hosted = Arc::new(HostedWorkflows::from_cached(cache.get(HOSTED_WORKFLOWS_KEY).await?));
    tracing::debug!("Hosted workflows: {}", hosted.len());

    let backend = Arc::new(HttpBackend::new(
        config.backend.url.clone(),
        config.backend.token.clone(),
    )?);
    let secrets = Arc::new(StaticSecret::new(config.secrets.workflow_secret.clone()));
    if config.secrets.workflow_secret.is_none() {
        tracing::warn!("⚠️ No workflow secret configured; protected imports need an explicit pass");
    }

    tracing::info!("⏰ Initializing trigger scheduler service");
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let triggers = Arc::new(CronTriggerService::new(Some(fired_tx)).await?);
    tokio::spawn(log_fired_triggers(fired_rx));

    let cleanup = CleanupOrchestrator::new(triggers.clone(), hosted, backend, cache);
    let store = Arc::new(WorkflowStore::new(
        Arc::new(storage),
        secrets,
        triggers.clone(),
        cleanup,
    ));

    tracing::info!("📥 Loading existing workflows from storage");
    store
        .init_from_storage()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load workflows from storage: {}", e))?;
    store.install_all_triggers().await;

    tracing::info!("🚀 Starting trigger scheduler");
    let scheduler = Arc::clone(&triggers);
    tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            tracing::error!("❌ Failed to start trigger scheduler: {}", e);
        }
    });

    let app_state = AppState {
        store: Arc::clone(&store),
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");

    Ok((app, store, triggers))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Flowkeep server...");

    let (app, _store, triggers) = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown(&triggers).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}

/// Stop background services once the HTTP server has drained
async fn shutdown(triggers: &CronTriggerService) -> Result<()> {
    triggers.stop().await?;
    tracing::info!("👋 Flowkeep server stopped");
    Ok(())
}

/// Until a runtime subscribes, fired triggers are only logged
async fn log_fired_triggers(mut fired_rx: mpsc::UnboundedReceiver<TriggerFired>) {
    while let Some(fired) = fired_rx.recv().await {
        tracing::info!("🔔 Trigger fired for workflow {} at {}", fired.workflow_id, fired.fired_at);
    }
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
