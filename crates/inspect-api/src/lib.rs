//! Inspection API: HTTP and websocket surface over the agents and the report store
pub mod audio;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use inspect_agents::GeminiClient;
use inspect_out::ReportExporter;
use inspect_store::{ReportService, SqliteStore};

pub use config::Config;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/review", post(handlers::review))
        .route("/sessions/:user_id/:session_id", delete(handlers::delete_session))
        .route("/reports", post(handlers::save_report))
        .route("/reports/:serial", get(handlers::history))
        .route("/reports/:serial/:timestamp", patch(handlers::update_report))
        .route("/reports/:serial/latest/export", get(handlers::export_latest))
        .route("/upload-frame", post(handlers::upload_frame))
        .route("/ws/stt", get(websocket::stt))
        .route("/ws/inspect", get(websocket::inspect))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::trace())
        .layer(middleware::cors())
        .with_state(state)
}

/// Open the store, the model client and the exporter described by `config`.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("opening report database {}", config.db_path))?;
    let reports = ReportService::new(Arc::new(store));

    let api_key = config
        .api_key
        .clone()
        .context("GEMINI_API_KEY (or GOOGLE_API_KEY) must be set")?;
    let llm = GeminiClient::new(api_key, config.model.clone())?;
    tracing::info!(model = llm.model(), "Using Gemini model");

    let exporter = ReportExporter::from_path(config.templates_path.as_deref())
        .context("loading export templates")?;
    let metrics = metrics::Metrics::new()?;

    Ok(AppState::new(
        reports,
        Arc::new(llm),
        exporter,
        metrics,
        config.upload_dir.clone(),
    ))
}

/// How often idle agent sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn spawn_session_sweeper(state: AppState, max_idle: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            state.evict_idle_sessions(max_idle).await;
        }
    });
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    spawn_session_sweeper(state.clone(), Duration::from_secs(config.session_idle_secs));
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    tracing::info!(addr = %config.addr, "Inspection API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
