//! HTTP API for the diff engine
//!
//! Thin JSON adapter over [`DiffEngine`]: diff, analytics, reload and
//! inspection endpoints.

pub mod routes;

use crate::DiffEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the web server
pub struct AppState {
    pub engine: Arc<DiffEngine>,
    /// Rules file used by `/api/reload`
    pub rules_path: Option<PathBuf>,
    /// Server start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(engine: Arc<DiffEngine>, rules_path: Option<PathBuf>) -> Self {
        Self {
            engine,
            rules_path,
            started_at: chrono::Utc::now(),
        }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>, cors: bool) -> Router {
    let app = Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/stats", get(routes::get_stats))
        .route("/api/rules", get(routes::get_rules))
        .route("/api/reload", post(routes::reload_rules))
        .route("/api/diff", post(routes::compute_diff))
        .route("/api/analytics", post(routes::compute_analytics))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    }
}

/// Start the web server
pub async fn start_server(listen: &str, state: Arc<AppState>, cors: bool) -> anyhow::Result<()> {
    let app = router(state, cors);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(address = %listen, "web server starting");

    axum::serve(listener, app).await?;

    Ok(())
}
