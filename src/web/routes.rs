//! REST API routes

use super::AppState;
use crate::config::RuleSet;
use crate::engine::{AnalyticsReport, DiffReport, EngineStats};
use crate::error::{DiffError, EngineError, Side};
use crate::{ClassifiedChange, DiffEngine, DiffSubject};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Errors
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

/// Errors surfaced by the API
pub enum ApiError {
    /// A snapshot payload did not parse
    BadPayload(DiffError),
    /// The rules file could not be loaded; the old rules stay active
    ReloadFailed(EngineError),
    /// A diff worker panicked or was cancelled
    Worker(tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadPayload(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    side: Some(e.side()),
                    error: e.to_string(),
                },
            ),
            ApiError::ReloadFailed(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: e.to_string(),
                    side: None,
                },
            ),
            ApiError::Worker(e) => {
                error!(error = %e, "diff worker failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "diff worker failed".to_string(),
                        side: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Status & Stats
// ============================================================================

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub rules_source: String,
    pub rules_digest: String,
    pub rules_loaded_at: String,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds()
        .max(0) as u64;
    let active = state.engine.active();

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        rules_source: active.source.to_string(),
        rules_digest: active.digest.clone(),
        rules_loaded_at: active.loaded_at.to_rfc3339(),
    })
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<EngineStats> {
    Json(state.engine.stats())
}

// ============================================================================
// Rules
// ============================================================================

pub async fn get_rules(State(state): State<Arc<AppState>>) -> Json<RuleSet> {
    Json(state.engine.rule_set())
}

#[derive(Serialize, Deserialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub rules_source: String,
    pub rules_digest: String,
    pub loaded_at: String,
}

/// Reload from the configured rules file only; the path is never taken
/// from the request
pub async fn reload_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    if let Err(e) = state.engine.reload(state.rules_path.as_deref()) {
        warn!(error = %e, "rules reload rejected");
        return Err(ApiError::ReloadFailed(e));
    }

    let active = state.engine.active();
    info!(digest = %active.digest, "rules reloaded via API");
    Ok(Json(ReloadResponse {
        reloaded: true,
        rules_source: active.source.to_string(),
        rules_digest: active.digest.clone(),
        loaded_at: active.loaded_at.to_rfc3339(),
    }))
}

// ============================================================================
// Diff & Analytics
// ============================================================================

/// Two raw JSON snapshots and their identifiers
#[derive(Debug, Deserialize, Serialize)]
pub struct DiffRequest {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub previous_id: String,
    #[serde(default)]
    pub current_id: String,
    /// Previous snapshot as a JSON document string
    pub previous: String,
    /// Current snapshot as a JSON document string
    pub current: String,
    /// Drop changes that are not significant from the response
    #[serde(default)]
    pub significant_only: bool,
}

impl DiffRequest {
    fn run(&self, engine: &DiffEngine) -> Result<DiffReport, ApiError> {
        let subject = DiffSubject::new(&self.entity_id, &self.previous_id, &self.current_id);
        engine
            .compute_diff(subject, self.previous.as_bytes(), self.current.as_bytes())
            .map_err(ApiError::BadPayload)
    }

    /// Diff, classify and post-process on the blocking pool
    async fn run_blocking<T, F>(self, state: Arc<AppState>, finish: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&DiffEngine, DiffReport, bool) -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(move || -> Result<T, ApiError> {
            let report = self.run(&state.engine)?;
            Ok(finish(&state.engine, report, self.significant_only))
        })
        .await
        .map_err(ApiError::Worker)?
    }
}

pub async fn compute_diff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiffRequest>,
) -> Result<Json<DiffReport>, ApiError> {
    let report = req
        .run_blocking(state, |_, mut report, significant_only| {
            if significant_only {
                report.changes.retain(|c| c.significant);
            }
            report
        })
        .await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub analytics: AnalyticsReport,
}

pub async fn compute_analytics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiffRequest>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let response = req
        .run_blocking(state, |engine, report, significant_only| {
            let changes: Vec<ClassifiedChange> = if significant_only {
                report.significant().into_iter().cloned().collect()
            } else {
                report.changes
            };
            AnalyticsResponse {
                run_id: report.run_id,
                analytics: engine.analyze(&changes),
            }
        })
        .await?;
    Ok(Json(response))
}
