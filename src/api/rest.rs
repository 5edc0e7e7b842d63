// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   /indicators/...  stateless batch and caller-owned progressive calls
//   /series/...      live path backed by the in-memory series store
//   /config          read or replace the live-path indicator settings
//                    (enabled list and per-indicator options, validated and
//                    saved); there are no start/stop or order endpoints
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::{AppState, ErrorRecord};
use crate::engine::{self, IndicatorInfo, IndicatorKind, ProgressiveResult, ProgressiveState};
use crate::error::EngineError;
use crate::indicators::Values;
use crate::market_data::{Bar, SeriesKey, SeriesSnapshot};
use crate::runtime_config::{EngineConfig, IndicatorConfigs};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        // ── Stateless / caller-owned state ──────────────────────────
        .route("/api/v1/indicators", get(list_indicators))
        .route("/api/v1/indicators/:name/calculate", post(calculate))
        .route("/api/v1/indicators/:name/progressive", post(progressive))
        // ── Live series ─────────────────────────────────────────────
        .route("/api/v1/series/:symbol/:interval/bars", post(push_bars))
        .route("/api/v1/series/:symbol/:interval", get(series_snapshot))
        // ── Engine config ───────────────────────────────────────────
        .route("/api/v1/config", get(get_config).post(set_config))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_code(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidConfig { .. } => "invalid_config",
        EngineError::OutOfOrderInput { .. } => "out_of_order_input",
        EngineError::UnknownIndicator(_) => "unknown_indicator",
        EngineError::StateMismatch(_) => "state_mismatch",
        EngineError::Serialization { .. } => "serialization",
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::InvalidConfig { .. }
            | EngineError::StateMismatch(_)
            | EngineError::Serialization { .. } => StatusCode::BAD_REQUEST,
            EngineError::UnknownIndicator(_) => StatusCode::NOT_FOUND,
            EngineError::OutOfOrderInput { .. } => StatusCode::CONFLICT,
        };
        let body = ErrorBody {
            error: error_code(&self),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handler error: engine failures plus the few the HTTP layer adds itself.
enum ApiError {
    Engine(EngineError),
    SeriesNotFound(SeriesKey),
    Config(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Engine(err) => err.into_response(),
            ApiError::SeriesNotFound(key) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "unknown_series",
                    message: format!("No bars received for {key}"),
                }),
            )
                .into_response(),
            ApiError::Config(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "invalid_config",
                    message,
                }),
            )
                .into_response(),
        }
    }
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    series: usize,
    recent_errors: Vec<ErrorRecord>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        series: state.series_store.len(),
        recent_errors: state.recent_errors(),
    };
    Json(resp)
}

// =============================================================================
// Indicator catalogue
// =============================================================================

async fn list_indicators() -> Json<Vec<IndicatorInfo>> {
    Json(engine::describe())
}

// =============================================================================
// Batch & progressive calculation
// =============================================================================

#[derive(Deserialize)]
struct CalculateRequest {
    bars: Vec<Bar>,
    #[serde(default)]
    config: Value,
}

#[derive(Serialize)]
struct CalculateResponse {
    indicator: IndicatorKind,
    values: Values,
}

async fn calculate(
    Path(name): Path<String>,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let kind: IndicatorKind = name.parse()?;
    let values = engine::calculate(kind, &req.bars, &req.config)?;
    Ok(Json(CalculateResponse {
        indicator: kind,
        values,
    }))
}

#[derive(Deserialize)]
struct ProgressiveRequest {
    bars: Vec<Bar>,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    state: Option<ProgressiveState>,
}

async fn progressive(
    Path(name): Path<String>,
    Json(req): Json<ProgressiveRequest>,
) -> Result<Json<ProgressiveResult>, ApiError> {
    let kind: IndicatorKind = name.parse()?;
    let result = engine::calculate_progressive(kind, &req.bars, &req.config, req.state)?;
    Ok(Json(result))
}

// =============================================================================
// Live series
// =============================================================================

#[derive(Deserialize)]
struct PushBarsRequest {
    bars: Vec<Bar>,
}

async fn push_bars(
    State(state): State<Arc<AppState>>,
    Path((symbol, interval)): Path<(String, String)>,
    Json(req): Json<PushBarsRequest>,
) -> Result<Json<SeriesSnapshot>, ApiError> {
    let key = SeriesKey::new(symbol, interval);
    let enabled = state
        .engine_config
        .read()
        .enabled_configs()
        .map_err(|e| ApiError::Config(e.to_string()))?;

    match state.series_store.push_bars(&key, req.bars, &enabled) {
        Ok(snapshot) => {
            state.increment_version();
            Ok(Json(snapshot))
        }
        Err(err) => {
            warn!(series = %key, error = %err, "bar push rejected");
            state.push_error(format!("{key}: {err}"), Some(error_code(&err).to_string()));
            Err(err.into())
        }
    }
}

async fn series_snapshot(
    State(state): State<Arc<AppState>>,
    Path((symbol, interval)): Path<(String, String)>,
) -> Result<Json<SeriesSnapshot>, ApiError> {
    let key = SeriesKey::new(symbol, interval);
    state
        .series_store
        .snapshot(&key)
        .map(Json)
        .ok_or(ApiError::SeriesNotFound(key))
}

// =============================================================================
// Engine config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> Json<EngineConfig> {
    Json(state.engine_config.read().clone())
}

#[derive(Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    enabled_indicators: Option<Vec<IndicatorKind>>,
    #[serde(default)]
    indicators: Option<IndicatorConfigs>,
}

async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<EngineConfig>, ApiError> {
    let mut candidate = state.engine_config.read().clone();
    if let Some(enabled) = update.enabled_indicators {
        candidate.enabled_indicators = enabled;
    }
    if let Some(indicators) = update.indicators {
        candidate.indicators = indicators;
    }
    candidate
        .validate()
        .map_err(|e| ApiError::Config(e.to_string()))?;

    *state.engine_config.write() = candidate.clone();
    info!(enabled = ?candidate.enabled_indicators, "engine config updated");

    // Save to disk (best-effort).
    if let Err(e) = candidate.save(&state.config_path) {
        warn!(error = %e, "Failed to save engine config to disk");
    }
    state.increment_version();
    Ok(Json(candidate))
}
