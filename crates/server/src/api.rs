//! HTTP API for predictions, history and health

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use pcos_core::{
    health::{Component, ComponentStatus, HealthRegistry},
    history::{HistoryLog, HISTORY_FILE_NAME, HISTORY_MIME},
    observability::PcosMetrics,
    FeatureCatalog, FieldError, PcosError, PredictOutcome, PredictionPipeline, PredictionReport,
    RawForm, Session,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinError;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Warning shown when the form is incomplete
pub const INCOMPLETE_MESSAGE: &str = "Harap isi semua data sebelum melakukan prediksi.";

/// Message shown when no history file exists yet
pub const NO_HISTORY_MESSAGE: &str = "Belum ada riwayat prediksi yang tersimpan.";

/// Idle time after which a session is dropped
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Open sessions kept before the least recently used one is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

type SessionMap = HashMap<Uuid, Arc<Mutex<Session>>>;

/// Shared application state
pub struct AppState {
    pub pipeline: PredictionPipeline,
    pub health_registry: HealthRegistry,
    pub metrics: PcosMetrics,
    sessions: RwLock<SessionMap>,
    session_ttl: Duration,
    max_sessions: usize,
    /// Serializes history appends within this process
    history_writer: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: PredictionPipeline, health_registry: HealthRegistry, metrics: PcosMetrics) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            sessions: RwLock::new(HashMap::new()),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
            max_sessions: DEFAULT_MAX_SESSIONS,
            history_writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_session_limits(mut self, ttl: std::time::Duration, max_sessions: usize) -> Self {
        self.session_ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::weeks(52 * 100));
        self.max_sessions = max_sessions.max(1);
        self
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, ApiError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("session {} not found", id)))
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL; returns how many were dropped
    pub async fn expire_idle_sessions(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired = self.expire_locked(&mut sessions, now);
        self.metrics.set_active_sessions(sessions.len() as i64);
        expired
    }

    fn expire_locked(&self, sessions: &mut SessionMap, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        // A locked session is in use and therefore not idle
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => !session.is_idle(now, self.session_ttl),
            Err(_) => true,
        });

        let expired = before - sessions.len();
        if expired > 0 {
            info!(expired = expired, active = sessions.len(), "Expired idle sessions");
        }
        expired
    }

    async fn insert_session(&self, session: Session) {
        let session_id = session.id();
        let mut sessions = self.sessions.write().await;
        self.expire_locked(&mut sessions, Utc::now());

        while sessions.len() >= self.max_sessions {
            match evict_least_recent(&mut sessions) {
                Some(evicted) => warn!(session_id = %evicted, "Session limit reached, evicted least recent session"),
                None => break,
            }
        }

        sessions.insert(session_id, Arc::new(Mutex::new(session)));
        self.metrics.set_active_sessions(sessions.len() as i64);
    }
}

fn evict_least_recent(sessions: &mut SessionMap) -> Option<Uuid> {
    let (_, oldest) = sessions
        .iter()
        .filter_map(|(id, session)| {
            session
                .try_lock()
                .ok()
                .map(|session| (session.touched_at(), *id))
        })
        .min()?;
    sessions.remove(&oldest);
    Some(oldest)
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    code: &'static str,
}

impl ApiError {
    fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
            code: "not_found",
        }
    }

    fn blocking_task(err: JoinError) -> Self {
        error!(error = %err, "Blocking task failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.to_string(),
            code: "internal",
        }
    }
}

impl From<PcosError> for ApiError {
    fn from(err: PcosError) -> Self {
        let (status, code) = match &err {
            e if e.is_user_error() => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            PcosError::HistorySchemaMismatch { .. } => (StatusCode::CONFLICT, "history_schema_mismatch"),
            PcosError::PredictionFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "prediction_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() || status == StatusCode::CONFLICT {
            error!(error = %err, code = code, "Request failed");
        }
        Self {
            status,
            error: err.to_string(),
            code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.error,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    /// Edited fields, keyed by feature name
    #[serde(default)]
    pub inputs: RawForm,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InputEcho {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub status: String,
    pub label: String,
    pub probability_positive: f64,
    pub probability_negative: f64,
    /// Probability of the predicted class
    pub probability: f64,
    /// `[Tidak PCOS, PCOS]`, for the probability chart
    pub distribution: [f64; 2],
    pub headline: String,
    pub probability_text: String,
    pub recommendation: String,
    pub disclaimer: String,
    pub inputs: Vec<InputEcho>,
    pub model_version: String,
}

impl PredictResponse {
    fn new(report: PredictionReport, model_version: &str) -> Self {
        Self {
            status: "predicted".to_string(),
            label: report.prediction.label.to_string(),
            probability_positive: report.prediction.probability_positive,
            probability_negative: report.prediction.probability_negative,
            probability: report.prediction.confidence(),
            distribution: report.prediction.distribution(),
            headline: report.advice.headline,
            probability_text: report.advice.probability_text,
            recommendation: report.advice.recommendation,
            disclaimer: report.advice.disclaimer,
            inputs: report
                .record
                .features
                .into_iter()
                .map(|(name, value)| InputEcho { name, value })
                .collect(),
            model_version: model_version.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldErrorView {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldErrorView {
    fn from(err: &FieldError) -> Self {
        Self {
            field: err.field().to_string(),
            message: err.message(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncompleteResponse {
    pub status: String,
    pub message: String,
    pub missing: Vec<String>,
    pub field_errors: Vec<FieldErrorView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// Feature catalog for building the form
async fn features(State(state): State<Arc<AppState>>) -> Json<FeatureCatalog> {
    Json(state.pipeline.catalog().clone())
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = Session::new();
    let session_id = session.id();

    state.insert_session(session).await;
    info!(session_id = %session_id, "Session started");

    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    session.touch();
    Ok(Json(session.clone()))
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    if sessions.remove(&id).is_none() {
        return Err(ApiError::not_found(format!("session {} not found", id)));
    }
    state.metrics.set_active_sessions(sessions.len() as i64);
    info!(session_id = %id, "Session ended");
    Ok(StatusCode::NO_CONTENT)
}

/// Predict button: 200 with the result, 422 when the form is incomplete
async fn predict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PredictRequest>,
) -> Result<Response, ApiError> {
    let session = state.session(id).await?.lock_owned().await;
    let writer = state.history_writer.clone().lock_owned().await;

    // Inference and the history append block, keep them off the runtime
    let worker = Arc::clone(&state);
    let submitted = tokio::task::spawn_blocking(move || {
        let _writer = writer;
        let mut session = session;
        session.touch();
        worker.pipeline.submit(&mut session, request.inputs)
    })
    .await
    .map_err(ApiError::blocking_task)?;

    let outcome = match submitted {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_history_error() {
                state
                    .health_registry
                    .set_unhealthy(Component::HistoryStore, e.to_string())
                    .await;
            }
            return Err(e.into());
        }
    };

    match outcome {
        PredictOutcome::Predicted(report) => {
            state.health_registry.set_healthy(Component::HistoryStore).await;
            let body = PredictResponse::new(report, state.pipeline.model_version());
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        PredictOutcome::Incomplete {
            missing,
            field_errors,
        } => {
            let body = IncompleteResponse {
                status: "incomplete".to_string(),
                message: INCOMPLETE_MESSAGE.to_string(),
                missing,
                field_errors: field_errors.iter().map(FieldErrorView::from).collect(),
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response())
        }
    }
}

/// Reset button: clears the form, keeps the session's predictions
async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    session.touch();
    session.reset();
    Ok(Json(session.clone()))
}

/// Durable history, re-read from disk on every call
async fn history(State(state): State<Arc<AppState>>) -> Result<Json<HistoryLog>, ApiError> {
    let store = state.pipeline.store().clone();
    let log = tokio::task::spawn_blocking(move || store.load_all())
        .await
        .map_err(ApiError::blocking_task)??;
    Ok(Json(log))
}

/// Raw history file as a CSV download
async fn export_history(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let store = state.pipeline.store().clone();
    let exported = tokio::task::spawn_blocking(move || store.export())
        .await
        .map_err(ApiError::blocking_task)??;

    match exported {
        Some(bytes) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HISTORY_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", HISTORY_FILE_NAME),
                ),
            ],
            bytes,
        )
            .into_response()),
        None => Err(ApiError::not_found(NO_HISTORY_MESSAGE)),
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/features", get(features))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/:id", get(get_session).delete(end_session))
        .route("/api/v1/sessions/:id/predict", post(predict))
        .route("/api/v1/sessions/:id/reset", post(reset))
        .route("/api/v1/history", get(history))
        .route("/api/v1/history/export", get(export_history))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Periodically drop idle sessions
pub async fn expire_sessions_loop(state: Arc<AppState>, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        state.expire_idle_sessions(Utc::now()).await;
    }
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
