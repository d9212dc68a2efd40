//! HTTP API: predictions, health, readiness, artifact reload and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    ArtifactStore, ErrorClass, PredictionService, PredictorError, RawRecord, ServiceMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub metrics: ServiceMetrics,
}

impl AppState {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            service: PredictionService::new(store),
            metrics: ServiceMetrics::new(),
        }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        self.service.store()
    }
}

/// Body of `POST /predict`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    pub age: i64,
    pub sex: String,
    pub bmi: f64,
    pub children: i64,
    pub smoker: String,
    pub region: String,
}

impl From<PredictRequest> for RawRecord {
    fn from(req: PredictRequest) -> Self {
        RawRecord::new(req.age, req.sex, req.bmi, req.children, req.smoker, req.region)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_charges: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_fingerprint: Option<String>,
    /// RFC 3339 time the served pair was read from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub model_version: String,
    pub schema_fingerprint: String,
}

/// Error returned to HTTP clients as `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        let status = match err.class() {
            ErrorClass::Client => StatusCode::BAD_REQUEST,
            ErrorClass::Data | ErrorClass::Deployment | ErrorClass::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Liveness: the process is up, regardless of artifacts
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness: 200 once a matched artifact pair can be served, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = Arc::clone(state.store());
    let loaded = tokio::task::spawn_blocking(move || store.get()).await;

    match loaded {
        Ok(Ok(artifacts)) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                model_version: Some(artifacts.model_version().to_string()),
                schema_fingerprint: Some(artifacts.artifact.schema_fingerprint.clone()),
                loaded_at: Some(artifacts.loaded_at.to_rfc3339()),
                reason: None,
            }),
        ),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                model_version: None,
                schema_fingerprint: None,
                loaded_at: None,
                reason: Some(e.to_string()),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                model_version: None,
                schema_fingerprint: None,
                loaded_at: None,
                reason: Some(format!("readiness check aborted: {e}")),
            }),
        ),
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload.inspect_err(|_| {
        state.metrics.inc_prediction_errors(ErrorClass::Client);
    })?;
    let record = RawRecord::from(request);

    // First use may read artifacts from disk
    let worker = Arc::clone(&state);
    let prediction = tokio::task::spawn_blocking(move || worker.service.predict(&record))
        .await
        .map_err(|e| ApiError::internal(format!("prediction task failed: {e}")))?
        .map_err(PredictorError::from)?;

    Ok(Json(PredictResponse {
        predicted_charges: prediction.predicted_charges,
    }))
}

/// Re-read both artifacts from disk and swap them in as one unit
async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    let store = Arc::clone(state.store());
    let loaded = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| ApiError::internal(format!("reload task failed: {e}")))?
        .map_err(|e| {
            // A failed reload is never the caller's fault
            error!(error = %e, "Artifact reload failed");
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(ReloadResponse {
        status: "reloaded".to_string(),
        model_version: loaded.model_version().to_string(),
        schema_fingerprint: loaded.artifact.schema_fingerprint.clone(),
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(format!("failed to encode metrics: {e}")))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/admin/reload", post(reload))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
