//! HTTP API for pricing, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pricing_lib::{
    health::{ComponentStatus, HealthRegistry},
    predictor::EngineStats,
    ErrorDescriptor, PredictionResult, PricingError, PricingMetrics, PricingPipeline,
    StructuredLogger, VehicleRecord,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Response headers summarizing a batch run
pub const PRICED_ROWS_HEADER: &str = "x-priced-rows";
pub const FAILED_ROWS_HEADER: &str = "x-failed-rows";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PricingPipeline>,
    pub health_registry: HealthRegistry,
    pub metrics: PricingMetrics,
    pub logger: StructuredLogger,
    pub started_at: i64,
}

impl AppState {
    pub fn new(
        pipeline: Arc<PricingPipeline>,
        health_registry: HealthRegistry,
        metrics: PricingMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            logger,
            started_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Description of the resolved model and serving counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub source: String,
    pub strategy: String,
    pub layout: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub feature_count: usize,
    pub stats: EngineStats,
    pub started_at: i64,
}

/// Error body for rejected batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRejection {
    pub error: ErrorDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // heuristic pricing still serves
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
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn status_for(err: &PricingError) -> StatusCode {
    match err {
        PricingError::Validation { .. } | PricingError::Encoding(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PricingError::Schema { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PricingError::Table(_) => StatusCode::BAD_REQUEST,
        PricingError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Price a single record
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VehicleRecord>, JsonRejection>,
) -> impl IntoResponse {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            // Bodies that are not a JSON object never reach the assembler
            let err = PricingError::validation("record", rejection.body_text());
            state.metrics.inc_prediction_errors(err.kind());
            return (rejection.status(), Json(PredictionResult::failed(&err)));
        }
    };

    let start = Instant::now();
    let outcome = state.pipeline.try_predict_one(&record);
    let elapsed = start.elapsed();
    state.metrics.observe_prediction_latency(elapsed.as_secs_f64());

    match outcome {
        Ok(price) => {
            let strategy = state.pipeline.strategy();
            state.metrics.inc_predictions(strategy.as_str());
            state
                .logger
                .log_prediction(price, strategy.as_str(), elapsed.as_micros() as u64);
            (StatusCode::OK, Json(PredictionResult::priced(price, strategy)))
        }
        Err(err) => {
            state.metrics.inc_prediction_errors(err.kind());
            if let PricingError::Inference(cause) = &err {
                error!(error = %cause, "Prediction failed");
            }
            (status_for(&err), Json(PredictionResult::failed(&err)))
        }
    }
}

/// Price every row of an uploaded CSV table
async fn predict_batch(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();
    let pipeline = state.pipeline.clone();
    let outcome = match tokio::task::spawn_blocking(move || pipeline.predict_batch(&body)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Batch worker panicked");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    state
        .metrics
        .observe_batch_latency(start.elapsed().as_secs_f64());

    match outcome {
        Ok((csv, report)) => {
            state.metrics.add_batch_rows(report.rows as u64);
            state.metrics.add_predictions(
                state.pipeline.strategy().as_str(),
                report.priced as u64,
            );
            for failure in &report.failures {
                state.metrics.inc_prediction_errors(&failure.kind);
            }
            state
                .logger
                .log_batch(report.rows, report.priced, report.failures.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE.as_str(), "text/csv; charset=utf-8".to_string()),
                    (PRICED_ROWS_HEADER, report.priced.to_string()),
                    (FAILED_ROWS_HEADER, report.failures.len().to_string()),
                ],
                csv,
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.inc_batch_failures();
            let missing_columns = match &err {
                PricingError::Schema { missing } => {
                    state.logger.log_batch_rejected(missing);
                    missing.clone()
                }
                _ => Vec::new(),
            };
            let body = BatchRejection {
                error: ErrorDescriptor::from_error(&err),
                missing_columns,
            };
            (status_for(&err), Json(body)).into_response()
        }
    }
}

/// Describe the resolved model
async fn model_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline = &state.pipeline;
    let model = pipeline.model();
    Json(ModelStatus {
        source: model.source().to_string(),
        strategy: pipeline.strategy().as_str().to_string(),
        layout: pipeline.layout().name().to_string(),
        version: model.version_label(),
        fingerprint: model.fingerprint().map(str::to_string),
        path: model.path().map(|p| p.display().to_string()),
        feature_count: pipeline.feature_names().len(),
        stats: pipeline.stats(),
        started_at: state.started_at,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, max_batch_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/predict/batch", post(predict_batch))
        .route("/api/v1/model", get(model_status))
        .layer(DefaultBodyLimit::max(max_batch_bytes))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, max_batch_bytes: usize, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state, max_batch_bytes);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
