//! HTTP API for predictions, static metadata, health checks and metrics

use crate::middleware::{api_key_middleware, cors_middleware, track_requests, CorsPolicy};
use api_lib::{
    observability::{ApiMetrics, StructuredLogger},
    FeaturesResponse, HealthResponse, LabelsResponse, PredictionError, PredictionResult,
    PredictionService, ReadinessResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

pub const SERVICE_NAME: &str = "Obesity Level Prediction API";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub metrics: ApiMetrics,
    pub logger: StructuredLogger,
    pub api_key: Option<String>,
    pub cors: CorsPolicy,
}

impl AppState {
    pub fn new(service: PredictionService, logger: StructuredLogger) -> Self {
        Self {
            service,
            metrics: ApiMetrics::new(),
            logger,
            api_key: None,
            cors: CorsPolicy::new(vec!["*".to_string()]),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsPolicy::new(origins);
        self
    }
}

/// Every failure the HTTP layer reports
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("API key required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey => StatusCode::UNAUTHORIZED,
            ApiError::InvalidApiKey => StatusCode::FORBIDDEN,
            ApiError::Prediction(e) => match e {
                PredictionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PredictionError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                PredictionError::CorruptPrediction { .. } | PredictionError::InferenceFailure(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::MissingApiKey => "MISSING_API_KEY",
            ApiError::InvalidApiKey => "INVALID_API_KEY",
            ApiError::Prediction(e) => match e {
                PredictionError::Validation(_) => "VALIDATION_ERROR",
                PredictionError::ServiceUnavailable => "MODEL_NOT_LOADED",
                PredictionError::CorruptPrediction { .. } => "INTERNAL_ERROR",
                PredictionError::InferenceFailure(_) => "PREDICTION_FAILED",
            },
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Prediction(PredictionError::Validation(_)) => "Input validation error".to_string(),
            ApiError::Prediction(PredictionError::ServiceUnavailable) => {
                "Model is not loaded. Please check if model file exists.".to_string()
            }
            // internal invariant violations are not described to clients
            ApiError::Prediction(PredictionError::CorruptPrediction { .. }) => {
                "Internal server error".to_string()
            }
            ApiError::Prediction(PredictionError::InferenceFailure(message)) => {
                format!("Prediction failed: {}", message)
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "detail": self.detail(),
            "error_code": self.error_code(),
        });
        if let ApiError::Prediction(PredictionError::Validation(errors)) = &self {
            body["errors"] = json!(errors);
        }
        (self.status(), Json(body)).into_response()
    }
}

/// Service banner
async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to {}", SERVICE_NAME),
        "version": API_VERSION,
        "health": "/health",
        "predict": "/predict",
        "labels": "/labels",
        "features": "/features",
        "metrics": "/metrics",
    }))
}

/// Always 200; `status` says whether predictions are possible
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(state.service.state(), API_VERSION))
}

/// Readiness check response - returns 200 if a model is loaded, 503 if not
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = ReadinessResponse::from_state(state.service.state());

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(record) = payload.map_err(|e| {
        let message = e.body_text();
        state.metrics.inc_prediction_errors("invalid_json");
        state.logger.log_prediction_failure("invalid_json", &message);
        ApiError::InvalidJson(message)
    })?;

    let start = Instant::now();
    match state.service.predict_value(&record) {
        Ok(result) => {
            let elapsed = start.elapsed().as_secs_f64();
            state.metrics.observe_prediction_latency(elapsed);
            state.metrics.inc_predictions(result.prediction);
            state
                .logger
                .log_prediction(result.prediction, result.confidence, result.bmi, elapsed * 1000.0);
            Ok(Json(result))
        }
        Err(e) => {
            state.metrics.inc_prediction_errors(e.kind());
            state.logger.log_prediction_failure(e.kind(), &e.to_string());
            Err(e.into())
        }
    }
}

async fn labels() -> Json<LabelsResponse> {
    Json(LabelsResponse::new())
}

async fn features() -> Json<FeaturesResponse> {
    Json(FeaturesResponse::new())
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
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/predict", post(predict))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_middleware));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/labels", get(labels))
        .route("/features", get(features))
        .route("/metrics", get(metrics))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
        .with_state(state)
}

/// Start the API server and run until ctrl-c
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
