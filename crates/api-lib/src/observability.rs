//! Observability infrastructure for the prediction API
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes per label, failures per kind, model state)
//! - Structured JSON logging with tracing

use crate::domain::{DomainEnum, ObesityLevel};
use crate::predictor::ModelFormat;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Histogram, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ApiMetricsInner> = OnceLock::new();

struct ApiMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions: IntCounterVec,
    prediction_errors: IntCounterVec,
    http_requests: IntCounterVec,
    model_loaded: IntGauge,
    model_info: IntGaugeVec,
}

impl ApiMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "obesity_api_prediction_latency_seconds",
                "Time spent encoding, classifying and formatting one prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter_vec!(
                "obesity_api_predictions_total",
                "Successful predictions by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "obesity_api_prediction_errors_total",
                "Failed prediction requests by failure kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            http_requests: register_int_counter_vec!(
                "obesity_api_http_requests_total",
                "HTTP requests by route and status code",
                &["method", "route", "status"]
            )
            .expect("Failed to register http_requests_total"),

            model_loaded: register_int_gauge!(
                "obesity_api_model_loaded",
                "1 when a classifier is loaded, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_int_gauge_vec!(
                "obesity_api_model_info",
                "Information about the loaded model artifact",
                &["format", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct ApiMetrics {
    _private: (),
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ApiMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ApiMetricsInner {
        GLOBAL_METRICS.get_or_init(ApiMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: ObesityLevel) {
        self.inner().predictions.with_label_values(&[label.as_str()]).inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_http_requests(&self, method: &str, route: &str, status: u16) {
        self.inner()
            .http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
    }

    /// Record which model, if any, is serving
    pub fn set_model(&self, model: Option<(ModelFormat, &str)>) {
        let inner = self.inner();
        inner.model_info.reset();
        match model {
            Some((format, checksum)) => {
                inner.model_loaded.set(1);
                inner
                    .model_info
                    .with_label_values(&[&format.to_string(), checksum])
                    .set(1);
            }
            None => inner.model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, addr: &str, model_loaded: bool) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            addr = %addr,
            model_loaded = model_loaded,
            "Obesity prediction API started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Obesity prediction API shutting down"
        );
    }

    pub fn log_model_loaded(&self, format: ModelFormat, path: &str, checksum: &str) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            format = %format,
            path = %path,
            checksum = %checksum,
            "Classifier ready"
        );
    }

    pub fn log_model_unavailable(&self, model_dir: &str) {
        warn!(
            event = "model_unavailable",
            instance = %self.instance,
            model_dir = %model_dir,
            "No classifier loaded, /predict will answer 503"
        );
    }

    pub fn log_prediction(&self, prediction: ObesityLevel, confidence: f64, bmi: f64, latency_ms: f64) {
        info!(
            event = "prediction",
            instance = %self.instance,
            prediction = %prediction,
            confidence = confidence,
            bmi = bmi,
            latency_ms = latency_ms,
            "Prediction served"
        );
    }

    pub fn log_unauthorized(&self, path: &str, reason: &str) {
        warn!(
            event = "unauthorized",
            instance = %self.instance,
            path = %path,
            reason = %reason,
            "Request rejected by API key check"
        );
    }

    /// Client errors (bad body, failed validation) are logged at warn, the rest at error
    pub fn log_prediction_failure(&self, kind: &str, message: &str) {
        if matches!(kind, "validation" | "invalid_json") {
            warn!(
                event = "prediction_rejected",
                instance = %self.instance,
                kind = %kind,
                message = %message,
                "Prediction request rejected"
            );
        } else {
            error!(
                event = "prediction_failed",
                instance = %self.instance,
                kind = %kind,
                message = %message,
                "Prediction failed"
            );
        }
    }
}
