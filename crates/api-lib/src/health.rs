//! Health and readiness reporting
//!
//! The model state never changes after startup, so both reports are pure
//! functions of it. A process without a model is alive but degraded and
//! never ready.

use crate::predictor::{ModelFormat, ModelState};
use serde::{Deserialize, Serialize};

/// Health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// A model is loaded and predictions are served
    Healthy,
    /// The process runs but cannot predict
    Degraded,
}

impl ComponentStatus {
    pub fn from_state(state: &ModelState) -> Self {
        if state.is_loaded() {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Degraded
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub model_loaded: bool,
    pub model_format: Option<ModelFormat>,
    pub version: &'static str,
    /// RFC 3339 timestamp of this check
    pub checked_at: String,
}

impl HealthResponse {
    pub fn from_state(state: &ModelState, version: &'static str) -> Self {
        Self {
            status: ComponentStatus::from_state(state),
            model_loaded: state.is_loaded(),
            model_format: state.model().map(|m| m.format()),
            version,
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body of `GET /readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn from_state(state: &ModelState) -> Self {
        if state.is_loaded() {
            Self {
                ready: true,
                reason: None,
            }
        } else {
            Self {
                ready: false,
                reason: Some("Model not loaded".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::predictor::{Classifier, LoadedModel};
    use std::sync::Arc;

    struct Uniform;

    impl Classifier for Uniform {
        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f64>> {
            Ok(vec![1.0 / 7.0; 7])
        }

        fn format(&self) -> ModelFormat {
            ModelFormat::XgboostJson
        }
    }

    fn loaded() -> ModelState {
        ModelState::Loaded(LoadedModel::new(Arc::new(Uniform), "model.json", "ab"))
    }

    #[test]
    fn test_unloaded_is_degraded() {
        let health = HealthResponse::from_state(&ModelState::Unloaded, "1.0.0");
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(!health.model_loaded);
        assert_eq!(health.model_format, None);

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["version"], "1.0.0");
        assert!(json["model_format"].is_null());
    }

    #[test]
    fn test_loaded_is_healthy() {
        let health = HealthResponse::from_state(&loaded(), "1.0.0");
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.model_loaded);

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_format"], "xgboost_json");
        assert!(chrono::DateTime::parse_from_rfc3339(health.checked_at.as_str()).is_ok());
    }

    #[test]
    fn test_readiness() {
        let readiness = ReadinessResponse::from_state(&ModelState::Unloaded);
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        let readiness = ReadinessResponse::from_state(&loaded());
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }
}
