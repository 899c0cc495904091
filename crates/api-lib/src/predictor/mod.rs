//! ML prediction engine

mod features;
mod inference;
mod loader;
mod output;
mod service;
mod xgboost;

pub use features::{bmi_category, calculate_bmi, CategoryCode, FeatureEncoder, FeatureSchema};
pub use inference::OnnxClassifier;
pub use loader::{
    compute_checksum, load_artifact, load_model, LoadedModel, ModelPaths, ModelState,
    DEFAULT_FALLBACK_MODEL_FILE, DEFAULT_MODEL_FILE,
};
pub use output::{OutputConfig, OutputFormatter, PROBABILITY_SUM_TOLERANCE};
pub use service::PredictionService;
pub use xgboost::XgbClassifier;

use crate::models::FeatureVector;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

/// On-disk format of a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// XGBoost JSON tree dump, evaluated natively
    XgboostJson,
    /// ONNX graph run through tract
    Onnx,
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFormat::XgboostJson => f.write_str("xgboost_json"),
            ModelFormat::Onnx => f.write_str("onnx"),
        }
    }
}

/// Trait for classifier backends.
///
/// Implementations hold no mutable state, so one instance is shared by
/// every request.
pub trait Classifier: Send + Sync {
    /// Class probabilities for one row, indexed by class code
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>>;

    /// Winning class code for one row
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        let probabilities = self.predict_proba(features)?;
        argmax(&probabilities).context("Model returned no class probabilities")
    }

    /// Class code and probabilities together. Backends that produce both
    /// from one evaluation override this.
    fn classify(&self, features: &FeatureVector) -> Result<(i64, Vec<f64>)> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }

    fn format(&self) -> ModelFormat;
}

/// Index of the largest value, first index wins ties
pub fn argmax(values: &[f64]) -> Option<i64> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i as i64)
}
