//! Prediction orchestration
//!
//! Ties the encoder, the loaded classifier and the output formatter into a
//! single `predict` call. The service holds no mutable state and is shared
//! across requests behind an `Arc`.

use super::features::{bmi_category, calculate_bmi, FeatureEncoder};
use super::loader::ModelState;
use super::output::OutputFormatter;
use super::{argmax, ModelFormat};
use crate::domain::ObesityLevel;
use crate::error::PredictionError;
use crate::input::PredictionInput;
use crate::models::PredictionResult;
use serde_json::Value;
use tracing::{debug, error, warn};

pub struct PredictionService {
    state: ModelState,
    encoder: FeatureEncoder,
    formatter: OutputFormatter,
}

impl PredictionService {
    pub fn new(state: ModelState) -> Self {
        Self::with_formatter(state, OutputFormatter::new())
    }

    pub fn with_formatter(state: ModelState, formatter: OutputFormatter) -> Self {
        Self {
            state,
            encoder: FeatureEncoder::new(),
            formatter,
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub fn model_format(&self) -> Option<ModelFormat> {
        self.state.model().map(|m| m.format())
    }

    /// Validate a raw JSON record and predict on it
    pub fn predict_value(&self, record: &Value) -> Result<PredictionResult, PredictionError> {
        let input = PredictionInput::try_from(record)?;
        self.predict(&input)
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, PredictionError> {
        let model = self.state.model().ok_or(PredictionError::ServiceUnavailable)?;

        let bmi = calculate_bmi(input.height(), input.weight());
        let category = bmi_category(bmi);

        let features = self.encoder.encode(input);
        let classifier = model.classifier();
        let (code, raw) = classifier
            .classify(&features)
            .map_err(|e| PredictionError::InferenceFailure(format!("{:#}", e)))?;

        let prediction = match ObesityLevel::from_code(code) {
            Some(level) => level,
            None => {
                error!(code = code, format = %model.format(), "Classifier produced a class code with no label");
                return Err(PredictionError::CorruptPrediction { code });
            }
        };

        let probabilities = self
            .formatter
            .probabilities(&raw)
            .map_err(PredictionError::InferenceFailure)?;

        if argmax(&raw) != Some(code) {
            warn!(
                code = code,
                argmax = ?argmax(&raw),
                "Predicted class differs from the most probable class"
            );
        }

        let result = PredictionResult {
            prediction,
            prediction_code: prediction.code(),
            probabilities,
            confidence: self.formatter.confidence(&raw),
            bmi: self.formatter.bmi(bmi),
            bmi_category: category,
        };
        debug!(prediction = %result.prediction, confidence = result.confidence, "Prediction complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BmiCategory, NUM_CLASSES};
    use crate::input::tests::{sample_input, sample_record};
    use crate::models::FeatureVector;
    use crate::predictor::loader::LoadedModel;
    use crate::predictor::xgboost::tests::weight_model;
    use crate::predictor::{Classifier, XgbClassifier, PROBABILITY_SUM_TOLERANCE};
    use anyhow::bail;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedClassifier {
        code: i64,
        probabilities: Vec<f64>,
    }

    impl Classifier for FixedClassifier {
        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f64>> {
            Ok(self.probabilities.clone())
        }

        fn predict(&self, _features: &FeatureVector) -> anyhow::Result<i64> {
            Ok(self.code)
        }

        fn format(&self) -> ModelFormat {
            ModelFormat::XgboostJson
        }
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f64>> {
            bail!("input has 15 columns, expected 16")
        }

        fn format(&self) -> ModelFormat {
            ModelFormat::Onnx
        }
    }

    /// Answers only through the combined call and counts evaluations
    struct SinglePass {
        evaluations: Arc<AtomicUsize>,
    }

    impl Classifier for SinglePass {
        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f64>> {
            bail!("separate probability pass")
        }

        fn classify(&self, _features: &FeatureVector) -> anyhow::Result<(i64, Vec<f64>)> {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            Ok((1, NORMAL.to_vec()))
        }

        fn format(&self) -> ModelFormat {
            ModelFormat::Onnx
        }
    }

    fn service_with(classifier: impl Classifier + 'static) -> PredictionService {
        let model = LoadedModel::new(Arc::new(classifier), "memory", "0".repeat(64));
        PredictionService::new(ModelState::Loaded(model))
    }

    fn fixed(code: i64, probabilities: &[f64]) -> PredictionService {
        service_with(FixedClassifier {
            code,
            probabilities: probabilities.to_vec(),
        })
    }

    fn tree_service() -> PredictionService {
        let model = XgbClassifier::from_slice(weight_model().to_string().as_bytes()).unwrap();
        service_with(model)
    }

    const NORMAL: [f64; NUM_CLASSES] = [0.05, 0.812_36, 0.05, 0.03, 0.03, 0.017_64, 0.01];

    #[test]
    fn test_model_evaluated_once_per_request() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let service = service_with(SinglePass {
            evaluations: evaluations.clone(),
        });

        let result = service.predict(&sample_input()).unwrap();
        assert_eq!(result.prediction, ObesityLevel::NormalWeight);
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reference_input() {
        let result = tree_service().predict(&sample_input()).unwrap();
        assert_eq!(result.prediction, ObesityLevel::NormalWeight);
        assert_eq!(result.prediction_code, 1);
        assert_eq!(result.bmi, 24.49);
        assert_eq!(result.bmi_category, BmiCategory::Normal);
    }

    #[test]
    fn test_heavy_input() {
        let mut record = sample_record();
        record["Weight"] = json!(100);
        let result = tree_service().predict_value(&record).unwrap();
        assert_eq!(result.prediction, ObesityLevel::ObesityTypeI);
        assert_eq!(result.bmi, 32.65);
        assert_eq!(result.bmi_category, BmiCategory::Obese);
    }

    #[test]
    fn test_probability_properties() {
        let result = tree_service().predict(&sample_input()).unwrap();
        assert_eq!(result.probabilities.iter().count(), NUM_CLASSES);
        assert!(result.probabilities.iter().all(|(_, p)| (0.0..=1.0).contains(&p)));
        assert!((result.probabilities.sum() - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE);

        let (top, p) = result.probabilities.max();
        assert_eq!(result.confidence, p);
        assert_eq!(result.prediction, top);
    }

    #[test]
    fn test_rounding_applied() {
        let result = fixed(1, &NORMAL).predict(&sample_input()).unwrap();
        assert_eq!(result.confidence, 0.8124);
        assert_eq!(result.probabilities.get(ObesityLevel::NormalWeight), 0.8124);
        assert_eq!(result.probabilities.get(ObesityLevel::ObesityTypeII), 0.0176);
    }

    #[test]
    fn test_unloaded_is_unavailable() {
        let service = PredictionService::new(ModelState::Unloaded);
        assert!(!service.is_loaded());
        assert_eq!(service.model_format(), None);
        let err = service.predict(&sample_input()).unwrap_err();
        assert!(matches!(err, PredictionError::ServiceUnavailable));
    }

    #[test]
    fn test_unmapped_code_is_corrupt() {
        let err = fixed(9, &NORMAL).predict(&sample_input()).unwrap_err();
        assert!(matches!(err, PredictionError::CorruptPrediction { code: 9 }));

        let err = fixed(-1, &NORMAL).predict(&sample_input()).unwrap_err();
        assert_eq!(err.kind(), "corrupt_prediction");
    }

    #[test]
    fn test_classifier_error_is_inference_failure() {
        let err = service_with(BrokenClassifier).predict(&sample_input()).unwrap_err();
        match err {
            PredictionError::InferenceFailure(message) => assert!(message.contains("15 columns")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_probability_shape_is_inference_failure() {
        let err = fixed(1, &[0.5, 0.5]).predict(&sample_input()).unwrap_err();
        assert!(matches!(err, PredictionError::InferenceFailure(_)));

        let err = fixed(1, &[0.3; NUM_CLASSES]).predict(&sample_input()).unwrap_err();
        assert!(matches!(err, PredictionError::InferenceFailure(_)));
    }

    #[test]
    fn test_classifier_label_is_authoritative() {
        // predicted class disagrees with the arg-max; the label wins
        let result = fixed(2, &NORMAL).predict(&sample_input()).unwrap();
        assert_eq!(result.prediction, ObesityLevel::OverweightLevelI);
        assert_eq!(result.confidence, 0.8124);
    }

    #[test]
    fn test_invalid_record_collects_every_field() {
        let mut record = sample_record();
        record["Age"] = json!(200);
        record["Gender"] = json!("Other");
        let err = tree_service().predict_value(&record).unwrap_err();
        match err {
            PredictionError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains_field("Age"));
                assert!(errors.contains_field("Gender"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
