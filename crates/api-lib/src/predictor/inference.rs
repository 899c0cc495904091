//! ONNX inference using tract
//!
//! Fallback backend for classifiers exported with `skl2onnx` or
//! `onnxmltools`. The graph takes a single `f32 [1, 16]` input in encoder
//! column order and yields a `f32` probability tensor with one value per
//! class, optionally alongside an `i64` label tensor. Export with ZipMap
//! disabled so probabilities come out as a plain tensor.

use super::{argmax, Classifier, ModelFormat};
use crate::domain::NUM_CLASSES;
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{bail, Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference slower than this is logged
const SLOW_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Raw outputs of one graph run
struct GraphOutputs {
    probabilities: Vec<f64>,
    label: Option<i64>,
}

impl GraphOutputs {
    fn label(&self) -> Result<i64> {
        match self.label {
            Some(label) => Ok(label),
            None => argmax(&self.probabilities).context("Model returned no class probabilities"),
        }
    }
}

/// Classifier backed by an optimized tract plan
pub struct OnnxClassifier {
    model: TractModel,
}

impl OnnxClassifier {
    /// Parse, type and optimize an ONNX graph
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model })
    }

    fn features_to_tensor(features: &FeatureVector) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), features.as_slice().to_vec())
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }

    fn run(&self, features: &FeatureVector) -> Result<GraphOutputs> {
        let start = Instant::now();
        let input = Self::features_to_tensor(features)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms", SLOW_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        let mut probabilities = None;
        let mut label = None;
        for output in outputs.iter() {
            if output.datum_type() == f32::datum_type() && probabilities.is_none() {
                let view = output.to_array_view::<f32>()?;
                probabilities = Some(view.iter().map(|p| *p as f64).collect::<Vec<_>>());
            } else if output.datum_type() == i64::datum_type() && label.is_none() {
                let view = output.to_array_view::<i64>()?;
                label = view.iter().next().copied();
            }
        }

        let probabilities = probabilities.context("Model produced no f32 probability output")?;
        if probabilities.len() != NUM_CLASSES {
            bail!(
                "Model output has {} probabilities, expected {}",
                probabilities.len(),
                NUM_CLASSES
            );
        }
        Ok(GraphOutputs { probabilities, label })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        Ok(self.run(features)?.probabilities)
    }

    /// Uses the graph's own label output when it has one
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        self.run(features)?.label()
    }

    fn classify(&self, features: &FeatureVector) -> Result<(i64, Vec<f64>)> {
        let outputs = self.run(features)?;
        Ok((outputs.label()?, outputs.probabilities))
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Onnx
    }
}
