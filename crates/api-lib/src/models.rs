//! Core data models for the prediction pipeline

use crate::domain::{BmiCategory, DomainEnum, ObesityLevel, NUM_CLASSES};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Number of columns the classifier was fit on
pub const NUM_FEATURES: usize = 16;

/// Encoded model input, one row in training column order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f32; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f32; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, column: usize) -> Option<f32> {
        self.values.get(column).copied()
    }
}

/// Per-class probabilities indexed by class code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    values: [f64; NUM_CLASSES],
}

impl ClassProbabilities {
    pub fn new(values: [f64; NUM_CLASSES]) -> Self {
        Self { values }
    }

    pub fn get(&self, level: ObesityLevel) -> f64 {
        self.values[level.code() as usize]
    }

    /// Label/probability pairs in class-code order
    pub fn iter(&self) -> impl Iterator<Item = (ObesityLevel, f64)> + '_ {
        ObesityLevel::ALL.iter().copied().zip(self.values.iter().copied())
    }

    /// Largest probability and its label, first label wins ties
    pub fn max(&self) -> (ObesityLevel, f64) {
        let mut best = (ObesityLevel::ALL[0], self.values[0]);
        for (level, p) in self.iter().skip(1) {
            if p > best.1 {
                best = (level, p);
            }
        }
        best
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Serialized as `{label: probability}` with keys in class-code order
impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_CLASSES))?;
        for (level, p) in self.iter() {
            map.serialize_entry(level.as_str(), &p)?;
        }
        map.end()
    }
}

/// Outcome of one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: ObesityLevel,
    pub prediction_code: u8,
    pub probabilities: ClassProbabilities,
    pub confidence: f64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
}
