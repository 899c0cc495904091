//! Error types for the prediction pipeline
//!
//! Each stage has its own error so the HTTP boundary can map kinds to
//! status codes without looking at message text.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A literal that is not a member of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {type_name}")]
pub struct InvalidEnumValue {
    pub type_name: &'static str,
    pub value: String,
}

/// Category of a single field violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    InvalidType,
    OutOfRange,
    InvalidEnum,
}

/// One violated field of a prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Every violation found in a request, in field order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the offending fields
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, error.field, error.message)?;
        }
        Ok(())
    }
}

/// Failure of a prediction request after it reached the service
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("input validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("model is not loaded")]
    ServiceUnavailable,

    /// The classifier emitted a code outside the label table
    #[error("model predicted class code {code} which has no label")]
    CorruptPrediction { code: i64 },

    #[error("inference failed: {0}")]
    InferenceFailure(String),
}

impl PredictionError {
    /// Short stable name used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Validation(_) => "validation",
            PredictionError::ServiceUnavailable => "service_unavailable",
            PredictionError::CorruptPrediction { .. } => "corrupt_prediction",
            PredictionError::InferenceFailure(_) => "inference_failure",
        }
    }
}
