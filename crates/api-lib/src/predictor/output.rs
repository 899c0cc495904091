//! Prediction output formatting and post-processing
//!
//! Checks raw class probabilities and rounds every number that leaves the
//! service.

use crate::domain::NUM_CLASSES;
use crate::models::ClassProbabilities;

/// Allowed distance of the probability sum from 1
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Decimal places kept on each probability and the confidence
    pub probability_decimals: u32,
    /// Decimal places kept on the BMI
    pub bmi_decimals: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            probability_decimals: 4,
            bmi_decimals: 2,
        }
    }
}

/// Validates and rounds raw model outputs
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn round(value: f64, decimals: u32) -> f64 {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }

    /// Check raw probabilities and round them for output.
    ///
    /// The vector must hold one finite value in `[0, 1]` per class and
    /// sum to 1 within [`PROBABILITY_SUM_TOLERANCE`].
    pub fn probabilities(&self, raw: &[f64]) -> Result<ClassProbabilities, String> {
        if raw.len() != NUM_CLASSES {
            return Err(format!(
                "model returned {} probabilities, expected {}",
                raw.len(),
                NUM_CLASSES
            ));
        }
        if let Some(bad) = raw.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
            return Err(format!("probability {} is outside [0, 1]", bad));
        }
        let sum: f64 = raw.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(format!("probabilities sum to {:.4}", sum));
        }

        let mut values = [0.0; NUM_CLASSES];
        for (out, p) in values.iter_mut().zip(raw) {
            *out = Self::round(*p, self.config.probability_decimals);
        }
        Ok(ClassProbabilities::new(values))
    }

    /// Highest raw probability, rounded like the probabilities
    pub fn confidence(&self, raw: &[f64]) -> f64 {
        let max = raw.iter().copied().fold(0.0, f64::max);
        Self::round(max, self.config.probability_decimals)
    }

    pub fn bmi(&self, bmi: f64) -> f64 {
        Self::round(bmi, self.config.bmi_decimals)
    }
}
