//! Feature encoding for ML inference
//!
//! Maps a validated request onto the exact row layout the classifier was
//! trained on. Columns follow request field order. Categorical columns carry
//! the index of the category in its sorted training category list, which is
//! the coding a pandas `category` column receives. A mismatch here produces
//! wrong predictions without any runtime error, so the layout is also
//! checked against the model artifact at load time via [`FeatureSchema`].

use crate::catalog::FEATURES;
use crate::domain::{BmiCategory, Frequency, Gender, Transport, YesNo};
use crate::input::PredictionInput;
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{bail, Result};

/// Body mass index, kg / m²
pub fn calculate_bmi(height_m: f64, weight_kg: f64) -> f64 {
    weight_kg / (height_m * height_m)
}

pub fn bmi_category(bmi: f64) -> BmiCategory {
    BmiCategory::from_bmi(bmi)
}

/// Training-time category code of a categorical value
pub trait CategoryCode {
    fn category_code(self) -> f32;
}

impl CategoryCode for Gender {
    fn category_code(self) -> f32 {
        match self {
            Gender::Female => 0.0,
            Gender::Male => 1.0,
        }
    }
}

impl CategoryCode for YesNo {
    fn category_code(self) -> f32 {
        match self {
            YesNo::No => 0.0,
            YesNo::Yes => 1.0,
        }
    }
}

impl CategoryCode for Frequency {
    fn category_code(self) -> f32 {
        match self {
            Frequency::Always => 0.0,
            Frequency::Frequently => 1.0,
            Frequency::Sometimes => 2.0,
            Frequency::No => 3.0,
        }
    }
}

impl CategoryCode for Transport {
    fn category_code(self) -> f32 {
        match self {
            Transport::Automobile => 0.0,
            Transport::Bike => 1.0,
            Transport::Motorbike => 2.0,
            Transport::PublicTransportation => 3.0,
            Transport::Walking => 4.0,
        }
    }
}

/// Stateless encoder from validated input to model row
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, input: &PredictionInput) -> FeatureVector {
        FeatureVector::new([
            input.gender().category_code(),
            input.age() as f32,
            input.height() as f32,
            input.weight() as f32,
            input.family_history_with_overweight().category_code(),
            input.favc().category_code(),
            input.fcvc() as f32,
            input.ncp() as f32,
            input.caec().category_code(),
            input.smoke().category_code(),
            input.ch2o() as f32,
            input.scc().category_code(),
            input.faf() as f32,
            input.tue() as f32,
            input.calc().category_code(),
            input.mtrans().category_code(),
        ])
    }
}

/// Column layout the encoder produces
pub struct FeatureSchema;

impl FeatureSchema {
    pub fn column_names() -> [&'static str; NUM_FEATURES] {
        FEATURES.map(|spec| spec.name)
    }

    /// Check a model artifact's recorded schema against the encoder.
    ///
    /// `names` and `types` may be empty when the artifact does not record
    /// them. Type strings follow XGBoost's convention where `"c"` marks a
    /// categorical column.
    pub fn check(num_features: usize, names: &[String], types: &[String]) -> Result<()> {
        if num_features != NUM_FEATURES {
            bail!(
                "model expects {} features, encoder produces {}",
                num_features,
                NUM_FEATURES
            );
        }

        if !names.is_empty() {
            let expected = Self::column_names();
            if names.len() != expected.len() || names.iter().zip(expected).any(|(a, b)| a != b) {
                bail!(
                    "model feature names {:?} do not match encoder columns {:?}",
                    names,
                    expected
                );
            }
        }

        if !types.is_empty() {
            if types.len() != NUM_FEATURES {
                bail!("model records {} feature types, expected {}", types.len(), NUM_FEATURES);
            }
            for (spec, recorded) in FEATURES.iter().zip(types) {
                if !spec.is_categorical() && recorded == "c" {
                    bail!("column {} is numeric but the model treats it as categorical", spec.name);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainEnum;
    use crate::input::tests::{sample_input, sample_record};
    use serde_json::json;

    #[test]
    fn test_bmi_reference_values() {
        let bmi = calculate_bmi(1.75, 75.0);
        assert!((bmi - 24.489_795_918).abs() < 1e-6);
        assert_eq!(bmi_category(bmi), BmiCategory::Normal);

        let bmi = calculate_bmi(1.75, 100.0);
        assert!((bmi - 32.653_061_224).abs() < 1e-6);
        assert_eq!(bmi_category(bmi), BmiCategory::Obese);
    }

    #[test]
    fn test_encode_column_order() {
        let row = FeatureEncoder::new().encode(&sample_input());
        let expected: [f32; NUM_FEATURES] = [
            1.0,  // Gender: Male
            25.0, // Age
            1.75, // Height
            75.0, // Weight
            1.0,  // family history: yes
            1.0,  // FAVC: yes
            2.0,  // FCVC
            3.0,  // NCP
            2.0,  // CAEC: Sometimes
            0.0,  // SMOKE: no
            2.0,  // CH2O
            0.0,  // SCC: no
            1.0,  // FAF
            1.0,  // TUE
            2.0,  // CALC: Sometimes
            3.0,  // MTRANS: Public_Transportation
        ];
        assert_eq!(row.as_slice(), &expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = FeatureEncoder::new();
        let input = sample_input();
        assert_eq!(encoder.encode(&input), encoder.encode(&input));
    }

    #[test]
    fn test_category_codes_follow_sorted_literals() {
        fn check<E: DomainEnum + CategoryCode>() {
            let mut sorted: Vec<&str> = E::values().to_vec();
            sorted.sort_unstable();
            for variant in E::VARIANTS {
                let idx = sorted.iter().position(|v| *v == variant.as_str()).unwrap();
                assert_eq!(variant.category_code(), idx as f32, "{}", variant.as_str());
            }
        }
        check::<Gender>();
        check::<YesNo>();
        check::<Frequency>();
        check::<Transport>();
    }

    #[test]
    fn test_other_values_change_encoding() {
        let mut record = sample_record();
        record["Gender"] = json!("Female");
        record["MTRANS"] = json!("Walking");
        record["CALC"] = json!("no");
        let input = PredictionInput::try_from(&record).unwrap();
        let row = FeatureEncoder::new().encode(&input);
        assert_eq!(row.get(0), Some(0.0));
        assert_eq!(row.get(14), Some(3.0));
        assert_eq!(row.get(15), Some(4.0));
    }

    #[test]
    fn test_schema_accepts_matching_artifact() {
        let names: Vec<String> = FeatureSchema::column_names().iter().map(|s| s.to_string()).collect();
        let types: Vec<String> = FEATURES
            .iter()
            .map(|f| if f.is_categorical() { "c" } else { "float" }.to_string())
            .collect();
        assert!(FeatureSchema::check(16, &names, &types).is_ok());
        assert!(FeatureSchema::check(16, &[], &[]).is_ok());
    }

    #[test]
    fn test_schema_rejects_mismatch() {
        assert!(FeatureSchema::check(15, &[], &[]).is_err());

        let mut names: Vec<String> = FeatureSchema::column_names().iter().map(|s| s.to_string()).collect();
        names.swap(1, 2);
        assert!(FeatureSchema::check(16, &names, &[]).is_err());

        let types = vec!["c".to_string(); 16];
        assert!(FeatureSchema::check(16, &[], &types).is_err());
    }
}
