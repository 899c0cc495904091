//! Static metadata about the model's inputs and outputs
//!
//! The numeric ranges here are the ones the validator enforces, so the
//! `/features` document cannot drift from what requests are checked against.

use crate::domain::{DomainEnum, Frequency, Gender, ObesityLevel, Transport, YesNo, NUM_CLASSES};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Inclusive numeric bounds of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const AGE_RANGE: NumericRange = NumericRange::new(10.0, 120.0);
pub const HEIGHT_RANGE: NumericRange = NumericRange::new(1.0, 2.5);
pub const WEIGHT_RANGE: NumericRange = NumericRange::new(20.0, 300.0);
pub const FCVC_RANGE: NumericRange = NumericRange::new(1.0, 3.0);
pub const NCP_RANGE: NumericRange = NumericRange::new(1.0, 4.0);
pub const CH2O_RANGE: NumericRange = NumericRange::new(1.0, 3.0);
pub const FAF_RANGE: NumericRange = NumericRange::new(0.0, 3.0);
pub const TUE_RANGE: NumericRange = NumericRange::new(0.0, 2.0);

#[derive(Debug, Clone, Copy)]
pub enum FeatureKind {
    Numeric(NumericRange),
    Categorical(&'static [&'static str]),
}

/// Metadata for one request field
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub unit: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl FeatureSpec {
    const fn numeric(
        name: &'static str,
        range: NumericRange,
        unit: Option<&'static str>,
        description: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            kind: FeatureKind::Numeric(range),
            unit,
            description,
        }
    }

    const fn categorical(
        name: &'static str,
        values: &'static [&'static str],
        description: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            kind: FeatureKind::Categorical(values),
            unit: None,
            description,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FeatureKind::Categorical(_))
    }
}

/// Request fields in declaration order
pub const FEATURES: [FeatureSpec; 16] = [
    FeatureSpec::categorical("Gender", Gender::VALUES, None),
    FeatureSpec::numeric("Age", AGE_RANGE, Some("years"), None),
    FeatureSpec::numeric("Height", HEIGHT_RANGE, Some("meters"), None),
    FeatureSpec::numeric("Weight", WEIGHT_RANGE, Some("kg"), None),
    FeatureSpec::categorical("family_history_with_overweight", YesNo::VALUES, None),
    FeatureSpec::categorical("FAVC", YesNo::VALUES, Some("High caloric food consumption")),
    FeatureSpec::numeric("FCVC", FCVC_RANGE, None, Some("Vegetable consumption frequency")),
    FeatureSpec::numeric("NCP", NCP_RANGE, None, Some("Number of main meals")),
    FeatureSpec::categorical("CAEC", Frequency::VALUES, Some("Food between meals")),
    FeatureSpec::categorical("SMOKE", YesNo::VALUES, None),
    FeatureSpec::numeric("CH2O", CH2O_RANGE, Some("liters"), Some("Daily water intake")),
    FeatureSpec::categorical("SCC", YesNo::VALUES, Some("Calorie monitoring")),
    FeatureSpec::numeric("FAF", FAF_RANGE, None, Some("Physical activity frequency (days/week)")),
    FeatureSpec::numeric("TUE", TUE_RANGE, Some("hours"), Some("Technology usage time")),
    FeatureSpec::categorical("CALC", Frequency::VALUES, Some("Alcohol consumption")),
    FeatureSpec::categorical("MTRANS", Transport::VALUES, Some("Transportation")),
];

#[derive(Serialize)]
struct FeatureInfo {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
}

impl From<&FeatureSpec> for FeatureInfo {
    fn from(spec: &FeatureSpec) -> Self {
        let (kind, values, range) = match spec.kind {
            FeatureKind::Numeric(r) => ("float", None, Some([r.min, r.max])),
            FeatureKind::Categorical(values) => ("string", Some(values), None),
        };
        Self {
            kind,
            values,
            range,
            unit: spec.unit,
            description: spec.description,
        }
    }
}

/// The feature table as a JSON object keyed by field name, in field order
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCatalog;

impl Serialize for FeatureCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURES.len()))?;
        for spec in &FEATURES {
            map.serialize_entry(spec.name, &FeatureInfo::from(spec))?;
        }
        map.end()
    }
}

/// Body of the `/features` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct FeaturesResponse {
    pub features: FeatureCatalog,
}

impl FeaturesResponse {
    pub fn new() -> Self {
        Self {
            features: FeatureCatalog,
        }
    }
}

impl Default for FeaturesResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of the `/labels` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LabelsResponse {
    pub labels: BTreeMap<u8, &'static str>,
    pub total_classes: usize,
}

impl LabelsResponse {
    pub fn new() -> Self {
        Self {
            labels: label_mapping(),
            total_classes: NUM_CLASSES,
        }
    }
}

impl Default for LabelsResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Class code to label
pub fn label_mapping() -> BTreeMap<u8, &'static str> {
    ObesityLevel::ALL
        .iter()
        .map(|level| (level.code(), level.as_str()))
        .collect()
}
