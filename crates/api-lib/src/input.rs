//! Validated prediction request
//!
//! [`PredictionInput`] can only be built through [`PredictionInput::from_record`]
//! (or `TryFrom<&Value>`), which checks every field and reports every
//! violation at once. Nothing downstream re-validates.

use crate::catalog::{
    NumericRange, AGE_RANGE, CH2O_RANGE, FAF_RANGE, FCVC_RANGE, HEIGHT_RANGE, NCP_RANGE,
    TUE_RANGE, WEIGHT_RANGE,
};
use crate::domain::{DomainEnum, Frequency, Gender, Transport, YesNo};
use crate::error::{FieldError, FieldErrorKind, ValidationErrors};
use serde::Serialize;
use serde_json::{Map, Value};

/// One respondent's lifestyle and anthropometric answers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInput {
    #[serde(rename = "Gender")]
    gender: Gender,
    #[serde(rename = "Age")]
    age: f64,
    #[serde(rename = "Height")]
    height: f64,
    #[serde(rename = "Weight")]
    weight: f64,
    family_history_with_overweight: YesNo,
    #[serde(rename = "FAVC")]
    favc: YesNo,
    #[serde(rename = "FCVC")]
    fcvc: f64,
    #[serde(rename = "NCP")]
    ncp: f64,
    #[serde(rename = "CAEC")]
    caec: Frequency,
    #[serde(rename = "SMOKE")]
    smoke: YesNo,
    #[serde(rename = "CH2O")]
    ch2o: f64,
    #[serde(rename = "SCC")]
    scc: YesNo,
    #[serde(rename = "FAF")]
    faf: f64,
    #[serde(rename = "TUE")]
    tue: f64,
    #[serde(rename = "CALC")]
    calc: Frequency,
    #[serde(rename = "MTRANS")]
    mtrans: Transport,
}

impl PredictionInput {
    /// Validate an untyped JSON object.
    ///
    /// Extra keys are ignored. Every missing, mistyped, out-of-range or
    /// unknown-literal field is reported.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut fields = FieldReader {
            record,
            errors: &mut errors,
        };

        let gender = fields.category::<Gender>("Gender");
        let age = fields.number("Age", AGE_RANGE);
        let height = fields.number("Height", HEIGHT_RANGE);
        let weight = fields.number("Weight", WEIGHT_RANGE);
        let family_history = fields.category::<YesNo>("family_history_with_overweight");
        let favc = fields.category::<YesNo>("FAVC");
        let fcvc = fields.number("FCVC", FCVC_RANGE);
        let ncp = fields.number("NCP", NCP_RANGE);
        let caec = fields.category::<Frequency>("CAEC");
        let smoke = fields.category::<YesNo>("SMOKE");
        let ch2o = fields.number("CH2O", CH2O_RANGE);
        let scc = fields.category::<YesNo>("SCC");
        let faf = fields.number("FAF", FAF_RANGE);
        let tue = fields.number("TUE", TUE_RANGE);
        let calc = fields.category::<Frequency>("CALC");
        let mtrans = fields.category::<Transport>("MTRANS");

        match (
            gender,
            age,
            height,
            weight,
            family_history,
            favc,
            fcvc,
            ncp,
            caec,
            smoke,
            ch2o,
            scc,
            faf,
            tue,
            calc,
            mtrans,
        ) {
            (
                Some(gender),
                Some(age),
                Some(height),
                Some(weight),
                Some(family_history_with_overweight),
                Some(favc),
                Some(fcvc),
                Some(ncp),
                Some(caec),
                Some(smoke),
                Some(ch2o),
                Some(scc),
                Some(faf),
                Some(tue),
                Some(calc),
                Some(mtrans),
            ) if errors.is_empty() => Ok(Self {
                gender,
                age,
                height,
                weight,
                family_history_with_overweight,
                favc,
                fcvc,
                ncp,
                caec,
                smoke,
                ch2o,
                scc,
                faf,
                tue,
                calc,
                mtrans,
            }),
            _ => Err(errors),
        }
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Age in years
    pub fn age(&self) -> f64 {
        self.age
    }

    /// Height in meters
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Weight in kilograms
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn family_history_with_overweight(&self) -> YesNo {
        self.family_history_with_overweight
    }

    /// Frequent consumption of high caloric food
    pub fn favc(&self) -> YesNo {
        self.favc
    }

    /// Frequency of vegetable consumption
    pub fn fcvc(&self) -> f64 {
        self.fcvc
    }

    /// Number of main meals
    pub fn ncp(&self) -> f64 {
        self.ncp
    }

    /// Food between meals
    pub fn caec(&self) -> Frequency {
        self.caec
    }

    pub fn smoke(&self) -> YesNo {
        self.smoke
    }

    /// Daily water intake
    pub fn ch2o(&self) -> f64 {
        self.ch2o
    }

    /// Calorie consumption monitoring
    pub fn scc(&self) -> YesNo {
        self.scc
    }

    /// Physical activity frequency
    pub fn faf(&self) -> f64 {
        self.faf
    }

    /// Time using technology devices
    pub fn tue(&self) -> f64 {
        self.tue
    }

    /// Alcohol consumption
    pub fn calc(&self) -> Frequency {
        self.calc
    }

    pub fn mtrans(&self) -> Transport {
        self.mtrans
    }
}

impl TryFrom<&Value> for PredictionInput {
    type Error = ValidationErrors;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value.as_object() {
            Some(record) => Self::from_record(record),
            None => {
                let mut errors = ValidationErrors::default();
                errors.push(FieldError::new(
                    "body",
                    FieldErrorKind::InvalidType,
                    format!("expected a JSON object, got {}", json_type_name(value)),
                ));
                Err(errors)
            }
        }
    }
}

struct FieldReader<'a> {
    record: &'a Map<String, Value>,
    errors: &'a mut ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn present(&mut self, field: &str) -> Option<&'a Value> {
        let record: &'a Map<String, Value> = self.record;
        match record.get(field) {
            Some(value) => Some(value),
            None => {
                self.errors
                    .push(FieldError::new(field, FieldErrorKind::Missing, "field required"));
                None
            }
        }
    }

    /// Numbers and numeric strings are accepted; anything else is a type error.
    fn number(&mut self, field: &str, range: NumericRange) -> Option<f64> {
        let value = self.present(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        let Some(number) = parsed.filter(|n| n.is_finite()) else {
            let message = format!("expected a number, got {}", json_type_name(value));
            self.errors
                .push(FieldError::new(field, FieldErrorKind::InvalidType, message));
            return None;
        };

        if !range.contains(number) {
            self.errors.push(FieldError::new(
                field,
                FieldErrorKind::OutOfRange,
                format!("{} is outside the range {} to {}", number, range.min, range.max),
            ));
            return None;
        }

        Some(number)
    }

    fn category<E: DomainEnum>(&mut self, field: &str) -> Option<E> {
        let value = self.present(field)?;
        let Some(literal) = value.as_str() else {
            let message = format!("expected a string, got {}", json_type_name(value));
            self.errors
                .push(FieldError::new(field, FieldErrorKind::InvalidType, message));
            return None;
        };

        match E::from_value(literal) {
            Ok(variant) => Some(variant),
            Err(err) => {
                self.errors.push(FieldError::new(
                    field,
                    FieldErrorKind::InvalidEnum,
                    format!("{}; expected one of {}", err, E::values().join(", ")),
                ));
                None
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
