//! Core library for the obesity level prediction API
//!
//! This crate provides:
//! - Domain enums for every categorical answer and the predicted level
//! - Request validation and the static feature catalog
//! - Feature encoding, model loading and the prediction pipeline
//! - Health reporting and observability

pub mod catalog;
pub mod domain;
pub mod error;
pub mod health;
pub mod input;
pub mod models;
pub mod observability;
pub mod predictor;

pub use catalog::{FeaturesResponse, LabelsResponse};
pub use domain::{BmiCategory, DomainEnum, ObesityLevel};
pub use error::{FieldError, FieldErrorKind, InvalidEnumValue, PredictionError, ValidationErrors};
pub use health::{ComponentStatus, HealthResponse, ReadinessResponse};
pub use input::PredictionInput;
pub use models::*;
pub use observability::{ApiMetrics, StructuredLogger};
pub use predictor::{
    load_model, Classifier, LoadedModel, ModelFormat, ModelPaths, ModelState, PredictionService,
};
