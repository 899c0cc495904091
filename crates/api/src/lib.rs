//! Obesity level prediction API
//!
//! HTTP surface over [`api_lib::PredictionService`]. The binary in
//! `main.rs` wires configuration, model loading and the server together.

pub mod api;
pub mod config;
pub mod middleware;

pub use api::{create_router, serve, ApiError, AppState};
pub use config::ApiConfig;
