//! Obesity level prediction API server
//!
//! Loads the classifier once, then serves predictions over HTTP. A missing
//! or unreadable model is not fatal: the server starts degraded and
//! `/predict` answers 503.

use anyhow::Result;
use api_lib::{load_model, observability::StructuredLogger, ApiMetrics, PredictionService};
use obesity_api::{api, ApiConfig, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting obesity-api");

    let config = ApiConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_dir = %config.model_dir.display(),
        auth = config.api_key.is_some(),
        "Service configured"
    );

    config.ensure_model_dir();

    let logger = StructuredLogger::new(&config.instance_name);
    let metrics = ApiMetrics::new();

    // Loading finishes before the listener is bound, so no request sees a partial state.
    let state = load_model(&config.model_paths());
    match state.model() {
        Some(model) => {
            logger.log_model_loaded(model.format(), &model.path().display().to_string(), model.checksum());
            metrics.set_model(Some((model.format(), model.checksum())));
        }
        None => {
            logger.log_model_unavailable(&config.model_dir.display().to_string());
            metrics.set_model(None);
        }
    }

    let addr = config.bind_addr();
    logger.log_startup(api::API_VERSION, &addr, state.is_loaded());

    let app_state = Arc::new(
        AppState::new(PredictionService::new(state), logger.clone())
            .with_api_key(config.api_key.clone())
            .with_cors_origins(config.cors_origins.clone()),
    );

    api::serve(&addr, app_state).await?;
    logger.log_shutdown("ctrl-c received");

    Ok(())
}
