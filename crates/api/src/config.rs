//! Service configuration
//!
//! Read from an optional `obesity-api.{toml,yaml,json}` file in the working
//! directory, then from `OBESITY_*` environment variables, which win.
//! `OBESITY_CORS_ORIGINS` takes a comma separated list.

use anyhow::{bail, Context, Result};
use api_lib::ModelPaths;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_model_file")]
    pub model_file: String,

    #[serde(default = "default_fallback_model_file")]
    pub fallback_model_file: String,

    /// Static key required in `X-API-Key` on `/predict`, open when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_model_file() -> String {
    api_lib::predictor::DEFAULT_MODEL_FILE.to_string()
}

fn default_fallback_model_file() -> String {
    api_lib::predictor::DEFAULT_FALLBACK_MODEL_FILE.to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_dir: default_model_dir(),
            model_file: default_model_file(),
            fallback_model_file: default_fallback_model_file(),
            api_key: None,
            cors_origins: default_cors_origins(),
            instance_name: default_instance_name(),
        }
    }
}

/// `OBESITY_*` variables, with `cors_origins` split on commas
fn environment() -> config::Environment {
    config::Environment::with_prefix("OBESITY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_origins")
}

impl ApiConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("obesity-api").required(false))
            .add_source(environment())
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let mut parsed: ApiConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;

        if parsed.api_key.as_deref().map(str::trim) == Some("") {
            parsed.api_key = None;
        }
        parsed.cors_origins.retain(|o| !o.trim().is_empty());
        if parsed.cors_origins.is_empty() {
            bail!("cors_origins must name at least one origin");
        }
        Ok(parsed)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths::with_files(&self.model_dir, &self.model_file, &self.fallback_model_file)
    }

    /// Create the model directory if missing. Failure only degrades the
    /// service, since loading then finds no artifact.
    pub fn ensure_model_dir(&self) -> bool {
        match std::fs::create_dir_all(&self.model_dir) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    model_dir = %self.model_dir.display(),
                    error = %e,
                    "Failed to create model directory"
                );
                false
            }
        }
    }
}
