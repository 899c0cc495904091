//! Model artifact discovery and loading
//!
//! The primary artifact is tried first and the fallback second. An
//! artifact may ship with a `<file>.sha256` sidecar holding its hex digest
//! (the `sha256sum` output format is accepted). A missing artifact is
//! skipped quietly; an artifact that fails to read, verify or parse is
//! logged and skipped. When nothing loads the service starts anyway in the
//! unloaded state.

use super::inference::OnnxClassifier;
use super::xgboost::XgbClassifier;
use super::{Classifier, ModelFormat};
use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MODEL_FILE: &str = "xgb_obesity_model.json";
pub const DEFAULT_FALLBACK_MODEL_FILE: &str = "xgb_obesity_model.onnx";

/// Candidate artifact locations, in load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub primary: PathBuf,
    pub fallback: PathBuf,
}

impl ModelPaths {
    /// Default file names inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_files(dir, DEFAULT_MODEL_FILE, DEFAULT_FALLBACK_MODEL_FILE)
    }

    pub fn with_files(dir: impl AsRef<Path>, primary: &str, fallback: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            primary: dir.join(primary),
            fallback: dir.join(fallback),
        }
    }

    fn candidates(&self) -> [&Path; 2] {
        [&self.primary, &self.fallback]
    }
}

/// A classifier together with where it came from
#[derive(Clone)]
pub struct LoadedModel {
    classifier: Arc<dyn Classifier>,
    path: PathBuf,
    checksum: String,
    loaded_at: i64,
}

impl LoadedModel {
    pub fn new(classifier: Arc<dyn Classifier>, path: impl Into<PathBuf>, checksum: impl Into<String>) -> Self {
        Self {
            classifier,
            path: path.into(),
            checksum: checksum.into(),
            loaded_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn format(&self) -> ModelFormat {
        self.classifier.format()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex SHA-256 of the artifact bytes
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn loaded_at(&self) -> i64 {
        self.loaded_at
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("format", &self.format())
            .field("path", &self.path)
            .field("checksum", &self.checksum)
            .finish()
    }
}

/// Whether a classifier is available. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub enum ModelState {
    Unloaded,
    Loaded(LoadedModel),
}

impl ModelState {
    pub fn model(&self) -> Option<&LoadedModel> {
        match self {
            ModelState::Loaded(model) => Some(model),
            ModelState::Unloaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }
}

/// Load the first usable artifact
pub fn load_model(paths: &ModelPaths) -> ModelState {
    for path in paths.candidates() {
        if !path.exists() {
            debug!(path = %path.display(), "Model artifact not present");
            continue;
        }

        match load_artifact(path) {
            Ok(model) => {
                info!(
                    path = %path.display(),
                    format = %model.format(),
                    checksum = %model.checksum(),
                    "Model loaded"
                );
                return ModelState::Loaded(model);
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{:#}", e), "Failed to load model artifact");
            }
        }
    }

    warn!(
        primary = %paths.primary.display(),
        fallback = %paths.fallback.display(),
        "No model artifact could be loaded, predictions are unavailable"
    );
    ModelState::Unloaded
}

/// Read, verify and parse a single artifact
pub fn load_artifact(path: &Path) -> Result<LoadedModel> {
    let format = format_for_path(path)?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read model file {:?}", path))?;
    let checksum = compute_checksum(&bytes);
    verify_sidecar(path, &checksum)?;

    let classifier: Arc<dyn Classifier> = match format {
        ModelFormat::XgboostJson => Arc::new(XgbClassifier::from_slice(&bytes)?),
        ModelFormat::Onnx => Arc::new(OnnxClassifier::from_bytes(&bytes)?),
    };
    Ok(LoadedModel::new(classifier, path, checksum))
}

fn format_for_path(path: &Path) -> Result<ModelFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(ModelFormat::XgboostJson),
        Some("onnx") => Ok(ModelFormat::Onnx),
        _ => bail!("Unsupported model artifact {:?}, expected .json or .onnx", path),
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn verify_sidecar(path: &Path, checksum: &str) -> Result<()> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(());
    }
    let contents = fs::read_to_string(&sidecar)
        .with_context(|| format!("Failed to read checksum file {:?}", sidecar))?;
    let expected = contents
        .split_whitespace()
        .next()
        .with_context(|| format!("Checksum file {:?} is empty", sidecar))?;
    if !expected.eq_ignore_ascii_case(checksum) {
        bail!("Checksum mismatch: expected {}, got {}", expected, checksum);
    }
    debug!(path = %path.display(), "Checksum verified");
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
