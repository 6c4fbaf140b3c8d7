//! Model resolution
//!
//! Resolves a usable price model once at startup through an ordered chain of
//! loading strategies. The first strategy that yields a valid artifact wins;
//! when none does, the service runs on the heuristic for its whole lifetime.

use super::inference::{LinearModel, OnnxModel};
use super::PriceModel;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Last-resort artifact location
pub const DEFAULT_MODEL_PATH: &str = "artifacts/used_car_price_model.onnx";

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

/// Configured artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPaths {
    /// ONNX artifact tried first
    #[serde(default)]
    pub primary: Option<PathBuf>,
    /// JSON linear artifact tried second
    #[serde(default)]
    pub fallback: Option<PathBuf>,
    /// ONNX artifact tried last
    #[serde(default = "default_model_path")]
    pub default: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            primary: None,
            fallback: None,
            default: default_model_path(),
        }
    }
}

/// Which strategy produced the active model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    #[serde(rename = "primary")]
    Primary,
    #[serde(rename = "fallback-pickle")]
    FallbackPickle,
    #[serde(rename = "fallback-default-path")]
    FallbackDefaultPath,
    #[serde(rename = "none")]
    None,
}

impl ModelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::Primary => "primary",
            ModelSource::FallbackPickle => "fallback-pickle",
            ModelSource::FallbackDefaultPath => "fallback-default-path",
            ModelSource::None => "none",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes artifact bytes into a model
pub type ArtifactDecoder = fn(&[u8]) -> Result<Box<dyn PriceModel>, LoadError>;

fn decode_onnx(bytes: &[u8]) -> Result<Box<dyn PriceModel>, LoadError> {
    Ok(Box::new(OnnxModel::from_bytes(bytes)?))
}

fn decode_linear(bytes: &[u8]) -> Result<Box<dyn PriceModel>, LoadError> {
    Ok(Box::new(LinearModel::from_bytes(bytes)?))
}

/// One step of the resolution chain
#[derive(Clone)]
pub struct LoadStrategy {
    pub source: ModelSource,
    pub path: PathBuf,
    pub decode: ArtifactDecoder,
}

impl fmt::Debug for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadStrategy")
            .field("source", &self.source)
            .field("path", &self.path)
            .finish()
    }
}

/// Resolved model plus how it was obtained
///
/// Immutable after resolution; clones share the same model.
#[derive(Clone)]
pub struct ModelHandle {
    source: ModelSource,
    model: Option<Arc<dyn PriceModel>>,
    path: Option<PathBuf>,
    fingerprint: Option<String>,
}

impl ModelHandle {
    /// No model available; predictions use the heuristic
    pub fn none() -> Self {
        Self {
            source: ModelSource::None,
            model: None,
            path: None,
            fingerprint: None,
        }
    }

    /// Wrap an already-built model
    pub fn from_model(source: ModelSource, model: Arc<dyn PriceModel>) -> Self {
        Self {
            source,
            model: Some(model),
            path: None,
            fingerprint: None,
        }
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    pub fn model(&self) -> Option<&dyn PriceModel> {
        self.model.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// SHA-256 of the artifact bytes
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Short version label for logs and metrics
    pub fn version_label(&self) -> String {
        match &self.fingerprint {
            Some(fp) => format!("{}:{}", self.source, &fp[..fp.len().min(12)]),
            None => self.source.to_string(),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .field("format", &self.model.as_ref().map(|m| m.format_name()))
            .finish()
    }
}

/// Ordered chain of loading strategies
#[derive(Debug, Clone)]
pub struct ModelLoader {
    strategies: Vec<LoadStrategy>,
    expected_features: Option<Vec<String>>,
}

impl ModelLoader {
    /// Build the standard chain: primary ONNX, fallback JSON, default ONNX
    ///
    /// Unconfigured primary/fallback paths are left out of the chain.
    pub fn new(paths: &ModelPaths) -> Self {
        let mut strategies = Vec::with_capacity(3);
        if let Some(path) = &paths.primary {
            strategies.push(LoadStrategy {
                source: ModelSource::Primary,
                path: path.clone(),
                decode: decode_onnx,
            });
        }
        if let Some(path) = &paths.fallback {
            strategies.push(LoadStrategy {
                source: ModelSource::FallbackPickle,
                path: path.clone(),
                decode: decode_linear,
            });
        }
        strategies.push(LoadStrategy {
            source: ModelSource::FallbackDefaultPath,
            path: paths.default.clone(),
            decode: decode_onnx,
        });
        Self {
            strategies,
            expected_features: None,
        }
    }

    /// Build a loader from an explicit chain
    pub fn from_strategies(strategies: Vec<LoadStrategy>) -> Self {
        Self {
            strategies,
            expected_features: None,
        }
    }

    /// Reject artifacts whose inputs differ from these feature names
    pub fn with_expected_features(mut self, features: Vec<String>) -> Self {
        self.expected_features = Some(features);
        self
    }

    pub fn strategies(&self) -> &[LoadStrategy] {
        &self.strategies
    }

    /// Try each strategy in order; the first success wins
    pub fn resolve(&self) -> ModelHandle {
        for strategy in &self.strategies {
            match self.attempt(strategy) {
                Ok(handle) => {
                    info!(
                        source = %strategy.source,
                        path = %strategy.path.display(),
                        fingerprint = handle.fingerprint().unwrap_or(""),
                        "Model resolved"
                    );
                    return handle;
                }
                Err(e) => {
                    warn!(
                        source = %strategy.source,
                        path = %strategy.path.display(),
                        error = %e,
                        "Model loading strategy failed"
                    );
                }
            }
        }

        warn!("No model artifact resolved, using heuristic pricing");
        ModelHandle::none()
    }

    fn attempt(&self, strategy: &LoadStrategy) -> Result<ModelHandle, LoadError> {
        debug!(source = %strategy.source, path = %strategy.path.display(), "Trying model artifact");

        let bytes = std::fs::read(&strategy.path).map_err(|source| LoadError::Io {
            path: strategy.path.clone(),
            source,
        })?;
        let mut model = (strategy.decode)(&bytes)?;

        if let Some(expected) = &self.expected_features {
            model.schema().ensure_matches(expected)?;
        }

        // Identical inputs must always re-run inference
        model.disable_memoization();

        Ok(ModelHandle {
            source: strategy.source,
            model: Some(Arc::from(model)),
            path: Some(strategy.path.clone()),
            fingerprint: Some(compute_checksum(&bytes)),
        })
    }
}

/// Resolve with the standard chain and no schema expectation
pub fn resolve(paths: &ModelPaths) -> ModelHandle {
    ModelLoader::new(paths).resolve()
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
