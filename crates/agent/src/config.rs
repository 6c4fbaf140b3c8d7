//! Agent configuration

use anyhow::{Context, Result};
use pricing_lib::predictor::DEFAULT_MODEL_PATH;
use pricing_lib::{EncodingConfig, FeatureLayout, ModelPaths};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// ONNX artifact tried first
    #[serde(default)]
    pub primary_model_path: Option<PathBuf>,

    /// JSON linear artifact tried second
    #[serde(default)]
    pub fallback_model_path: Option<PathBuf>,

    /// ONNX artifact tried last
    #[serde(default = "default_model_path")]
    pub default_model_path: PathBuf,

    /// Vocabulary file; the built-in vocabulary is used when unset
    #[serde(default)]
    pub encoding_config_path: Option<PathBuf>,

    /// Feature layout name (`full` or `minimal`)
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Largest accepted batch upload in bytes
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "pricing-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_layout() -> String {
    "full".to_string()
}

fn default_max_batch_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            primary_model_path: None,
            fallback_model_path: None,
            default_model_path: default_model_path(),
            encoding_config_path: None,
            layout: default_layout(),
            max_batch_bytes: default_max_batch_bytes(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `PRICING_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRICING").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid PRICING_* configuration")
    }

    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths {
            primary: self.primary_model_path.clone(),
            fallback: self.fallback_model_path.clone(),
            default: self.default_model_path.clone(),
        }
    }

    pub fn feature_layout(&self) -> Result<FeatureLayout> {
        Ok(FeatureLayout::from_name(&self.layout)?)
    }

    /// Resolve the vocabulary; an unreadable configured file is fatal
    pub fn encoding_config(&self) -> Result<EncodingConfig> {
        match &self.encoding_config_path {
            Some(path) => EncodingConfig::from_path(path)
                .with_context(|| format!("Failed to load encoding config {}", path.display())),
            None => {
                info!("No encoding config path set, using built-in vocabulary");
                Ok(EncodingConfig::builtin())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.layout, "full");
        let paths = config.model_paths();
        assert!(paths.primary.is_none());
        assert_eq!(paths.default, PathBuf::from(DEFAULT_MODEL_PATH));
    }

    #[test]
    fn test_layout_resolution() {
        let mut config = AgentConfig::default();
        assert_eq!(config.feature_layout().unwrap(), FeatureLayout::full());
        config.layout = "minimal".to_string();
        assert_eq!(config.feature_layout().unwrap(), FeatureLayout::minimal());
        config.layout = "wide".to_string();
        assert!(config.feature_layout().is_err());
    }

    #[test]
    fn test_missing_encoding_file_is_fatal() {
        let config = AgentConfig {
            encoding_config_path: Some(PathBuf::from("/nonexistent/vocab.json")),
            ..AgentConfig::default()
        };
        assert!(config.encoding_config().is_err());
    }
}
