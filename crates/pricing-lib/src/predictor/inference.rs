//! Model artifact formats
//!
//! - ONNX graphs, run with tract. The expected input layout travels in the
//!   graph's `metadata_props` (`schema_version`, `feature_columns`).
//! - JSON linear models, the secondary serialization format.
//!
//! Both expose the same versioned `ModelSchema`. An artifact that cannot
//! describe its inputs is rejected as unsupported.

use super::PriceModel;
use crate::error::LoadError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Schema version this build understands
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Metadata key holding the schema version in ONNX graphs
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Metadata key holding comma-separated feature names in ONNX graphs
pub const FEATURE_COLUMNS_KEY: &str = "feature_columns";

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Inputs a model guarantees to understand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub version: u32,
    pub feature_columns: Vec<String>,
}

impl ModelSchema {
    pub fn new(version: u32, feature_columns: Vec<String>) -> Result<Self, LoadError> {
        if version != SUPPORTED_SCHEMA_VERSION {
            return Err(LoadError::Unsupported(format!(
                "schema version {} (supported: {})",
                version, SUPPORTED_SCHEMA_VERSION
            )));
        }
        if feature_columns.is_empty() {
            return Err(LoadError::Unsupported("schema lists no feature columns".to_string()));
        }
        Ok(Self {
            version,
            feature_columns,
        })
    }

    pub fn width(&self) -> usize {
        self.feature_columns.len()
    }

    /// Check the schema against the layout's expanded feature names
    pub fn ensure_matches(&self, expected: &[String]) -> Result<(), LoadError> {
        if self.feature_columns == expected {
            return Ok(());
        }
        let detail = self
            .feature_columns
            .iter()
            .zip(expected)
            .position(|(a, e)| a != e)
            .map(|i| {
                format!(
                    "(first difference at {}: '{}' vs '{}')",
                    i, self.feature_columns[i], expected[i]
                )
            })
            .unwrap_or_default();
        Err(LoadError::SchemaMismatch {
            expected: expected.len(),
            actual: self.width(),
            detail,
        })
    }
}

/// ONNX-based price model using tract for lightweight inference
pub struct OnnxModel {
    plan: TractModel,
    schema: ModelSchema,
}

impl OnnxModel {
    /// Parse, validate and optimize an ONNX graph
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, LoadError> {
        let onnx = tract_onnx::onnx();
        let proto = onnx
            .proto_model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| LoadError::Parse(format!("{:#}", e)))?;

        let metadata: HashMap<&str, &str> = proto
            .metadata_props
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();
        let schema = schema_from_metadata(&metadata)?;

        let plan = onnx
            .model_for_proto_model(&proto)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, schema.width()]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| LoadError::Parse(format!("{:#}", e)))?;

        Ok(Self { plan, schema })
    }
}

fn schema_from_metadata(metadata: &HashMap<&str, &str>) -> Result<ModelSchema, LoadError> {
    let version = metadata
        .get(SCHEMA_VERSION_KEY)
        .ok_or_else(|| LoadError::Unsupported(format!("graph metadata lacks '{}'", SCHEMA_VERSION_KEY)))?
        .trim()
        .parse::<u32>()
        .map_err(|e| LoadError::Unsupported(format!("bad {}: {}", SCHEMA_VERSION_KEY, e)))?;
    let columns = metadata
        .get(FEATURE_COLUMNS_KEY)
        .ok_or_else(|| LoadError::Unsupported(format!("graph metadata lacks '{}'", FEATURE_COLUMNS_KEY)))?
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    ModelSchema::new(version, columns)
}

impl PriceModel for OnnxModel {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, features.len()), features.to_vec())
            .context("Failed to shape input tensor")?
            .into();

        let result = self.plan.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let values: Vec<f32> = output.to_array_view::<f32>()?.iter().copied().collect();

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(values)
    }

    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn format_name(&self) -> &'static str {
        "onnx"
    }
}

/// Serialized form of a linear model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub schema_version: u32,
    pub feature_columns: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Memoized predictions recorded when the artifact was exported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memo: Vec<MemoEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoEntry {
    pub features: Vec<f32>,
    pub prediction: f32,
}

/// Linear regression model loaded from JSON
#[derive(Debug, Clone)]
pub struct LinearModel {
    schema: ModelSchema,
    intercept: f64,
    coefficients: Vec<f64>,
    memo: Option<HashMap<Vec<u32>, f32>>,
}

impl LinearModel {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let artifact: LinearArtifact =
            serde_json::from_slice(bytes).map_err(|e| LoadError::Parse(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self, LoadError> {
        let schema = ModelSchema::new(artifact.schema_version, artifact.feature_columns)?;
        if artifact.coefficients.len() != schema.width() {
            return Err(LoadError::Parse(format!(
                "{} coefficients for {} feature columns",
                artifact.coefficients.len(),
                schema.width()
            )));
        }

        let memo = if artifact.memo.is_empty() {
            None
        } else {
            Some(
                artifact
                    .memo
                    .into_iter()
                    .map(|entry| (memo_key(&entry.features), entry.prediction))
                    .collect(),
            )
        };

        Ok(Self {
            schema,
            intercept: artifact.intercept,
            coefficients: artifact.coefficients,
            memo,
        })
    }

    pub fn is_memoized(&self) -> bool {
        self.memo.is_some()
    }
}

fn memo_key(features: &[f32]) -> Vec<u32> {
    features.iter().map(|f| f.to_bits()).collect()
}

impl PriceModel for LinearModel {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.coefficients.len() {
            anyhow::bail!(
                "Model expects {} features, got {}",
                self.coefficients.len(),
                features.len()
            );
        }

        if let Some(hit) = self.memo.as_ref().and_then(|m| m.get(&memo_key(features))) {
            return Ok(vec![*hit]);
        }

        let value = self
            .coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (w, x)| acc + w * *x as f64);
        Ok(vec![value as f32])
    }

    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn format_name(&self) -> &'static str {
        "linear-json"
    }

    fn disable_memoization(&mut self) {
        self.memo = None;
    }
}
