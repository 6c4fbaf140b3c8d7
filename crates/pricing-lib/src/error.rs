//! Error types for the pricing pipeline
//!
//! Request-time failures (`PricingError`) are always converted into a
//! structured `PredictionResult` or batch report before they reach a caller.
//! Only `ConfigError` is allowed to stop the service from starting.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for request-time pipeline operations
pub type PricingResult<T> = std::result::Result<T, PricingError>;

/// Errors raised while pricing a record or a table
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricingError {
    /// A required attribute is missing or malformed
    #[error("invalid field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Required columns are absent from a batch table
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A categorical value could not be encoded or decoded
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The model failed while scoring a feature vector
    #[error("inference failed: {0}")]
    Inference(String),

    /// The batch payload could not be parsed or written as CSV
    #[error("malformed table: {0}")]
    Table(String),
}

impl PricingError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind used in error descriptors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Schema { .. } => "schema",
            Self::Encoding(_) => "encoding",
            Self::Inference(_) => "inference",
            Self::Table(_) => "table",
        }
    }
}

/// Errors from the categorical encoders
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("no encoder registered for column '{0}'")]
    UnknownColumn(String),

    #[error("vector for column '{column}' has width {actual}, expected {expected}")]
    WidthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Failure of a single model loading strategy
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact: {0}")]
    Parse(String),

    #[error("unsupported artifact: {0}")]
    Unsupported(String),

    #[error("artifact expects {actual} features {detail}, layout provides {expected}")]
    SchemaMismatch {
        expected: usize,
        actual: usize,
        detail: String,
    },
}

/// Irrecoverable startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read encoding config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse encoding config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no vocabulary configured for categorical column '{0}'")]
    MissingVocabulary(String),

    #[error("vocabulary for column '{0}' is empty")]
    EmptyVocabulary(String),

    #[error("layout '{layout}' lacks column '{column}' needed by the heuristic")]
    MissingHeuristicInput { layout: String, column: String },

    #[error("unknown feature layout '{0}'")]
    UnknownLayout(String),
}
