//! Pricing library for used-car resale estimates
//!
//! This crate provides the core functionality for:
//! - Categorical encoding of vehicle attributes
//! - Model resolution with an ordered fallback chain
//! - Feature assembly and price prediction (model or heuristic)
//! - Batch transcoding of CSV tables
//! - Health checks and observability

pub mod batch;
pub mod encoding;
pub mod error;
pub mod health;
pub mod layout;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;

pub use batch::{BatchOutput, BatchReport, BatchTranscoder, RowFailure, Table};
pub use encoding::{EncoderRegistry, EncodingConfig, UNRECOGNIZED_MARKER};
pub use error::{ConfigError, EncodingError, LoadError, PricingError, PricingResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use layout::FeatureLayout;
pub use models::*;
pub use observability::{PricingMetrics, StructuredLogger};
pub use pipeline::PricingPipeline;
pub use predictor::{ModelHandle, ModelPaths, ModelSource};
