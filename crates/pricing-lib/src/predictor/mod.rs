//! Price prediction engine
//!
//! Feature assembly, model resolution and the two pricing strategies
//! (loaded model or closed-form heuristic).

mod engine;
mod features;
mod heuristic;
mod inference;
mod loader;
mod output;

pub use engine::{EngineStats, PredictionEngine};
pub use features::{CategoricalSegment, FeatureAssembler, FeatureVector};
pub use heuristic::{HeuristicPricer, HEURISTIC_FLOOR};
pub use inference::{
    LinearArtifact, LinearModel, MemoEntry, ModelSchema, OnnxModel, SUPPORTED_SCHEMA_VERSION,
};
pub use loader::{
    resolve, ArtifactDecoder, LoadStrategy, ModelHandle, ModelLoader, ModelPaths, ModelSource,
    DEFAULT_MODEL_PATH,
};
pub use output::{round_price, OutputConfig, OutputFormatter, PRICE_DECIMALS};

use anyhow::Result;

/// Trait for loaded price model implementations
pub trait PriceModel: Send + Sync {
    /// Run inference on one assembled feature vector
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>>;

    /// Inputs the model was built against
    fn schema(&self) -> &ModelSchema;

    /// Artifact format, for logs
    fn format_name(&self) -> &'static str;

    /// Drop any result cache carried by the artifact
    fn disable_memoization(&mut self) {}
}
