//! Pricing pipeline state
//!
//! `PricingPipeline` bundles everything resolved at startup (layout, fitted
//! encoders, resolved model) behind `&self` methods. Build it once before
//! accepting traffic and share it by reference; nothing in it is mutated
//! afterwards apart from statistics counters.

use crate::batch::{BatchOutput, BatchReport, BatchTranscoder, Table};
use crate::encoding::{EncoderRegistry, EncodingConfig};
use crate::error::{ConfigError, PricingError, PricingResult};
use crate::layout::FeatureLayout;
use crate::models::{PredictionResult, PricingStrategy, VehicleRecord};
use crate::predictor::{
    EngineStats, FeatureAssembler, ModelHandle, ModelLoader, ModelPaths, PredictionEngine,
};
use tracing::{debug, error, info};

pub struct PricingPipeline {
    layout: FeatureLayout,
    registry: EncoderRegistry,
    engine: PredictionEngine,
}

impl PricingPipeline {
    /// Assemble a pipeline from already-resolved parts
    pub fn new(
        layout: FeatureLayout,
        registry: EncoderRegistry,
        model: ModelHandle,
    ) -> Result<Self, ConfigError> {
        layout.check_heuristic_inputs()?;
        Ok(Self {
            layout,
            registry,
            engine: PredictionEngine::new(model),
        })
    }

    /// Fit encoders and resolve the model
    ///
    /// Encoder failures are fatal. Model failures are not: the pipeline
    /// falls back to heuristic pricing.
    pub fn bootstrap(
        layout: FeatureLayout,
        encoding: &EncodingConfig,
        paths: &ModelPaths,
    ) -> Result<Self, ConfigError> {
        layout.check_heuristic_inputs()?;
        let registry = EncoderRegistry::build(encoding, &layout)?;
        let model = ModelLoader::new(paths)
            .with_expected_features(layout.feature_names(&registry))
            .resolve();

        info!(
            layout = layout.name(),
            encoders = registry.len(),
            model_source = %model.source(),
            "Pricing pipeline initialized"
        );
        Self::new(layout, registry, model)
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    pub fn model(&self) -> &ModelHandle {
        self.engine.model()
    }

    pub fn strategy(&self) -> PricingStrategy {
        self.engine.strategy()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn assembler(&self) -> FeatureAssembler<'_> {
        FeatureAssembler::new(self.layout, &self.registry)
    }

    /// Expanded model input names for the active layout
    pub fn feature_names(&self) -> Vec<String> {
        self.layout.feature_names(&self.registry)
    }

    /// Price one record, propagating the typed error
    pub fn try_predict_one(&self, record: &VehicleRecord) -> PricingResult<f64> {
        let features = self.assembler().assemble(record)?;
        self.engine.predict(&features)
    }

    /// Price one record; failures become an error descriptor
    pub fn predict_one(&self, record: &VehicleRecord) -> PredictionResult {
        match self.try_predict_one(record) {
            Ok(price) => PredictionResult::priced(price, self.strategy()),
            Err(err) => {
                match &err {
                    PricingError::Inference(cause) => error!(error = %cause, "Prediction failed"),
                    other => debug!(error = %other, "Rejected prediction request"),
                }
                PredictionResult::failed(&err)
            }
        }
    }

    /// Run the batch transcoder over an in-memory table
    pub fn process_table(&self, table: Table) -> PricingResult<BatchOutput> {
        BatchTranscoder::new(self.assembler(), &self.engine).process(table)
    }

    /// CSV in, CSV out
    ///
    /// Nothing is produced when the table is structurally invalid.
    pub fn predict_batch(&self, csv: &[u8]) -> PricingResult<(Vec<u8>, BatchReport)> {
        let table = Table::from_csv(csv)?;
        let output = self.process_table(table)?;
        let bytes = output.table.to_csv()?;
        info!(
            rows = output.report.rows,
            priced = output.report.priced,
            failed = output.report.failures.len(),
            "Batch processed"
        );
        Ok((bytes, output.report))
    }
}

impl std::fmt::Debug for PricingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingPipeline")
            .field("layout", &self.layout.name())
            .field("encoders", &self.registry.len())
            .field("model", self.engine.model())
            .field("stats", &self.engine.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{ModelSource, DEFAULT_MODEL_PATH};
    use tempfile::TempDir;

    fn heuristic_pipeline() -> PricingPipeline {
        let layout = FeatureLayout::full();
        let registry = EncoderRegistry::build(&EncodingConfig::builtin(), &layout).unwrap();
        PricingPipeline::new(layout, registry, ModelHandle::none()).unwrap()
    }

    fn record(year: i64, km: f64) -> VehicleRecord {
        VehicleRecord::new()
            .with("Brand_Model", "Maruti Swift")
            .with("Location", "Kochi")
            .with("Year", year)
            .with("Kilometers_Driven", km)
            .with("Fuel_Type", "Diesel")
            .with("Transmission", "Manual")
            .with("Owner_Type", "Second")
            .with("Engine", 1248.0)
            .with("Power", 74.0)
            .with("Seats", 5_i64)
    }

    #[test]
    fn test_predict_one_heuristic() {
        let pipeline = heuristic_pipeline();
        let result = pipeline.predict_one(&record(2015, 50_000.0));
        assert_eq!(result, PredictionResult::priced(16.5, PricingStrategy::Heuristic));
    }

    #[test]
    fn test_predict_one_clamped() {
        let pipeline = heuristic_pipeline();
        assert_eq!(pipeline.predict_one(&record(1990, 500_000.0)).price, Some(1.0));
    }

    #[test]
    fn test_predict_one_validation_error() {
        let pipeline = heuristic_pipeline();
        let result = pipeline.predict_one(&record(2015, 50_000.0).with("Seats", "many"));
        let error = result.error.unwrap();
        assert_eq!(error.kind, "validation");
        assert_eq!(error.field.as_deref(), Some("Seats"));
        assert!(result.price.is_none());
    }

    #[test]
    fn test_bootstrap_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let paths = ModelPaths {
            primary: Some(dir.path().join("model.onnx")),
            fallback: Some(dir.path().join("model.json")),
            default: dir.path().join(DEFAULT_MODEL_PATH),
        };
        let pipeline =
            PricingPipeline::bootstrap(FeatureLayout::minimal(), &EncodingConfig::builtin(), &paths)
                .unwrap();
        assert_eq!(pipeline.model().source(), ModelSource::None);
        assert_eq!(pipeline.strategy(), PricingStrategy::Heuristic);
    }

    #[test]
    fn test_bootstrap_fails_without_vocabulary() {
        let err = PricingPipeline::bootstrap(
            FeatureLayout::full(),
            &EncodingConfig::default(),
            &ModelPaths::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVocabulary(_)));
    }
}
