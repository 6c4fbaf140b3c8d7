//! Strategy selection and scoring
//!
//! The engine owns the resolved `ModelHandle`. With a model it scores the
//! assembled vector and bounds the first output; without one it falls back
//! to `HeuristicPricer`. Which strategy applies is fixed at construction.

use super::features::FeatureVector;
use super::heuristic::HeuristicPricer;
use super::loader::ModelHandle;
use super::output::OutputFormatter;
use crate::error::{PricingError, PricingResult};
use crate::models::PricingStrategy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Counters for predictions served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub model_predictions: u64,
    pub heuristic_predictions: u64,
    pub failures: u64,
}

pub struct PredictionEngine {
    model: ModelHandle,
    formatter: OutputFormatter,
    model_predictions: AtomicU64,
    heuristic_predictions: AtomicU64,
    failures: AtomicU64,
}

impl PredictionEngine {
    pub fn new(model: ModelHandle) -> Self {
        Self::with_formatter(model, OutputFormatter::new())
    }

    pub fn with_formatter(model: ModelHandle, formatter: OutputFormatter) -> Self {
        Self {
            model,
            formatter,
            model_predictions: AtomicU64::new(0),
            heuristic_predictions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn strategy(&self) -> PricingStrategy {
        if self.model.is_available() {
            PricingStrategy::Model
        } else {
            PricingStrategy::Heuristic
        }
    }

    /// Price one assembled record
    pub fn predict(&self, features: &FeatureVector) -> PricingResult<f64> {
        let Some(model) = self.model.model() else {
            self.heuristic_predictions.fetch_add(1, Ordering::Relaxed);
            return Ok(HeuristicPricer::predict(features));
        };

        let result = self.run_model(model, features);
        match &result {
            Ok(_) => self.model_predictions.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failures.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    fn run_model(
        &self,
        model: &dyn super::PriceModel,
        features: &FeatureVector,
    ) -> PricingResult<f64> {
        let expected = model.schema().width();
        if features.len() != expected {
            return Err(PricingError::Inference(format!(
                "model expects {} features, assembled {}",
                expected,
                features.len()
            )));
        }

        let outputs = model
            .predict(&features.values)
            .map_err(|e| PricingError::Inference(format!("{:#}", e)))?;
        let price = self.formatter.format(&outputs)?;
        debug!(price, format = model.format_name(), "Model prediction");
        Ok(price)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            model_predictions: self.model_predictions.load(Ordering::Relaxed),
            heuristic_predictions: self.heuristic_predictions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
