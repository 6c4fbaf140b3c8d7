//! Price post-processing
//!
//! Converts raw model outputs into the published price scale: lakhs of INR,
//! two decimal places.

use crate::error::{PricingError, PricingResult};

/// Decimal places kept in published prices
pub const PRICE_DECIMALS: i32 = 2;

/// Lowest price a model strategy may return
pub const MODEL_FLOOR: f64 = 0.0;

/// Round to `PRICE_DECIMALS` places
pub fn round_price(value: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (value * scale).round() / scale
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Floor applied to model outputs
    pub model_floor: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_floor: MODEL_FLOOR,
        }
    }
}

/// Formats raw model outputs into published prices
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Take the first model output and bound it
    pub fn format(&self, raw_outputs: &[f32]) -> PricingResult<f64> {
        let first = raw_outputs
            .first()
            .copied()
            .ok_or_else(|| PricingError::Inference("model returned no outputs".to_string()))?;

        if !first.is_finite() {
            return Err(PricingError::Inference(format!(
                "model returned non-finite output {}",
                first
            )));
        }

        Ok(round_price((first as f64).max(self.config.model_floor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(16.499999), 16.5);
        assert_eq!(round_price(3.14159), 3.14);
        assert_eq!(round_price(2.005001), 2.01);
    }

    #[test]
    fn test_takes_first_output() {
        let formatter = OutputFormatter::new();
        assert_eq!(formatter.format(&[7.256, 99.0, 1.0]).unwrap(), 7.26);
    }

    #[test]
    fn test_negative_output_floored() {
        let formatter = OutputFormatter::new();
        assert_eq!(formatter.format(&[-4.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_custom_floor() {
        let formatter = OutputFormatter::with_config(OutputConfig { model_floor: 1.0 });
        assert_eq!(formatter.format(&[0.2]).unwrap(), 1.0);
    }

    #[test]
    fn test_invalid_outputs_rejected() {
        let formatter = OutputFormatter::new();
        assert!(matches!(formatter.format(&[]), Err(PricingError::Inference(_))));
        assert!(matches!(formatter.format(&[f32::NAN]), Err(PricingError::Inference(_))));
        assert!(matches!(formatter.format(&[f32::INFINITY]), Err(PricingError::Inference(_))));
    }
}
