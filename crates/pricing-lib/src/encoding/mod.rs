//! Categorical encoding subsystem
//!
//! One `CategoricalEncoder` per categorical column of the active layout, fit
//! once at startup. The registry is immutable afterwards and is shared
//! across request handlers without locking.

mod one_hot;
mod vocabulary;

pub use one_hot::{CategoricalEncoder, DecodedValue, UNRECOGNIZED_MARKER};
pub use vocabulary::EncodingConfig;

use crate::error::{ConfigError, EncodingError};
use crate::layout::FeatureLayout;
use std::collections::HashMap;
use tracing::debug;

/// Encoders for every categorical column of a layout
#[derive(Debug, Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<String, CategoricalEncoder>,
}

impl EncoderRegistry {
    /// Fit one encoder per categorical column in `layout`
    ///
    /// Vocabularies for columns outside the layout are ignored.
    pub fn build(config: &EncodingConfig, layout: &FeatureLayout) -> Result<Self, ConfigError> {
        let mut encoders = HashMap::new();

        for column in layout.categorical_columns() {
            let vocabulary = config
                .vocabulary(column)
                .ok_or_else(|| ConfigError::MissingVocabulary(column.to_string()))?;
            let encoder = CategoricalEncoder::fit(column, vocabulary);
            if encoder.width() == 0 {
                return Err(ConfigError::EmptyVocabulary(column.to_string()));
            }
            debug!(column = %column, categories = encoder.width(), "Fitted encoder");
            encoders.insert(column.to_string(), encoder);
        }

        Ok(Self { encoders })
    }

    pub fn encoder(&self, column: &str) -> Result<&CategoricalEncoder, EncodingError> {
        self.encoders
            .get(column)
            .ok_or_else(|| EncodingError::UnknownColumn(column.to_string()))
    }

    pub fn encode(&self, column: &str, value: &str) -> Result<Vec<f32>, EncodingError> {
        Ok(self.encoder(column)?.encode(value))
    }

    pub fn decode(&self, column: &str, vector: &[f32]) -> Result<DecodedValue, EncodingError> {
        self.encoder(column)?.decode(vector)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Iterate encoders in column-name order
    pub fn iter(&self) -> impl Iterator<Item = &CategoricalEncoder> {
        let mut encoders: Vec<_> = self.encoders.values().collect();
        encoders.sort_by(|a, b| a.column().cmp(b.column()));
        encoders.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_registry() -> EncoderRegistry {
        EncoderRegistry::build(&EncodingConfig::builtin(), &FeatureLayout::full()).unwrap()
    }

    #[test]
    fn test_build_fits_layout_columns_only() {
        let registry = full_registry();
        assert_eq!(registry.len(), 5);
        assert!(registry.encoder("Location").is_ok());
        // "Brand" belongs to the minimal layout
        assert!(registry.encoder("Brand").is_err());
    }

    #[test]
    fn test_missing_vocabulary_fails_build() {
        let config = EncodingConfig::default().with_column("Location", ["Pune"]);
        let err = EncoderRegistry::build(&config, &FeatureLayout::full()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVocabulary(_)));
    }

    #[test]
    fn test_empty_vocabulary_fails_build() {
        let config = EncodingConfig::default().with_column("Brand", Vec::<String>::new());
        let err = EncoderRegistry::build(&config, &FeatureLayout::minimal()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyVocabulary(c) if c == "Brand"));
    }

    #[test]
    fn test_round_trip_through_registry() {
        let registry = full_registry();
        let config = EncodingConfig::builtin();
        for column in ["Brand_Model", "Location", "Fuel_Type", "Transmission", "Owner_Type"] {
            for value in config.vocabulary(column).unwrap() {
                let vector = registry.encode(column, value).unwrap();
                let decoded = registry.decode(column, &vector).unwrap();
                assert_eq!(decoded.as_str(), value);
            }
        }
    }

    #[test]
    fn test_unknown_column() {
        let registry = full_registry();
        assert_eq!(
            registry.encode("Colour", "Red").unwrap_err(),
            EncodingError::UnknownColumn("Colour".to_string())
        );
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = std::sync::Arc::new(full_registry());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.encode("Transmission", "Manual").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![0.0, 1.0]);
        }
    }
}
