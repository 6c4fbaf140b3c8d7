//! One-hot encoding for a single categorical column
//!
//! Categories are deduplicated and sorted when the encoder is fit, so the
//! slot order depends only on the vocabulary, not on configuration order.
//! Unknown values encode to an all-zero vector.

use crate::error::EncodingError;
use std::collections::HashMap;
use std::fmt;

/// Marker emitted when a vector does not decode to a fitted category
pub const UNRECOGNIZED_MARKER: &str = "<unrecognized>";

/// Result of decoding a one-hot vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Known(String),
    Unrecognized,
}

impl DecodedValue {
    pub fn as_str(&self) -> &str {
        match self {
            DecodedValue::Known(value) => value,
            DecodedValue::Unrecognized => UNRECOGNIZED_MARKER,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fitted one-hot encoder for one column
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    column: String,
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategoricalEncoder {
    /// Fit over a vocabulary of example values
    ///
    /// Values are trimmed and blanks dropped, the same normalization
    /// `encode` applies to its input.
    pub fn fit<S: AsRef<str>>(column: impl Into<String>, vocabulary: &[S]) -> Self {
        let mut categories: Vec<String> = vocabulary
            .iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        categories.sort();
        categories.dedup();

        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self {
            column: column.into(),
            categories,
            index,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of slots in an encoded vector
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value.trim())
    }

    /// Encode a value; out-of-vocabulary values yield all zeros
    pub fn encode(&self, value: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.width()];
        if let Some(&slot) = self.index.get(value.trim()) {
            vector[slot] = 1.0;
        }
        vector
    }

    /// Inverse of `encode` for vectors this encoder produced
    pub fn decode(&self, vector: &[f32]) -> Result<DecodedValue, EncodingError> {
        if vector.len() != self.width() {
            return Err(EncodingError::WidthMismatch {
                column: self.column.clone(),
                expected: self.width(),
                actual: vector.len(),
            });
        }

        let mut hot = None;
        for (slot, &v) in vector.iter().enumerate() {
            if v == 1.0 {
                if hot.is_some() {
                    return Ok(DecodedValue::Unrecognized);
                }
                hot = Some(slot);
            } else if v != 0.0 {
                return Ok(DecodedValue::Unrecognized);
            }
        }

        Ok(match hot {
            Some(slot) => DecodedValue::Known(self.categories[slot].clone()),
            None => DecodedValue::Unrecognized,
        })
    }

    /// Expanded feature names, one per slot (`<Column>_<value>`)
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}_{}", self.column, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuel_encoder() -> CategoricalEncoder {
        CategoricalEncoder::fit("Fuel_Type", &["Petrol", "Diesel", "CNG", "Diesel"])
    }

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = fuel_encoder();
        assert_eq!(encoder.categories(), &["CNG", "Diesel", "Petrol"]);
        assert_eq!(encoder.width(), 3);
    }

    #[test]
    fn test_encode_known_value() {
        let encoder = fuel_encoder();
        assert_eq!(encoder.encode("Diesel"), vec![0.0, 1.0, 0.0]);
        assert_eq!(encoder.encode("  Petrol "), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_value_encodes_to_zeros() {
        let encoder = fuel_encoder();
        assert_eq!(encoder.encode("Hydrogen"), vec![0.0, 0.0, 0.0]);
        assert!(!encoder.contains("Hydrogen"));
    }

    #[test]
    fn test_round_trip_every_category() {
        let encoder = fuel_encoder();
        for value in encoder.categories() {
            let decoded = encoder.decode(&encoder.encode(value)).unwrap();
            assert_eq!(decoded, DecodedValue::Known(value.clone()));
        }
    }

    #[test]
    fn test_padded_vocabulary_is_normalized() {
        let encoder = CategoricalEncoder::fit("Location", &[" Pune", "Pune", "Kochi "]);
        assert_eq!(encoder.categories(), &["Kochi", "Pune"]);
        assert_eq!(
            encoder.decode(&encoder.encode(" Pune")).unwrap(),
            DecodedValue::Known("Pune".to_string())
        );
    }

    #[test]
    fn test_unknown_decodes_to_marker() {
        let encoder = fuel_encoder();
        let decoded = encoder.decode(&encoder.encode("Hydrogen")).unwrap();
        assert_eq!(decoded, DecodedValue::Unrecognized);
        assert_eq!(decoded.as_str(), UNRECOGNIZED_MARKER);
    }

    #[test]
    fn test_foreign_vectors_are_unrecognized() {
        let encoder = fuel_encoder();
        assert_eq!(encoder.decode(&[1.0, 1.0, 0.0]).unwrap(), DecodedValue::Unrecognized);
        assert_eq!(encoder.decode(&[0.5, 0.0, 0.0]).unwrap(), DecodedValue::Unrecognized);
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let encoder = fuel_encoder();
        let err = encoder.decode(&[1.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::WidthMismatch {
                column: "Fuel_Type".to_string(),
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_feature_names() {
        let names: Vec<String> = fuel_encoder().feature_names().collect();
        assert_eq!(names, vec!["Fuel_Type_CNG", "Fuel_Type_Diesel", "Fuel_Type_Petrol"]);
    }
}
