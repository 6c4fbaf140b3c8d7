//! Categorical vocabularies loaded once at startup

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Closed vocabulary per categorical column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub vocabularies: BTreeMap<String, Vec<String>>,
}

impl EncodingConfig {
    /// Load vocabularies from a JSON file of the form
    /// `{"vocabularies": {"Location": ["Mumbai", ...], ...}}`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&content)?;
        let adjusted = config.normalize();
        if adjusted > 0 {
            warn!(
                path = %path.display(),
                entries = adjusted,
                "Trimmed or dropped blank vocabulary entries"
            );
        }
        info!(
            path = %path.display(),
            columns = config.vocabularies.len(),
            "Loaded encoding config"
        );
        Ok(config)
    }

    /// Trim surrounding whitespace and drop blank entries
    ///
    /// Encoders match on trimmed text, so a stored `" Pune"` could never
    /// decode back to itself. Returns how many entries changed.
    pub fn normalize(&mut self) -> usize {
        let mut adjusted = 0;
        for values in self.vocabularies.values_mut() {
            let before = values.len();
            values.retain_mut(|value| {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    adjusted += 1;
                    *value = trimmed.to_string();
                }
                !value.is_empty()
            });
            adjusted += before - values.len();
        }
        adjusted
    }

    pub fn with_column<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabularies
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.vocabularies.get(column).map(Vec::as_slice)
    }

    /// Common values for the Indian used-car market
    pub fn builtin() -> Self {
        Self::default()
            .with_column(
                "Brand_Model",
                [
                    "Maruti Swift",
                    "Maruti Alto",
                    "Maruti Wagon R",
                    "Hyundai i10",
                    "Hyundai i20",
                    "Hyundai Creta",
                    "Honda City",
                    "Honda Amaze",
                    "Toyota Innova",
                    "Toyota Fortuner",
                    "Mahindra XUV500",
                    "Mahindra Scorpio",
                    "Tata Nexon",
                    "Ford EcoSport",
                    "Volkswagen Polo",
                ],
            )
            .with_column(
                "Brand",
                [
                    "Maruti",
                    "Hyundai",
                    "Honda",
                    "Toyota",
                    "Mahindra",
                    "Tata",
                    "Ford",
                    "Volkswagen",
                    "BMW",
                    "Mercedes-Benz",
                    "Audi",
                ],
            )
            .with_column(
                "Location",
                [
                    "Ahmedabad",
                    "Bangalore",
                    "Chennai",
                    "Coimbatore",
                    "Delhi",
                    "Hyderabad",
                    "Jaipur",
                    "Kochi",
                    "Kolkata",
                    "Mumbai",
                    "Pune",
                ],
            )
            .with_column("Fuel_Type", ["CNG", "Diesel", "Electric", "LPG", "Petrol"])
            .with_column("Transmission", ["Automatic", "Manual"])
            .with_column("Owner_Type", ["First", "Second", "Third", "Fourth & Above"])
    }
}
