//! Feature layouts
//!
//! A layout fixes which attributes a deployment accepts, how each one is
//! validated, and the exact order in which assembled features reach the
//! model. Models are trained against one of these orders; reordering a
//! layout silently corrupts predictions, so the orders below are tested.

use crate::encoding::EncoderRegistry;
use crate::error::ConfigError;
use chrono::Datelike;
use serde::Serialize;

/// Earliest accepted model year
pub const MIN_MODEL_YEAR: i64 = 1980;

/// Column holding the model year
pub const YEAR_COLUMN: &str = "Year";

/// Columns accepted as the odometer reading, in preference order
pub const DISTANCE_COLUMNS: [&str; 2] = ["Kilometers_Driven", "Mileage"];

/// Label column dropped from batch input before scoring
pub const TARGET_COLUMN: &str = "Price";

/// Column appended to batch output
pub const PREDICTION_COLUMN: &str = "Predicted_Price";

/// How a column is validated and assembled
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer year between `MIN_MODEL_YEAR` and next calendar year
    ModelYear,
    /// Integer within an inclusive range
    Count { min: i64, max: i64 },
    /// Float >= 0
    NonNegative,
    /// Float > 0
    Positive,
    /// One-hot encoded string
    Categorical,
}

impl ColumnKind {
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::Categorical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

/// Full record layout, in model input order
pub static FULL_COLUMNS: [ColumnSpec; 10] = [
    column("Brand_Model", ColumnKind::Categorical),
    column("Location", ColumnKind::Categorical),
    column("Year", ColumnKind::ModelYear),
    column("Kilometers_Driven", ColumnKind::NonNegative),
    column("Fuel_Type", ColumnKind::Categorical),
    column("Transmission", ColumnKind::Categorical),
    column("Owner_Type", ColumnKind::Categorical),
    column("Engine", ColumnKind::Positive),
    column("Power", ColumnKind::Positive),
    column("Seats", ColumnKind::Count { min: 1, max: 10 }),
];

/// Minimal record layout, in model input order
pub static MINIMAL_COLUMNS: [ColumnSpec; 3] = [
    column("Mileage", ColumnKind::NonNegative),
    column("Year", ColumnKind::ModelYear),
    column("Brand", ColumnKind::Categorical),
];

/// Ordered set of columns a deployment accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureLayout {
    name: &'static str,
    columns: &'static [ColumnSpec],
}

impl FeatureLayout {
    pub fn full() -> Self {
        Self {
            name: "full",
            columns: &FULL_COLUMNS,
        }
    }

    pub fn minimal() -> Self {
        Self {
            name: "minimal",
            columns: &MINIMAL_COLUMNS,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "full" => Ok(Self::full()),
            "minimal" => Ok(Self::minimal()),
            other => Err(ConfigError::UnknownLayout(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        let columns: &'static [ColumnSpec] = self.columns;
        columns.iter().map(|c| c.name)
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &'static str> {
        let columns: &'static [ColumnSpec] = self.columns;
        columns
            .iter()
            .filter(|c| c.kind.is_categorical())
            .map(|c| c.name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name == name && c.kind.is_categorical())
    }

    /// Name of the odometer column this layout uses
    pub fn distance_column(&self) -> Option<&'static str> {
        DISTANCE_COLUMNS
            .iter()
            .copied()
            .find(|d| self.columns.iter().any(|c| c.name == *d))
    }

    /// Ensure the heuristic's two inputs are part of the layout
    pub fn check_heuristic_inputs(&self) -> Result<(), ConfigError> {
        if !self.columns.iter().any(|c| c.name == YEAR_COLUMN) {
            return Err(ConfigError::MissingHeuristicInput {
                layout: self.name.to_string(),
                column: YEAR_COLUMN.to_string(),
            });
        }
        if self.distance_column().is_none() {
            return Err(ConfigError::MissingHeuristicInput {
                layout: self.name.to_string(),
                column: DISTANCE_COLUMNS.join(" or "),
            });
        }
        Ok(())
    }

    /// Expanded model input names, in assembly order
    ///
    /// Numeric columns keep their name; categorical columns expand to one
    /// `<Column>_<value>` entry per fitted category.
    pub fn feature_names(&self, registry: &EncoderRegistry) -> Vec<String> {
        let mut names = Vec::new();
        for spec in self.columns {
            if spec.kind.is_categorical() {
                if let Ok(encoder) = registry.encoder(spec.name) {
                    names.extend(encoder.feature_names());
                }
            } else {
                names.push(spec.name.to_string());
            }
        }
        names
    }
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self::full()
    }
}

/// Latest accepted model year
pub fn max_model_year() -> i64 {
    chrono::Utc::now().year() as i64 + 1
}
