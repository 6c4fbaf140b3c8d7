//! Feature assembly for price inference
//!
//! Validates a raw `VehicleRecord` against the active layout, coerces numeric
//! attributes, one-hot encodes categorical attributes and concatenates
//! everything in layout order. The same assembler serves single records and
//! batch rows.

use crate::encoding::{DecodedValue, EncoderRegistry};
use crate::error::{PricingError, PricingResult};
use crate::layout::{max_model_year, ColumnKind, FeatureLayout, MIN_MODEL_YEAR, YEAR_COLUMN};
use crate::models::{AttributeValue, VehicleRecord};
use std::ops::Range;

/// Unit suffixes tolerated after numeric values ("1248 CC", "88.7 bhp")
const UNIT_SUFFIXES: &[&str] = &["kmpl", "km/kg", "bhp", "cc", "km"];

/// Slots of the feature vector occupied by one categorical column
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSegment {
    pub column: &'static str,
    pub range: Range<usize>,
}

/// Model-ready features for one record
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// Assembled values in layout order
    pub values: Vec<f32>,
    /// Model year, kept at full precision for the heuristic
    pub year: i64,
    /// Odometer reading in kilometers, kept at full precision for the heuristic
    pub kilometers_driven: f64,
    segments: Vec<CategoricalSegment>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn segments(&self) -> &[CategoricalSegment] {
        &self.segments
    }

    /// Encoded slice for a categorical column
    pub fn categorical(&self, column: &str) -> Option<&[f32]> {
        self.segments
            .iter()
            .find(|s| s.column == column)
            .map(|s| &self.values[s.range.clone()])
    }
}

/// Turns raw records into feature vectors for a fixed layout
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    layout: FeatureLayout,
    registry: &'a EncoderRegistry,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(layout: FeatureLayout, registry: &'a EncoderRegistry) -> Self {
        Self { layout, registry }
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    pub fn registry(&self) -> &'a EncoderRegistry {
        self.registry
    }

    /// Layout columns absent from `headers`, in layout order
    pub fn missing_columns<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        self.layout
            .column_names()
            .filter(|name| !headers.iter().any(|h| h.as_ref() == *name))
            .map(str::to_string)
            .collect()
    }

    pub fn assemble(&self, record: &VehicleRecord) -> PricingResult<FeatureVector> {
        let distance_column = self.layout.distance_column();
        let mut values = Vec::new();
        let mut segments = Vec::new();
        let mut year = None;
        let mut kilometers_driven = None;

        for spec in self.layout.columns() {
            let raw = record
                .get(spec.name)
                .ok_or_else(|| PricingError::validation(spec.name, "missing required field"))?;

            match spec.kind {
                ColumnKind::ModelYear => {
                    let value = coerce_integer(spec.name, raw, MIN_MODEL_YEAR, max_model_year())?;
                    values.push(value as f32);
                    if spec.name == YEAR_COLUMN {
                        year = Some(value);
                    }
                }
                ColumnKind::Count { min, max } => {
                    let value = coerce_integer(spec.name, raw, min, max)?;
                    values.push(value as f32);
                }
                ColumnKind::NonNegative | ColumnKind::Positive => {
                    let value = coerce_float(spec.name, raw)?;
                    let valid = match spec.kind {
                        ColumnKind::Positive => value > 0.0,
                        _ => value >= 0.0,
                    };
                    if !valid {
                        let bound = if spec.kind == ColumnKind::Positive {
                            "greater than 0"
                        } else {
                            "at least 0"
                        };
                        return Err(PricingError::validation(
                            spec.name,
                            format!("{} must be {}", value, bound),
                        ));
                    }
                    values.push(value as f32);
                    if Some(spec.name) == distance_column {
                        kilometers_driven = Some(value);
                    }
                }
                ColumnKind::Categorical => {
                    let text = match raw {
                        AttributeValue::Text(s) => s.trim().to_string(),
                        AttributeValue::Number(n) => n.to_string(),
                        AttributeValue::Unsupported(kind) => {
                            return Err(PricingError::validation(
                                spec.name,
                                format!("expected text, got {}", kind),
                            ));
                        }
                    };
                    if text.is_empty() {
                        return Err(PricingError::validation(spec.name, "must not be empty"));
                    }
                    let encoded = self.registry.encode(spec.name, &text)?;
                    let start = values.len();
                    values.extend(encoded);
                    segments.push(CategoricalSegment {
                        column: spec.name,
                        range: start..values.len(),
                    });
                }
            }
        }

        let year = year.ok_or_else(|| PricingError::validation(YEAR_COLUMN, "missing required field"))?;
        let kilometers_driven = kilometers_driven.ok_or_else(|| {
            PricingError::validation(distance_column.unwrap_or("Kilometers_Driven"), "missing required field")
        })?;

        Ok(FeatureVector {
            values,
            year,
            kilometers_driven,
            segments,
        })
    }

    /// Restore human-readable values for every categorical segment
    pub fn decode(&self, features: &FeatureVector) -> PricingResult<Vec<(&'static str, DecodedValue)>> {
        features
            .segments
            .iter()
            .map(|segment| {
                let decoded = self
                    .registry
                    .decode(segment.column, &features.values[segment.range.clone()])?;
                Ok((segment.column, decoded))
            })
            .collect()
    }
}

fn coerce_float(field: &str, raw: &AttributeValue) -> PricingResult<f64> {
    let value = match raw {
        AttributeValue::Number(n) => *n,
        AttributeValue::Text(s) => parse_number(s)
            .ok_or_else(|| PricingError::validation(field, format!("'{}' is not a number", s.trim())))?,
        AttributeValue::Unsupported(kind) => {
            return Err(PricingError::validation(
                field,
                format!("expected a number, got {}", kind),
            ));
        }
    };
    if !value.is_finite() {
        return Err(PricingError::validation(field, "must be a finite number"));
    }
    Ok(value)
}

fn coerce_integer(field: &str, raw: &AttributeValue, min: i64, max: i64) -> PricingResult<i64> {
    let value = coerce_float(field, raw)?;
    if value.fract() != 0.0 {
        return Err(PricingError::validation(field, format!("{} is not a whole number", value)));
    }
    let value = value as i64;
    if value < min || value > max {
        return Err(PricingError::validation(
            field,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(value)
}

/// Parse a number, tolerating thousands separators and a trailing unit
fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if let Ok(v) = cleaned.parse::<f64>() {
        return Some(v);
    }
    let lower = cleaned.to_ascii_lowercase();
    UNIT_SUFFIXES.iter().find_map(|unit| {
        lower
            .strip_suffix(unit)
            .and_then(|number| number.trim().parse::<f64>().ok())
    })
}
