//! Core data models for the pricing service

use crate::error::PricingError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value as submitted by a caller
///
/// Form and CSV input arrive as text; JSON input may carry numbers directly.
/// JSON values that are neither (booleans, arrays, objects) are kept as
/// `Unsupported` with their type name so validation can reject them by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    #[serde(skip_deserializing)]
    Unsupported(String),
}

impl AttributeValue {
    /// Convert a JSON value; `null` means the attribute is absent
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Number(n) => Some(AttributeValue::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Some(AttributeValue::Text(s)),
            Value::Bool(_) => Some(AttributeValue::Unsupported("a boolean".to_string())),
            Value::Array(_) => Some(AttributeValue::Unsupported("an array".to_string())),
            Value::Object(_) => Some(AttributeValue::Unsupported("an object".to_string())),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

/// Raw vehicle attributes keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VehicleRecord {
    fields: BTreeMap<String, AttributeValue>,
}

impl<'de> Deserialize<'de> for VehicleRecord {
    /// Accepts any JSON object; `null` fields are dropped
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .filter_map(|(name, value)| AttributeValue::from_json(value).map(|v| (name, v)))
            .collect();
        Ok(Self { fields })
    }
}

impl VehicleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from one CSV row; blank cells count as absent
    pub fn from_row<'a>(headers: &[String], values: impl IntoIterator<Item = &'a str>) -> Self {
        let fields = headers
            .iter()
            .zip(values)
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| (name.clone(), AttributeValue::from(value)))
            .collect();
        Self { fields }
    }
}

/// Which strategy produced a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingStrategy {
    Model,
    Heuristic,
}

impl PricingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingStrategy::Model => "model",
            PricingStrategy::Heuristic => "heuristic",
        }
    }
}

/// Structured, caller-facing error description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDescriptor {
    /// Describe an error for a caller
    ///
    /// Inference failures are reported generically; the cause stays in logs.
    pub fn from_error(err: &PricingError) -> Self {
        let field = match err {
            PricingError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        let message = match err {
            PricingError::Inference(_) => "prediction failed".to_string(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind().to_string(),
            message,
            field,
        }
    }
}

/// Outcome of a single-record prediction
///
/// `price` is present exactly when `error` is absent. Prices are in lakhs of
/// INR, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<PricingStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl PredictionResult {
    pub fn priced(price: f64, strategy: PricingStrategy) -> Self {
        Self {
            price: Some(price),
            strategy: Some(strategy),
            error: None,
        }
    }

    pub fn failed(err: &PricingError) -> Self {
        Self {
            price: None,
            strategy: None,
            error: Some(ErrorDescriptor::from_error(err)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
