//! Single-record pricing

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use crate::client::ApiClient;
use crate::output::{color_status, format_price, print_json, print_table, FieldRow, OutputFormat};

/// Parse a `NAME=VALUE` attribute; numeric values are sent as numbers
pub fn parse_attribute(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("Attribute '{}' must look like NAME=VALUE", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Attribute '{}' has an empty name", raw);
    }

    let value = value.trim();
    let parsed = if let Ok(n) = value.parse::<i64>() {
        Value::from(n)
    } else if let Some(n) = value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        Value::Number(n)
    } else {
        Value::String(value.to_string())
    };

    Ok((name.to_string(), parsed))
}

/// Build the request record from a JSON document and attribute overrides
pub fn build_record(json: Option<&str>, file: Option<&Path>, attributes: &[String]) -> Result<Map<String, Value>> {
    let base = match (json, file) {
        (Some(_), Some(_)) => bail!("Use either --json or --file, not both"),
        (Some(text), None) => Some(text.to_string()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let mut record = match base {
        Some(text) => match serde_json::from_str::<Value>(&text).context("Invalid record JSON")? {
            Value::Object(map) => map,
            _ => bail!("Record JSON must be an object"),
        },
        None => Map::new(),
    };

    for raw in attributes {
        let (name, value) = parse_attribute(raw)?;
        record.insert(name, value);
    }

    if record.is_empty() {
        bail!("No attributes given; pass -a NAME=VALUE, --json or --file");
    }
    Ok(record)
}

/// Price one record and print the result
pub async fn predict(client: &ApiClient, record: Map<String, Value>, format: OutputFormat) -> Result<()> {
    let prediction = client.predict(&record).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            let mut rows: Vec<FieldRow> = record
                .iter()
                .map(|(name, value)| {
                    let shown = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    FieldRow::new(name.as_str(), shown)
                })
                .collect();
            if let Some(price) = prediction.price {
                rows.push(FieldRow::new("Predicted price", format_price(price)));
            }
            if let Some(strategy) = &prediction.strategy {
                rows.push(FieldRow::new("Strategy", color_status(strategy)));
            }
            print_table(&rows, format);
        }
    }

    Ok(())
}
