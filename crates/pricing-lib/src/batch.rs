//! Batch transcoding of vehicle tables
//!
//! A table goes through encode, predict and decode row by row. The output
//! keeps the input's row order and non-categorical cells, restores
//! categorical cells from their encoded form and appends a price column.
//! Structural problems (missing columns) fail the whole table; value
//! problems are reported per row.

use crate::encoding::EncoderRegistry;
use crate::error::{PricingError, PricingResult};
use crate::layout::{PREDICTION_COLUMN, TARGET_COLUMN};
use crate::models::{ErrorDescriptor, VehicleRecord};
use crate::predictor::{FeatureAssembler, PredictionEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Prefix of the price cell for rows that could not be priced
pub const ROW_ERROR_PREFIX: &str = "ERROR: ";

/// In-memory table of string cells with a header row
///
/// Rows holding bytes that are not UTF-8 are kept with lossy text and
/// remembered by the column of their first bad cell, so they can be
/// reported without aborting the rest of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    undecodable: BTreeMap<usize, String>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            undecodable: BTreeMap::new(),
        }
    }

    /// Parse CSV with a header row; short rows are tolerated
    ///
    /// An unreadable header or broken CSV framing fails the whole table.
    pub fn from_csv(bytes: &[u8]) -> PricingResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PricingError::Table(format!("failed to read headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        let mut undecodable = BTreeMap::new();
        for (i, result) in reader.byte_records().enumerate() {
            let record = result
                .map_err(|e| PricingError::Table(format!("failed to read row {}: {}", i + 1, e)))?;
            match csv::StringRecord::from_byte_record(record) {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(err) => {
                    let field = err.utf8_error().field();
                    let column = headers
                        .get(field)
                        .cloned()
                        .unwrap_or_else(|| format!("column {}", field + 1));
                    debug!(row = i + 1, column = %column, "Row is not valid UTF-8");
                    undecodable.insert(i, column);
                    rows.push(
                        err.into_byte_record()
                            .iter()
                            .map(|cell| String::from_utf8_lossy(cell).into_owned())
                            .collect(),
                    );
                }
            }
        }

        Ok(Self {
            headers,
            rows,
            undecodable,
        })
    }

    pub fn to_csv(&self) -> PricingResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| PricingError::Table(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| PricingError::Table(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| PricingError::Table(e.to_string()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Column holding the first non-UTF-8 cell of a row, if any
    pub fn undecodable_column(&self, row: usize) -> Option<&str> {
        self.undecodable.get(&row).map(String::as_str)
    }

    /// Remove a column if present; returns whether it existed
    ///
    /// Rows whose only bad bytes sat in the dropped column become readable.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.undecodable.retain(|_, column| column.as_str() != name);
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        true
    }
}

/// A row that could not be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based data row number
    pub row: usize,
    pub kind: String,
    pub message: String,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub rows: usize,
    pub priced: usize,
    pub failures: Vec<RowFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub table: Table,
    pub report: BatchReport,
}

/// Runs the single-record pipeline over every row of a table
pub struct BatchTranscoder<'a> {
    assembler: FeatureAssembler<'a>,
    engine: &'a PredictionEngine,
}

impl<'a> BatchTranscoder<'a> {
    pub fn new(assembler: FeatureAssembler<'a>, engine: &'a PredictionEngine) -> Self {
        Self { assembler, engine }
    }

    pub fn process(&self, mut table: Table) -> PricingResult<BatchOutput> {
        if table.drop_column(TARGET_COLUMN) {
            debug!(column = TARGET_COLUMN, "Dropped existing target column");
        }
        // Re-scoring our own output replaces the previous predictions
        table.drop_column(PREDICTION_COLUMN);

        let missing = self.assembler.missing_columns(table.headers());
        if !missing.is_empty() {
            return Err(PricingError::Schema { missing });
        }

        let registry = self.assembler.registry();
        let categorical: Vec<(usize, &'static str)> = self
            .assembler
            .layout()
            .categorical_columns()
            .filter_map(|c| table.column_index(c).map(|idx| (idx, c)))
            .collect();

        let Table {
            mut headers,
            mut rows,
            undecodable,
        } = table;
        let mut report = BatchReport {
            rows: rows.len(),
            ..BatchReport::default()
        };

        for (i, row) in rows.iter_mut().enumerate() {
            row.resize(headers.len(), String::new());
            let record = VehicleRecord::from_row(&headers, row.iter().map(String::as_str));

            let outcome = match undecodable.get(&i) {
                Some(column) => Err(PricingError::validation(column.as_str(), "not valid UTF-8")),
                None => self.assembler.assemble(&record).and_then(|features| {
                    let price = self.engine.predict(&features)?;
                    Ok((features, price))
                }),
            };

            let price_cell = match outcome {
                Ok((features, price)) => {
                    for (column, decoded) in self.assembler.decode(&features)? {
                        if let Some(&(idx, _)) = categorical.iter().find(|(_, c)| *c == column) {
                            row[idx] = decoded.to_string();
                        }
                    }
                    report.priced += 1;
                    price.to_string()
                }
                Err(err) => {
                    round_trip_cells(registry, &categorical, row)?;
                    if let PricingError::Inference(cause) = &err {
                        warn!(row = i + 1, error = %cause, "Batch row inference failed");
                    }
                    let descriptor = ErrorDescriptor::from_error(&err);
                    let cell = format!("{}{}", ROW_ERROR_PREFIX, descriptor.message);
                    report.failures.push(RowFailure {
                        row: i + 1,
                        kind: descriptor.kind,
                        message: descriptor.message,
                    });
                    cell
                }
            };
            row.push(price_cell);
        }

        headers.push(PREDICTION_COLUMN.to_string());
        Ok(BatchOutput {
            table: Table::new(headers, rows),
            report,
        })
    }
}

/// Encode and decode categorical cells of a row that was not priced
fn round_trip_cells(
    registry: &EncoderRegistry,
    categorical: &[(usize, &'static str)],
    row: &mut [String],
) -> PricingResult<()> {
    for &(idx, column) in categorical {
        if row[idx].trim().is_empty() {
            continue;
        }
        let encoded = registry.encode(column, &row[idx])?;
        row[idx] = registry.decode(column, &encoded)?.to_string();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() {
        let csv = b"Year,Mileage,Brand\n2015,50000,Tata\n2018,\"12,000\",Honda\n";
        let table = Table::from_csv(csv).unwrap();
        assert_eq!(table.headers(), &["Year", "Mileage", "Brand"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][1], "12,000");
        assert_eq!(Table::from_csv(&table.to_csv().unwrap()).unwrap(), table);
    }

    #[test]
    fn test_drop_column() {
        let mut table = Table::from_csv(b"Year,Price,Brand\n2015,4.5,Tata\n").unwrap();
        assert!(table.drop_column("Price"));
        assert!(!table.drop_column("Price"));
        assert_eq!(table.headers(), &["Year", "Brand"]);
        assert_eq!(table.rows()[0], vec!["2015", "Tata"]);
    }

    #[test]
    fn test_column_access() {
        let table = Table::from_csv(b"Year,Brand\n2015,Tata\n2016\n").unwrap();
        assert_eq!(table.column("Brand").unwrap(), vec!["Tata", ""]);
        assert!(table.column("Seats").is_none());
    }

    #[test]
    fn test_undecodable_row_is_kept() {
        let mut csv = b"Year,Location,Price\n2015,Pune,4.5\n2016,Pun".to_vec();
        csv.extend_from_slice(b"\xff,5.0\n2017,Kochi,\xfe\n");
        let mut table = Table::from_csv(&csv).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.undecodable_column(0), None);
        assert_eq!(table.undecodable_column(1), Some("Location"));
        assert_eq!(table.undecodable_column(2), Some("Price"));
        assert_eq!(table.rows()[1][1], "Pun\u{fffd}");

        table.drop_column("Price");
        assert_eq!(table.undecodable_column(2), None);
        assert_eq!(table.undecodable_column(1), Some("Location"));
    }

    #[test]
    fn test_undecodable_header_fails_table() {
        let err = Table::from_csv(b"Ye\xffar,Brand\n2015,Tata\n").unwrap_err();
        assert_eq!(err.kind(), "table");
    }

    #[test]
    fn test_headers_trimmed() {
        let table = Table::from_csv(b" Year , Brand\n2015,Tata\n").unwrap();
        assert_eq!(table.column_index("Brand"), Some(1));
    }
}
