//! End-to-end tests for the pricing pipeline
//!
//! Exercise single-record and batch pricing against the built-in
//! vocabulary, with and without a resolved model artifact.

use pricing_lib::predictor::{LinearArtifact, ModelSource};
use pricing_lib::{
    EncoderRegistry, EncodingConfig, FeatureLayout, ModelHandle, ModelPaths, PricingError,
    PricingPipeline, PricingStrategy, Table, VehicleRecord, UNRECOGNIZED_MARKER,
};
use std::path::Path;
use tempfile::TempDir;

const FULL_HEADER: &str =
    "Brand_Model,Location,Year,Kilometers_Driven,Fuel_Type,Transmission,Owner_Type,Engine,Power,Seats";

fn heuristic_pipeline() -> PricingPipeline {
    let layout = FeatureLayout::full();
    let registry = EncoderRegistry::build(&EncodingConfig::builtin(), &layout).unwrap();
    PricingPipeline::new(layout, registry, ModelHandle::none()).unwrap()
}

fn record(year: i64, km: f64) -> VehicleRecord {
    VehicleRecord::new()
        .with("Brand_Model", "Hyundai i20")
        .with("Location", "Mumbai")
        .with("Year", year)
        .with("Kilometers_Driven", km)
        .with("Fuel_Type", "Petrol")
        .with("Transmission", "Manual")
        .with("Owner_Type", "First")
        .with("Engine", 1197.0)
        .with("Power", 81.86)
        .with("Seats", 5_i64)
}

fn price(pipeline: &PricingPipeline, year: i64, km: f64) -> f64 {
    pipeline.predict_one(&record(year, km)).price.unwrap()
}

fn price_column(csv: &[u8]) -> Vec<String> {
    let table = Table::from_csv(csv).unwrap();
    table
        .column("Predicted_Price")
        .unwrap()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn write_linear_artifact(dir: &Path, pipeline: &PricingPipeline) -> std::path::PathBuf {
    let features = pipeline.feature_names();
    let mut coefficients = vec![0.0; features.len()];
    let year_idx = features.iter().position(|f| f == "Year").unwrap();
    coefficients[year_idx] = 0.25;
    let artifact = LinearArtifact {
        schema_version: 1,
        feature_columns: features,
        intercept: -495.0,
        coefficients,
        memo: vec![],
    };
    let path = dir.join("model.json");
    std::fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
    path
}

#[test]
fn test_reference_scenario_is_16_5() {
    let pipeline = heuristic_pipeline();
    let result = pipeline.predict_one(&record(2015, 50_000.0));
    assert_eq!(result.price, Some(16.5));
    assert_eq!(result.strategy, Some(PricingStrategy::Heuristic));
    assert!(result.error.is_none());
}

#[test]
fn test_old_high_mileage_clamped_to_floor() {
    let pipeline = heuristic_pipeline();
    assert_eq!(price(&pipeline, 1990, 500_000.0), 1.0);
}

#[test]
fn test_heuristic_floor_holds() {
    let pipeline = heuristic_pipeline();
    for year in [1980, 1992, 2004, 2016, 2024] {
        for km in [0.0, 75_000.0, 400_000.0, 2_000_000.0] {
            assert!(price(&pipeline, year, km) >= 1.0);
        }
    }
}

#[test]
fn test_heuristic_year_monotonicity() {
    let pipeline = heuristic_pipeline();
    for year in 2000..2020 {
        let delta = price(&pipeline, year + 1, 40_000.0) - price(&pipeline, year, 40_000.0);
        assert!((delta - 0.5).abs() < 1e-9, "year {} delta {}", year, delta);
    }
}

#[test]
fn test_heuristic_distance_monotonicity() {
    let pipeline = heuristic_pipeline();
    for step in 0..30 {
        let km = step as f64 * 10_000.0;
        let delta = price(&pipeline, 2019, km) - price(&pipeline, 2019, km + 10_000.0);
        assert!((delta - 0.2).abs() < 1e-9, "km {} delta {}", km, delta);
    }
}

#[test]
fn test_heuristic_ignores_other_attributes() {
    let pipeline = heuristic_pipeline();
    let base = price(&pipeline, 2017, 30_000.0);
    let other = pipeline
        .predict_one(
            &record(2017, 30_000.0)
                .with("Brand_Model", "Toyota Fortuner")
                .with("Location", "Delhi")
                .with("Engine", 2755.0)
                .with("Seats", 7_i64),
        )
        .price
        .unwrap();
    assert_eq!(base, other);
}

#[test]
fn test_predict_one_idempotent() {
    let pipeline = heuristic_pipeline();
    let r = record(2013, 65_432.0);
    assert_eq!(pipeline.predict_one(&r), pipeline.predict_one(&r));
}

#[test]
fn test_encoding_round_trip_for_vocabulary() {
    let config = EncodingConfig::builtin();
    let layout = FeatureLayout::full();
    let registry = EncoderRegistry::build(&config, &layout).unwrap();
    for column in layout.categorical_columns() {
        for value in config.vocabulary(column).unwrap() {
            let encoded = registry.encode(column, value).unwrap();
            assert_eq!(registry.decode(column, &encoded).unwrap().as_str(), value);
        }
    }
}

#[test]
fn test_single_row_batch_matches_predict_one() {
    let pipeline = heuristic_pipeline();
    let csv = format!(
        "{}\nHyundai i20,Mumbai,2015,50000,Petrol,Manual,First,1197,81.86,5\n",
        FULL_HEADER
    );
    let (output, report) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    assert_eq!(report.rows, 1);
    assert_eq!(report.priced, 1);

    let batch_price: f64 = price_column(&output)[0].parse().unwrap();
    assert_eq!(batch_price, price(&pipeline, 2015, 50_000.0));
}

#[test]
fn test_missing_engine_column_is_schema_error() {
    let pipeline = heuristic_pipeline();
    let csv = "Brand_Model,Location,Year,Kilometers_Driven,Fuel_Type,Transmission,Owner_Type,Power,Seats\n\
               Honda City,Pune,2015,50000,Petrol,Manual,First,117.3,5\n";
    let err = pipeline.predict_batch(csv.as_bytes()).unwrap_err();
    assert_eq!(
        err,
        PricingError::Schema {
            missing: vec!["Engine".to_string()]
        }
    );
}

#[test]
fn test_out_of_vocabulary_row_decodes_to_marker() {
    let pipeline = heuristic_pipeline();
    let csv = format!(
        "{}\nHonda City,Atlantis,2015,50000,Petrol,Manual,First,1497,117.3,5\n\
         Tata Nexon,Pune,2019,20000,Diesel,Manual,First,1497,108.5,5\n",
        FULL_HEADER
    );
    let (output, report) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    assert_eq!(report.priced, 2);
    assert!(report.failures.is_empty());

    let table = Table::from_csv(&output).unwrap();
    assert_eq!(
        table.column("Location").unwrap(),
        vec![UNRECOGNIZED_MARKER, "Pune"]
    );
    assert_eq!(table.column("Brand_Model").unwrap(), vec!["Honda City", "Tata Nexon"]);
}

#[test]
fn test_batch_preserves_order_and_drops_target() {
    let pipeline = heuristic_pipeline();
    let csv = format!(
        "{},Price\n\
         Maruti Swift,Chennai,2012,90000,Petrol,Manual,Second,1197,83.1,5,3.5\n\
         Toyota Innova,Kochi,2018,30000,Diesel,Manual,First,2393,147.8,7,17.2\n\
         Honda Amaze,Jaipur,2016,45000,Diesel,Manual,First,1498,98.6,5,6.1\n",
        FULL_HEADER
    );
    let (output, _) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    let table = Table::from_csv(&output).unwrap();

    assert!(table.column_index("Price").is_none());
    assert_eq!(table.headers().last().unwrap(), "Predicted_Price");
    assert_eq!(table.column("Year").unwrap(), vec!["2012", "2018", "2016"]);
    assert_eq!(table.column("Engine").unwrap(), vec!["1197", "2393", "1498"]);
    assert_eq!(
        price_column(&output),
        vec!["14.2".to_string(), "18.4".to_string(), "17.1".to_string()]
    );
}

#[test]
fn test_bad_row_reported_without_aborting() {
    let pipeline = heuristic_pipeline();
    let csv = format!(
        "{}\nHonda City,Pune,twenty,50000,Petrol,Manual,First,1497,117.3,5\n\
         Honda City,Pune,2015,50000,Petrol,Manual,First,1497,117.3,5\n\
         Honda City,Pune,2015,,Petrol,Manual,First,1497,117.3,5\n",
        FULL_HEADER
    );
    let (output, report) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(report.priced, 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].row, 1);
    assert_eq!(report.failures[0].kind, "validation");
    assert!(report.failures[1].message.contains("Kilometers_Driven"));

    let prices = price_column(&output);
    assert!(prices[0].starts_with("ERROR: "));
    assert_eq!(prices[1], "16.5");
    assert!(prices[2].starts_with("ERROR: "));
}

#[test]
fn test_non_utf8_row_fails_alone() {
    let pipeline = heuristic_pipeline();
    let mut csv = format!(
        "{}\nHyundai i20,Mumbai,2015,50000,Petrol,Manual,First,1197,81.86,5\nHonda City,",
        FULL_HEADER
    )
    .into_bytes();
    csv.extend_from_slice(b"Pun\xff,2015,50000,Petrol,Manual,First,1497,117.3,5\n");

    let (output, report) = pipeline.predict_batch(&csv).unwrap();
    assert_eq!(report.rows, 2);
    assert_eq!(report.priced, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 2);
    assert_eq!(report.failures[0].kind, "validation");
    assert!(report.failures[0].message.contains("Location"));

    let prices = price_column(&output);
    assert_eq!(prices[0], "16.5");
    assert!(prices[1].starts_with("ERROR: "));
}

#[test]
fn test_model_strategy_from_fallback_artifact() {
    let dir = TempDir::new().unwrap();
    let layout = FeatureLayout::full();
    let config = EncodingConfig::builtin();
    let fallback = write_linear_artifact(dir.path(), &heuristic_pipeline());

    let pipeline = PricingPipeline::bootstrap(
        layout,
        &config,
        &ModelPaths {
            primary: Some(dir.path().join("absent.onnx")),
            fallback: Some(fallback),
            default: dir.path().join("absent-default.onnx"),
        },
    )
    .unwrap();

    assert_eq!(pipeline.model().source(), ModelSource::FallbackPickle);
    let result = pipeline.predict_one(&record(2016, 50_000.0));
    // -495 + 0.25 * 2016
    assert_eq!(result.price, Some(9.0));
    assert_eq!(result.strategy, Some(PricingStrategy::Model));

    let csv = format!(
        "{}\nHyundai i20,Mumbai,2016,50000,Petrol,Manual,First,1197,81.86,5\n",
        FULL_HEADER
    );
    let (output, _) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    assert_eq!(price_column(&output), vec!["9".to_string()]);
}

#[test]
fn test_rescoring_output_is_stable() {
    let pipeline = heuristic_pipeline();
    let csv = format!(
        "{}\nHonda City,Pune,2015,50000,Petrol,Manual,First,1497,117.3,5\n",
        FULL_HEADER
    );
    let (first, _) = pipeline.predict_batch(csv.as_bytes()).unwrap();
    let (second, _) = pipeline.predict_batch(&first).unwrap();
    assert_eq!(first, second);
}
