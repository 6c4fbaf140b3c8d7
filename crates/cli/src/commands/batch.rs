//! Batch pricing of CSV files

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::client::ApiClient;
use crate::output::{print_json, print_success, print_warning, OutputFormat};

/// Default output path: `<stem>_priced.csv` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch".to_string());
    input.with_file_name(format!("{}_priced.csv", stem))
}

/// Upload a CSV file and write the priced table
///
/// `output` of `-` writes the table to stdout.
pub async fn price_file(
    client: &ApiClient,
    input: &Path,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let csv = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let result = client.predict_batch(csv).await?;

    let output = output.unwrap_or_else(|| default_output_path(input));
    if output.as_os_str() == "-" {
        std::io::stdout()
            .write_all(&result.csv)
            .context("Failed to write to stdout")?;
    } else {
        std::fs::write(&output, &result.csv)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    match format {
        OutputFormat::Json => {
            if output.as_os_str() != "-" {
                print_json(&result)?;
            }
        }
        OutputFormat::Table => {
            if output.as_os_str() != "-" {
                print_success(&format!(
                    "Priced {} rows, wrote {}",
                    result.priced,
                    output.display()
                ));
            }
            if result.failed > 0 {
                print_warning(&format!(
                    "{} rows could not be priced; see the ERROR cells in Predicted_Price",
                    result.failed
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/cars.csv")),
            PathBuf::from("/data/cars_priced.csv")
        );
        assert_eq!(
            default_output_path(Path::new("listings")),
            PathBuf::from("listings_priced.csv")
        );
    }

    #[tokio::test]
    async fn test_price_file_writes_output() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/predict/batch")
            .with_status(200)
            .with_header("x-priced-rows", "1")
            .with_header("x-failed-rows", "0")
            .with_body("Mileage,Year,Brand,Predicted_Price\n18.9,2015,Maruti,16.5\n")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let input = dir.path().join("cars.csv");
        std::fs::write(&input, "Mileage,Year,Brand\n18.9,2015,Maruti\n").unwrap();

        let client = ApiClient::new(&server.url()).unwrap();
        price_file(&client, &input, None, OutputFormat::Table)
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("cars_priced.csv")).unwrap();
        assert!(written.ends_with("16.5\n"));
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let client = ApiClient::new("http://localhost:1").unwrap();
        let err = price_file(&client, Path::new("/nonexistent.csv"), None, OutputFormat::Table)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
