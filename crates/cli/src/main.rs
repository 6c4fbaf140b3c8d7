//! Used Car Price Estimator CLI
//!
//! A command-line client for the pricing agent: price single records,
//! price CSV files, and inspect the resolved model and service health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, predict, status};
use std::path::PathBuf;

/// Used Car Price Estimator CLI
#[derive(Parser)]
#[command(name = "carprice")]
#[command(author, version, about = "CLI for the Used Car Price Estimator", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CARPRICE_API_URL env var)
    #[arg(long, env = "CARPRICE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Price a single vehicle
    Predict {
        /// Attribute as NAME=VALUE (repeatable), e.g. -a Year=2015
        #[arg(long = "attr", short = 'a')]
        attributes: Vec<String>,

        /// Record as a JSON object
        #[arg(long)]
        json: Option<String>,

        /// Path to a JSON file holding the record
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Price every row of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output CSV path (`-` for stdout, defaults to <input>_priced.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the resolved price model
    Model,

    /// Show service health and readiness
    Health,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::parse)
        })
        .unwrap_or_default();

    let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;

    match cli.command {
        Commands::Predict {
            attributes,
            json,
            file,
        } => {
            let record = predict::build_record(json.as_deref(), file.as_deref(), &attributes)?;
            predict::predict(&client, record, format).await?;
        }
        Commands::Batch { input, output } => {
            batch::price_file(&client, &input, output, format).await?;
        }
        Commands::Model => {
            status::show_model(&client, format).await?;
        }
        Commands::Health => {
            status::show_health(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<client::ApiError>() {
            Some(client::ApiError::Rejected {
                missing_columns, field, ..
            }) => {
                output::print_error(&err.to_string());
                if let Some(field) = field {
                    output::print_info(&format!("Check the value given for '{}'", field));
                }
                if !missing_columns.is_empty() {
                    output::print_info(&format!(
                        "Add these columns to the CSV header: {}",
                        missing_columns.join(", ")
                    ));
                }
            }
            _ => output::print_error(&format!("{:#}", err)),
        }
        std::process::exit(1);
    }
}
