//! Pricing agent - used-car price estimation service
//!
//! Resolves encoders and the price model once at startup, then serves
//! single-record and batch pricing over HTTP.

use anyhow::{Context, Result};
use pricing_agent::{api, config::AgentConfig};
use pricing_lib::{
    health::HealthRegistry,
    PricingMetrics, PricingPipeline, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pricing-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        layout = %config.layout,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = PricingMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Everything below must finish before the first request is accepted
    let layout = config.feature_layout()?;
    let encoding = config.encoding_config()?;
    let paths = config.model_paths();
    let pipeline = tokio::task::spawn_blocking(move || {
        PricingPipeline::bootstrap(layout, &encoding, &paths)
    })
    .await?
    .context("Failed to initialize pricing pipeline")?;

    let model = pipeline.model();
    logger.log_model_resolved(model.source().as_str(), model.fingerprint());
    metrics.set_model_info(model.source().as_str(), model.fingerprint().unwrap_or(""));
    health_registry.record_pipeline(&pipeline).await;

    logger.log_startup(AGENT_VERSION, layout.name());

    let app_state = Arc::new(api::AppState::new(
        Arc::new(pipeline),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        config.max_batch_bytes,
        app_state,
    ));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            logger.log_shutdown("API server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
