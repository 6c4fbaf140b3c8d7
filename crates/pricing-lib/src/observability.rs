//! Observability infrastructure for the pricing service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/batch counters, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PricingMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PricingMetricsInner {
    prediction_latency_seconds: Histogram,
    batch_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    batch_rows_total: IntCounter,
    batch_failures_total: IntCounter,
    model_info: GaugeVec,
}

impl PricingMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "car_pricing_prediction_latency_seconds",
                "Time spent pricing a single record",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            batch_latency_seconds: register_histogram!(
                "car_pricing_batch_latency_seconds",
                "Time spent transcoding a batch table",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "car_pricing_predictions_total",
                "Total number of prices produced, by strategy",
                &["strategy"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "car_pricing_prediction_errors_total",
                "Total number of failed predictions, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            batch_rows_total: register_int_counter!(
                "car_pricing_batch_rows_total",
                "Total number of batch rows processed"
            )
            .expect("Failed to register batch_rows_total"),

            batch_failures_total: register_int_counter!(
                "car_pricing_batch_failures_total",
                "Total number of batches rejected as structurally invalid"
            )
            .expect("Failed to register batch_failures_total"),

            model_info: register_gauge_vec!(
                "car_pricing_model_info",
                "Information about the resolved price model",
                &["source", "fingerprint"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Pricing metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PricingMetrics {
    _private: (),
}

impl Default for PricingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PricingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PricingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_batch_latency(&self, duration_secs: f64) {
        self.inner().batch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, strategy: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[strategy])
            .inc();
    }

    /// Count predictions made in bulk, e.g. the priced rows of a batch
    pub fn add_predictions(&self, strategy: &str, count: u64) {
        self.inner()
            .predictions_total
            .with_label_values(&[strategy])
            .inc_by(count);
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn add_batch_rows(&self, rows: u64) {
        self.inner().batch_rows_total.inc_by(rows);
    }

    pub fn inc_batch_failures(&self) {
        self.inner().batch_failures_total.inc();
    }

    /// Update model info
    pub fn set_model_info(&self, source: &str, fingerprint: &str) {
        // Reset previous info
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[source, fingerprint])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, batches,
/// and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, layout: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            layout = %layout,
            "Pricing service started"
        );
    }

    /// Log the outcome of model resolution
    pub fn log_model_resolved(&self, source: &str, fingerprint: Option<&str>) {
        if source == "none" {
            warn!(
                event = "model_resolved",
                instance = %self.instance,
                source = %source,
                "No model artifact available, serving heuristic prices"
            );
        } else {
            info!(
                event = "model_resolved",
                instance = %self.instance,
                source = %source,
                fingerprint = fingerprint.unwrap_or(""),
                "Price model resolved"
            );
        }
    }

    /// Log a single prediction
    pub fn log_prediction(&self, price: f64, strategy: &str, latency_us: u64) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            price = price,
            strategy = %strategy,
            latency_us = latency_us,
            "Generated price prediction"
        );
    }

    /// Log a batch run
    pub fn log_batch(&self, rows: usize, priced: usize, failed: usize) {
        if failed > 0 {
            warn!(
                event = "batch_processed",
                instance = %self.instance,
                rows = rows,
                priced = priced,
                failed = failed,
                "Batch processed with row failures"
            );
        } else {
            info!(
                event = "batch_processed",
                instance = %self.instance,
                rows = rows,
                priced = priced,
                failed = failed,
                "Batch processed"
            );
        }
    }

    /// Log a batch rejected for missing columns
    pub fn log_batch_rejected(&self, missing: &[String]) {
        warn!(
            event = "batch_rejected",
            instance = %self.instance,
            missing_columns = %missing.join(","),
            "Batch rejected, required columns missing"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Pricing service shutting down"
        );
    }
}
