//! Service health derived from the startup-resolved pipeline
//!
//! Two components are reported. `encoders` reflects the fitted categorical
//! vocabularies and `model` reflects which artifact, if any, was resolved.
//! Both read as unhealthy until the pipeline is recorded. A pipeline running
//! on the heuristic reports `model` as degraded, which still serves prices.

use crate::encoding::EncoderRegistry;
use crate::pipeline::PricingPipeline;
use crate::predictor::ModelHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component names reported by `/healthz`
pub mod components {
    pub const ENCODERS: &str = "encoders";
    pub const MODEL: &str = "model";
}

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Prices are still served, but not by the preferred strategy
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn pending() -> Self {
        Self::new(ComponentStatus::Unhealthy, "Awaiting startup")
    }

    /// Health of the fitted encoders
    pub fn for_encoders(registry: &EncoderRegistry) -> Self {
        if registry.is_empty() {
            return Self::new(ComponentStatus::Unhealthy, "No categorical encoders built");
        }
        let categories: usize = registry.iter().map(|e| e.width()).sum();
        Self::new(
            ComponentStatus::Healthy,
            format!("{} columns, {} categories", registry.len(), categories),
        )
    }

    /// Health of the resolved model; no artifact means heuristic pricing
    pub fn for_model(model: &ModelHandle) -> Self {
        match model.model() {
            Some(loaded) => Self::new(
                ComponentStatus::Healthy,
                format!("{} artifact {}", loaded.format_name(), model.version_label()),
            ),
            None => Self::new(
                ComponentStatus::Degraded,
                "No model artifact resolved, serving heuristic prices",
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct HealthState {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
}

/// Shared health view; clones observe the same state
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        let components = [components::ENCODERS, components::MODEL]
            .into_iter()
            .map(|name| (name.to_string(), ComponentHealth::pending()))
            .collect();
        Self {
            state: Arc::new(RwLock::new(HealthState {
                components,
                ready: false,
            })),
        }
    }

    /// Derive component health from a built pipeline
    pub async fn record_pipeline(&self, pipeline: &PricingPipeline) {
        let encoders = ComponentHealth::for_encoders(pipeline.registry());
        let model = ComponentHealth::for_model(pipeline.model());

        let mut state = self.state.write().await;
        state.components.insert(components::ENCODERS.to_string(), encoders);
        state.components.insert(components::MODEL.to_string(), model);
    }

    /// Flip the startup barrier
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse {
            status,
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        if !state.ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let mut failing: Vec<&str> = state
            .components
            .iter()
            .filter(|(_, c)| c.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect();
        if failing.is_empty() {
            return ReadinessResponse {
                ready: true,
                reason: None,
            };
        }
        failing.sort_unstable();
        ReadinessResponse {
            ready: false,
            reason: Some(format!("Unhealthy components: {}", failing.join(", "))),
        }
    }
}
