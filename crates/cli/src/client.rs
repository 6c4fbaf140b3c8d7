//! API client for communicating with the pricing agent

use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const PRICED_ROWS_HEADER: &str = "x-priced-rows";
const FAILED_ROWS_HEADER: &str = "x-failed-rows";

/// Errors reported by the agent
#[derive(Debug, Error)]
pub enum ApiError {
    /// The agent understood the request and rejected it
    #[error("{kind} error ({status}): {message}")]
    Rejected {
        status: u16,
        kind: String,
        message: String,
        field: Option<String>,
        missing_columns: Vec<String>,
    },

    #[error("API error ({status}): {body}")]
    Http { status: u16, body: String },
}

/// API client for the pricing agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request, returning the body even for error statuses
    ///
    /// Health endpoints answer 503 with a meaningful JSON body.
    pub async fn get_status<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Price a single record
    pub async fn predict(&self, record: &serde_json::Map<String, serde_json::Value>) -> Result<Prediction> {
        self.post("api/v1/predict", record).await
    }

    /// Upload a CSV table and return the priced table
    pub async fn predict_batch(&self, csv: Vec<u8>) -> Result<BatchResult> {
        let url = self
            .base_url
            .join("api/v1/predict/batch")
            .context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(csv)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        let priced = header_count(&response, PRICED_ROWS_HEADER);
        let failed = header_count(&response, FAILED_ROWS_HEADER);
        let csv = response
            .bytes()
            .await
            .context("Failed to read response body")?
            .to_vec();

        Ok(BatchResult { csv, priced, failed })
    }

    pub async fn model(&self) -> Result<ModelStatus> {
        self.get("api/v1/model").await
    }
}

fn header_count(response: &Response, name: &str) -> usize {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Turn a non-success response into an `ApiError`
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => ApiError::Rejected {
            status,
            kind: parsed.error.kind,
            message: parsed.error.message,
            field: parsed.error.field,
            missing_columns: parsed.missing_columns,
        },
        Err(_) => ApiError::Http { status, body },
    };
    Err(err.into())
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(skip)]
    pub csv: Vec<u8>,
    pub priced: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub model_predictions: u64,
    pub heuristic_predictions: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub source: String,
    pub strategy: String,
    pub layout: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub feature_count: usize,
    #[serde(default)]
    pub stats: EngineStats,
    pub started_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
