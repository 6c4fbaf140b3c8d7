//! Model and health status commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthStatus, Readiness};
use crate::output::{
    color_status, format_timestamp, print_json, print_table, FieldRow, OutputFormat,
};

/// Row for the health components table
#[derive(Tabled, serde::Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

/// Show the resolved model
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.model().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            let rows = vec![
                FieldRow::new("Source", status.source.as_str()),
                FieldRow::new("Strategy", color_status(&status.strategy)),
                FieldRow::new("Layout", status.layout.as_str()),
                FieldRow::new("Version", status.version.as_str()),
                FieldRow::new("Fingerprint", status.fingerprint.clone().unwrap_or_else(|| "-".into())),
                FieldRow::new("Artifact", status.path.clone().unwrap_or_else(|| "-".into())),
                FieldRow::new("Features", status.feature_count.to_string()),
                FieldRow::new("Model predictions", status.stats.model_predictions.to_string()),
                FieldRow::new(
                    "Heuristic predictions",
                    status.stats.heuristic_predictions.to_string(),
                ),
                FieldRow::new("Failures", status.stats.failures.to_string()),
                FieldRow::new("Started", format_timestamp(status.started_at)),
            ];
            print_table(&rows, format);
        }
    }

    Ok(())
}

/// Show liveness and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (u16, HealthStatus) = client.get_status("healthz").await?;
    let (_, readiness): (u16, Readiness) = client.get_status("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!(
                "{} {} ({})",
                "Service:".bold(),
                color_status(&health.status),
                color_status(ready)
            );
            if let Some(reason) = &readiness.reason {
                println!("{} {}", "Reason:".bold(), reason);
            }

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                    last_check: format_timestamp(component.last_check_timestamp),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows, format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reads_unready_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_body(
                r#"{"status":"degraded","components":{"model":{"status":"degraded","message":"heuristic","last_check_timestamp":0}}}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_body(r#"{"ready":false,"reason":"Service not yet initialized"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        show_health(&client, OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn test_show_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/model")
            .with_status(200)
            .with_body(
                r#"{"source":"none","strategy":"heuristic","layout":"minimal","version":"none","feature_count":27,"stats":{"model_predictions":0,"heuristic_predictions":4,"failures":1},"started_at":1700000000}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        show_model(&client, OutputFormat::Table).await.unwrap();
    }
}
