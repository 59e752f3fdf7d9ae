//! Mantis issue tracker connector.
//!
//! Fetches issues through the Mantis REST API and turns each one into a
//! document whose body is the issue summary followed by its description.
//! A non-200 listing response is logged and yields an empty result set;
//! malformed issues are skipped individually.
//!
//! The API token comes from the `MANTIS_API_TOKEN` environment variable.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::MantisConnectorConfig;
use crate::connector::Connector;
use crate::models::SourceItem;

const TOKEN_ENV: &str = "MANTIS_API_TOKEN";

pub struct MantisConnector {
    config: MantisConnectorConfig,
}

impl MantisConnector {
    pub fn new(config: MantisConnectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for MantisConnector {
    fn name(&self) -> &str {
        "mantis"
    }

    fn description(&self) -> &str {
        "Ingest issues from a Mantis bug tracker"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        let token = match std::env::var(TOKEN_ENV) {
            Ok(v) if !v.is_empty() => v,
            _ => bail!("{} environment variable not set", TOKEN_ENV),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let url = format!("{}/issues", self.config.base_url.trim_end_matches('/'));
        let response = client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Error fetching Mantis issues. Status: {}", status);
            return Ok(Vec::new());
        }

        let json: serde_json::Value = response.json().await?;
        Ok(issues_to_items(&json))
    }
}

/// Convert the issue listing JSON into source items, skipping entries
/// that lack a summary.
pub fn issues_to_items(json: &serde_json::Value) -> Vec<SourceItem> {
    let issues = match json.as_array() {
        Some(arr) => arr.as_slice(),
        // Some deployments wrap the array in an `issues` field.
        None => match json.get("issues").and_then(|v| v.as_array()) {
            Some(arr) => arr.as_slice(),
            None => {
                warn!("Mantis response is not an issue array");
                return Vec::new();
            }
        },
    };

    let mut items = Vec::new();

    for (position, issue) in issues.iter().enumerate() {
        let summary = match issue.get("summary").and_then(|v| v.as_str()) {
            Some(s) if !s.trim().is_empty() => s,
            _ => {
                warn!("Skipping Mantis issue at position {}: no summary", position);
                continue;
            }
        };
        let description = issue
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let source_id = issue
            .get("id")
            .and_then(|v| v.as_i64())
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("issue-{}", position));

        items.push(SourceItem {
            source: "mantis".to_string(),
            source_id,
            source_url: None,
            title: Some(summary.to_string()),
            updated_at: Utc::now(),
            content_type: "text/plain".to_string(),
            body: format!("{}\n{}", summary, description),
            metadata_json: "{}".to_string(),
        });
    }

    items
}
