//! Confluence wiki connector.
//!
//! Fetches page content through the Confluence REST API. With configured
//! `page_ids` each page is fetched individually; a failing page is logged
//! and skipped, never aborting the listing. With no `page_ids` the whole
//! space is fetched with paginated requests.
//!
//! Credentials come from the environment: `CONFLUENCE_API_USER` and
//! `CONFLUENCE_API_TOKEN` (HTTP basic auth, the Atlassian token scheme).

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::error;

use crate::config::ConfluenceConnectorConfig;
use crate::connector::Connector;
use crate::extract;
use crate::models::SourceItem;

const USER_ENV: &str = "CONFLUENCE_API_USER";
const TOKEN_ENV: &str = "CONFLUENCE_API_TOKEN";

pub struct ConfluenceConnector {
    config: ConfluenceConnectorConfig,
}

impl ConfluenceConnector {
    pub fn new(config: ConfluenceConnectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for ConfluenceConnector {
    fn name(&self) -> &str {
        "confluence"
    }

    fn description(&self) -> &str {
        "Ingest wiki pages from a Confluence space"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        let auth = credentials()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        if self.config.page_ids.is_empty() {
            fetch_all_pages(&client, &self.config, &auth).await
        } else {
            Ok(fetch_configured_pages(&client, &self.config, &auth).await)
        }
    }
}

struct BasicAuth {
    user: String,
    token: String,
}

fn credentials() -> Result<BasicAuth> {
    let user = match std::env::var(USER_ENV) {
        Ok(v) if !v.is_empty() => v,
        _ => bail!("{} environment variable not set", USER_ENV),
    };
    let token = match std::env::var(TOKEN_ENV) {
        Ok(v) if !v.is_empty() => v,
        _ => bail!("{} environment variable not set", TOKEN_ENV),
    };
    Ok(BasicAuth { user, token })
}

/// Fetch each configured page id. Failing pages are logged and omitted.
async fn fetch_configured_pages(
    client: &reqwest::Client,
    config: &ConfluenceConnectorConfig,
    auth: &BasicAuth,
) -> Vec<SourceItem> {
    let mut items = Vec::new();

    for page_id in &config.page_ids {
        let url = format!(
            "{}/{}?expand=body.storage",
            config.base_url.trim_end_matches('/'),
            page_id
        );

        let response = match client
            .get(&url)
            .basic_auth(&auth.user, Some(&auth.token))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Error fetching Confluence page {}: {}", page_id, e);
                continue;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                "Error fetching Confluence page {}. Status: {}",
                page_id, status
            );
            continue;
        }

        let json: serde_json::Value = match response.json().await {
            Ok(j) => j,
            Err(e) => {
                error!("Invalid JSON for Confluence page {}: {}", page_id, e);
                continue;
            }
        };

        match page_to_item(page_id, &json) {
            Ok(item) => items.push(item),
            Err(e) => error!("Error parsing Confluence page {}: {}", page_id, e),
        }
    }

    items
}

/// Fetch every page in the space via paginated listing requests.
/// A non-200 mid-pagination logs an error and stops the listing, keeping
/// whatever was fetched so far.
async fn fetch_all_pages(
    client: &reqwest::Client,
    config: &ConfluenceConnectorConfig,
    auth: &BasicAuth,
) -> Result<Vec<SourceItem>> {
    let mut items = Vec::new();
    let mut start = 0usize;
    let limit = config.page_limit;

    loop {
        let url = config.base_url.trim_end_matches('/');
        let response = client
            .get(url)
            .basic_auth(&auth.user, Some(&auth.token))
            .query(&[
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("expand", "body.storage".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Error fetching Confluence pages. Status: {}", status);
            break;
        }

        let json: serde_json::Value = response.json().await?;

        let results = json
            .get("results")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        for page in &results {
            let page_id = page
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            match page_to_item(&page_id, page) {
                Ok(item) => items.push(item),
                Err(e) => error!("Error parsing Confluence page {}: {}", page_id, e),
            }
        }

        let has_next = json
            .get("_links")
            .and_then(|l| l.get("next"))
            .is_some();
        if has_next {
            start += limit;
        } else {
            break;
        }
    }

    Ok(items)
}

/// Convert one page JSON object into a [`SourceItem`].
///
/// The page body arrives as Confluence storage-format HTML under
/// `body.storage.value` and is tag-stripped before indexing.
fn page_to_item(page_id: &str, json: &serde_json::Value) -> Result<SourceItem> {
    let storage = json
        .get("body")
        .and_then(|b| b.get("storage"))
        .and_then(|s| s.get("value"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing body.storage.value"))?;

    if page_id.trim().is_empty() {
        bail!("missing page id");
    }

    let body = extract::html_to_text(storage)?;
    let title = json.get("title").and_then(|t| t.as_str()).map(String::from);

    Ok(SourceItem {
        source: "confluence".to_string(),
        source_id: page_id.to_string(),
        source_url: None,
        title,
        updated_at: Utc::now(),
        content_type: "text/plain".to_string(),
        body,
        metadata_json: format!("{{\"page_id\":\"{}\"}}", page_id),
    })
}
