//! Document source connectors.
//!
//! A [`Connector`] scans one external source (local files, a Confluence
//! wiki, a Mantis issue tracker) and returns [`SourceItem`]s for the
//! ingest pipeline. Per-item failures inside a scan are logged and
//! skipped; a single bad item never aborts the whole listing.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::connector_confluence::ConfluenceConnector;
use crate::connector_fs::FilesystemConnector;
use crate::connector_mantis::MantisConnector;
use crate::models::SourceItem;

/// A data source that produces documents for ingestion.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector name used as the source label and `ask sync` selector
    /// (e.g. `"filesystem"`, `"confluence"`, `"mantis"`).
    fn name(&self) -> &str;

    /// One-line description shown by `ask sources`.
    fn description(&self) -> &str;

    /// Scan the source and return all items to ingest.
    ///
    /// May perform blocking-style awaited I/O (HTTP requests, file
    /// reads). Items that fail individually are skipped with an error
    /// log; the scan only errors when the source is unusable as a whole.
    async fn scan(&self) -> Result<Vec<SourceItem>>;
}

/// Registry of all connectors configured in the TOML file.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut connectors: Vec<Box<dyn Connector>> = Vec::new();

        if let Some(fs_config) = &config.connectors.filesystem {
            connectors.push(Box::new(FilesystemConnector::new(fs_config.clone())));
        }
        if let Some(cf_config) = &config.connectors.confluence {
            connectors.push(Box::new(ConfluenceConnector::new(cf_config.clone())));
        }
        if let Some(mt_config) = &config.connectors.mantis {
            connectors.push(Box::new(MantisConnector::new(mt_config.clone())));
        }

        Self { connectors }
    }

    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    pub fn find(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
