use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::error;
use walkdir::WalkDir;

use crate::config::FilesystemConnectorConfig;
use crate::connector::Connector;
use crate::extract;
use crate::models::SourceItem;

/// Local documentation folder connector.
///
/// Walks the configured root honoring include/exclude globs. `.txt` and
/// `.md` files are read as text, `.pdf` and `.html` go through
/// [`extract`]. Files that fail to load are logged and skipped; the walk
/// continues.
pub struct FilesystemConnector {
    config: FilesystemConnectorConfig,
}

impl FilesystemConnector {
    pub fn new(config: FilesystemConnectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for FilesystemConnector {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "Ingest documentation files from a local folder"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        scan_filesystem(&self.config)
    }
}

pub fn scan_filesystem(fs_config: &FilesystemConnectorConfig) -> Result<Vec<SourceItem>> {
    let root = &fs_config.root;
    if !root.exists() {
        bail!(
            "Filesystem connector root does not exist: {}",
            root.display()
        );
    }

    let include_set = build_globset(&fs_config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(fs_config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut items = Vec::new();

    let walker = WalkDir::new(root).follow_links(fs_config.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!("Error walking {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        match file_to_source_item(path, &rel_str) {
            Ok(item) => items.push(item),
            Err(e) => {
                error!("Error loading file {}: {}", path.display(), e);
            }
        }
    }

    // Sort for deterministic ordering
    items.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    Ok(items)
}

fn file_to_source_item(path: &Path, relative_path: &str) -> Result<SourceItem> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_secs = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let body = load_body(path)?;

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SourceItem {
        source: "filesystem".to_string(),
        source_id: relative_path.to_string(),
        source_url: Some(format!("file://{}", path.display())),
        title: Some(title),
        updated_at: Utc
            .timestamp_opt(modified_secs, 0)
            .single()
            .unwrap_or_else(Utc::now),
        content_type: "text/plain".to_string(),
        body,
        metadata_json: "{}".to_string(),
    })
}

fn load_body(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)?;
            Ok(extract::extract_text(&bytes, extract::MIME_PDF)?)
        }
        "html" | "htm" => {
            let markup = std::fs::read_to_string(path)?;
            Ok(extract::html_to_text(&markup)?)
        }
        _ => Ok(std::fs::read_to_string(path)?),
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemConnectorConfig;
    use std::fs;

    fn fs_config(root: &Path) -> FilesystemConnectorConfig {
        FilesystemConnectorConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.md".to_string(), "**/*.txt".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn scans_matching_files_in_sorted_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.md"), "beta").unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("ignored.rs"), "fn main() {}").unwrap();

        let items = scan_filesystem(&fs_config(tmp.path())).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_id, "a.txt");
        assert_eq!(items[0].body, "alpha");
        assert_eq!(items[1].source_id, "b.md");
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("good.txt"), "fine").unwrap();
        // Invalid UTF-8 makes read_to_string fail for this file only.
        fs::write(tmp.path().join("bad.txt"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let items = scan_filesystem(&fs_config(tmp.path())).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_id, "good.txt");
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gone = tmp.path().join("nope");
        assert!(scan_filesystem(&fs_config(&gone)).is_err());
    }

    #[test]
    fn empty_folder_yields_empty_listing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let items = scan_filesystem(&fs_config(tmp.path())).unwrap();
        assert!(items.is_empty());
    }
}
