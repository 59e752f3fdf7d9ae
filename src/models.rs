//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, and search hits that flow
//! through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};

/// Raw item produced by a connector before normalization.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub source: String,
    pub source_id: String,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub content_type: String,
    pub body: String,
    pub metadata_json: String,
}

impl SourceItem {
    /// Items without a body or source id cannot be indexed; the ingest
    /// pipeline skips them with a warning.
    pub fn is_indexable(&self) -> bool {
        !self.body.trim().is_empty() && !self.source_id.trim().is_empty()
    }
}

/// Normalized document stored in SQLite.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub source_id: String,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub content_type: String,
    pub body: String,
    pub metadata_json: String,
    pub dedup_hash: String,
}

/// A chunk of a document's body text.
///
/// Invariant: `text` never exceeds the configured maximum chunk size, and
/// consecutive chunks of the same document overlap by the configured
/// number of characters.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A ranked hit returned by the search index.
///
/// Ephemeral: produced per query and folded into the combined context
/// string by the retrieval loop.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub score: f64,
    pub source: String,
    pub title: Option<String>,
}
