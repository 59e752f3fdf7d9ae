//! Nearest-neighbor lookup over indexed chunks.
//!
//! [`SearchIndex`] is the seam the retrieval loop and the `ask search`
//! command query through. [`SqliteIndex`] is the real implementation:
//! with an embedding provider configured it ranks chunks by cosine
//! similarity to the embedded query; otherwise it falls back to FTS5
//! keyword matching so the chatbot works without an embedding key.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::models::SearchHit;

/// Read-only nearest-neighbor interface over the chunk index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// An empty result is valid (empty index, no matches) and is not an
    /// error.
    async fn similarity_query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// SQLite-backed index over the `chunks` / `chunk_vectors` tables.
pub struct SqliteIndex {
    pool: SqlitePool,
    config: Config,
}

impl SqliteIndex {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::open(&config.db.path).await?;
        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    pub async fn document_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn semantic_query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let provider = embedding::create_provider(&self.config.embedding)?;
        let query_vec = embedding::embed_query(provider.as_ref(), query).await?;

        let rows = sqlx::query(
            r#"
            SELECT cv.embedding, c.text, d.source, d.title
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            JOIN documents d ON d.id = cv.document_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let score = embedding::cosine_similarity(&query_vec, &vec) as f64;
                SearchHit {
                    text: row.get("text"),
                    score,
                    source: row.get("source"),
                    title: row.get("title"),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn keyword_query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let match_expr = fts_match_query(query);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT c.text, d.source, d.title, chunks_fts.rank AS rank
            FROM chunks_fts
            JOIN chunks c ON c.id = chunks_fts.chunk_id
            JOIN documents d ON d.id = chunks_fts.document_id
            WHERE chunks_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let hits: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                SearchHit {
                    text: row.get("text"),
                    // bm25 rank is lower-is-better; negate so higher = better
                    score: -rank,
                    source: row.get("source"),
                    title: row.get("title"),
                }
            })
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl SearchIndex for SqliteIndex {
    async fn similarity_query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if self.config.embedding.is_enabled() {
            self.semantic_query(query, k).await
        } else {
            self.keyword_query(query, k).await
        }
    }
}

/// Turn free-form question text into an FTS5 MATCH expression.
///
/// Raw questions contain punctuation FTS5 treats as syntax, so each term
/// is quoted; terms are OR-joined to favor recall over precision (bm25
/// ranking still rewards chunks matching more terms).
pub fn fts_match_query(query: &str) -> String {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();

    terms.join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fts_query_quotes_and_joins_terms() {
        assert_eq!(
            fts_match_query("How do I install the package?"),
            "\"How\" OR \"do\" OR \"I\" OR \"install\" OR \"the\" OR \"package\""
        );
    }

    #[test]
    fn fts_query_strips_punctuation() {
        assert_eq!(fts_match_query("what's \"new\"?"), "\"what\" OR \"s\" OR \"new\"");
    }

    #[test]
    fn fts_query_empty_input() {
        assert_eq!(fts_match_query("  ?!  "), "");
    }
}
