//! Ingestion pipeline orchestration.
//!
//! Coordinates the full sync flow: connector scan → normalization →
//! chunking → inline embedding (non-fatal on failure) → storage. The
//! index is only written here and by `ask init`; the conversation loop
//! reads it.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::connector::{Connector, ConnectorRegistry};
use crate::db;
use crate::embedding;
use crate::models::{Chunk, SourceItem};

pub async fn run_sync(
    config: &Config,
    selector: &str,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config);
    if registry.is_empty() {
        bail!("No connectors configured. Add a [connectors.*] section to the config file.");
    }

    let selected: Vec<&dyn Connector> = if selector == "all" {
        registry.connectors().iter().map(|c| c.as_ref()).collect()
    } else {
        match registry.find(selector) {
            Some(c) => vec![c],
            None => bail!(
                "Unknown connector: '{}'. Available: all, filesystem, confluence, mantis",
                selector
            ),
        }
    };

    let pool = db::open(&config.db.path).await?;

    for connector in selected {
        let mut items = match connector.scan().await {
            Ok(items) => items,
            Err(e) => {
                // With `all`, one broken source must not block the rest.
                if selector == "all" {
                    error!("Connector {} failed: {}", connector.name(), e);
                    continue;
                }
                pool.close().await;
                return Err(e);
            }
        };

        if let Some(lim) = limit {
            items.truncate(lim);
        }

        if dry_run {
            let total_chunks: usize = items
                .iter()
                .map(|item| {
                    chunk_text(
                        "tmp",
                        &item.body,
                        config.chunking.max_chars,
                        config.chunking.overlap_chars,
                    )
                    .len()
                })
                .sum();
            println!("sync {} (dry-run)", connector.name());
            println!("  items found: {}", items.len());
            println!("  estimated chunks: {}", total_chunks);
            continue;
        }

        let mut docs_upserted = 0u64;
        let mut chunks_written = 0u64;
        let mut items_skipped = 0u64;
        let mut embeddings_written = 0u64;
        let mut embeddings_pending = 0u64;

        for item in &items {
            if !item.is_indexable() {
                warn!(
                    "Skipping item without body or id from {}: '{}'",
                    item.source, item.source_id
                );
                items_skipped += 1;
                continue;
            }

            let doc_id = upsert_document(&pool, item).await?;
            let chunks = chunk_text(
                &doc_id,
                &item.body,
                config.chunking.max_chars,
                config.chunking.overlap_chars,
            );
            let chunk_count = chunks.len() as u64;
            replace_chunks(&pool, &doc_id, &chunks).await?;

            let (emb_ok, emb_pending) = embed_chunks_inline(config, &pool, &chunks).await;
            embeddings_written += emb_ok;
            embeddings_pending += emb_pending;

            docs_upserted += 1;
            chunks_written += chunk_count;
        }

        println!("sync {}", connector.name());
        println!("  fetched: {} items", items.len());
        if items_skipped > 0 {
            println!("  skipped: {} items", items_skipped);
        }
        println!("  upserted documents: {}", docs_upserted);
        println!("  chunks written: {}", chunks_written);
        if config.embedding.is_enabled() {
            println!("  embeddings written: {}", embeddings_written);
            println!("  embeddings pending: {}", embeddings_pending);
        }
    }

    println!("ok");

    pool.close().await;
    Ok(())
}

async fn upsert_document(pool: &SqlitePool, item: &SourceItem) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(item.source.as_bytes());
    hasher.update(item.source_id.as_bytes());
    hasher.update(item.updated_at.timestamp().to_le_bytes());
    hasher.update(item.body.as_bytes());
    let dedup_hash = format!("{:x}", hasher.finalize());

    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM documents WHERE source = ? AND source_id = ?")
            .bind(&item.source)
            .bind(&item.source_id)
            .fetch_optional(pool)
            .await?;

    let doc_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    sqlx::query(
        r#"
        INSERT INTO documents (id, source, source_id, source_url, title, created_at, updated_at, content_type, body, metadata_json, dedup_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(source, source_id) DO UPDATE SET
            source_url = excluded.source_url,
            title = excluded.title,
            updated_at = excluded.updated_at,
            content_type = excluded.content_type,
            body = excluded.body,
            metadata_json = excluded.metadata_json,
            dedup_hash = excluded.dedup_hash
        "#,
    )
    .bind(&doc_id)
    .bind(&item.source)
    .bind(&item.source_id)
    .bind(&item.source_url)
    .bind(&item.title)
    .bind(item.updated_at.timestamp())
    .bind(item.updated_at.timestamp())
    .bind(&item.content_type)
    .bind(&item.body)
    .bind(&item.metadata_json)
    .bind(&dedup_hash)
    .execute(pool)
    .await?;

    Ok(doc_id)
}

async fn replace_chunks(pool: &SqlitePool, document_id: &str, chunks: &[Chunk]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM chunks WHERE document_id = ?)",
    )
    .bind(document_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE document_id = ?)",
    )
    .bind(document_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM chunks_fts WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chunks_fts (chunk_id, document_id, text) VALUES (?, ?, ?)")
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Embed chunks during sync. Non-fatal: failed batches leave their
/// chunks pending instead of aborting the sync.
async fn embed_chunks_inline(config: &Config, pool: &SqlitePool, chunks: &[Chunk]) -> (u64, u64) {
    if !config.embedding.is_enabled() {
        return (0, 0);
    }

    let provider = match embedding::create_provider(&config.embedding) {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not create embedding provider: {}", e);
            return (0, chunks.len() as u64);
        }
    };

    let model_name = provider.model_name().to_string();
    let mut embedded = 0u64;
    let mut pending = 0u64;

    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

        match provider.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vec) in batch.iter().zip(vectors.iter()) {
                    let blob = embedding::vec_to_blob(vec);
                    if let Err(e) = upsert_embedding(
                        pool,
                        &chunk.id,
                        &chunk.document_id,
                        &model_name,
                        provider.dims(),
                        &chunk.hash,
                        &blob,
                    )
                    .await
                    {
                        warn!("Failed to store embedding for {}: {}", chunk.id, e);
                        pending += 1;
                    } else {
                        embedded += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Embedding batch failed: {}", e);
                pending += batch.len() as u64;
            }
        }
    }

    (embedded, pending)
}

async fn upsert_embedding(
    pool: &SqlitePool,
    chunk_id: &str,
    document_id: &str,
    model: &str,
    dims: usize,
    text_hash: &str,
    blob: &[u8],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO embeddings (chunk_id, model, dims, created_at, hash)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(chunk_id) DO UPDATE SET
            model = excluded.model,
            dims = excluded.dims,
            created_at = excluded.created_at,
            hash = excluded.hash
        "#,
    )
    .bind(chunk_id)
    .bind(model)
    .bind(dims as i64)
    .bind(now)
    .bind(text_hash)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO chunk_vectors (chunk_id, document_id, embedding)
        VALUES (?, ?, ?)
        ON CONFLICT(chunk_id) DO UPDATE SET
            document_id = excluded.document_id,
            embedding = excluded.embedding
        "#,
    )
    .bind(chunk_id)
    .bind(document_id)
    .bind(blob)
    .execute(pool)
    .await?;

    Ok(())
}
