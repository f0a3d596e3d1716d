//! Storage layer: a SQLite-backed document store.
//!
//! Documents are JSON objects grouped by collection name. Holds DB pool setup,
//! the migration runner, and batched insert/fetch helpers.

use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, warn};

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub documents: i64,
}

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}", norm);
        }
    }
    let opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut pool_opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        pool_opts = pool_opts.max_connections(1);
    } else {
        pool_opts = pool_opts.max_connections(5);
    }
    let pool = pool_opts.connect_with(opts).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Writes `docs` to `collection` in one transaction.
///
/// Rows the store refuses are reported by index in the outcome and do not
/// stop the batch; everything else is committed together.
pub async fn insert_documents(
    pool: &SqlitePool,
    collection: &str,
    docs: &[Document],
) -> anyhow::Result<BatchOutcome> {
    if collection.trim().is_empty() {
        bail!("collection name must not be empty");
    }
    let mut outcome = BatchOutcome::default();
    let mut tx = pool.begin().await?;

    for (index, doc) in docs.iter().enumerate() {
        if doc.is_empty() {
            outcome.rejected.push(RejectedRow {
                index,
                reason: "empty document".to_string(),
            });
            continue;
        }
        let body = match serde_json::to_string(doc) {
            Ok(b) => b,
            Err(e) => {
                outcome.rejected.push(RejectedRow {
                    index,
                    reason: format!("serialization failed: {}", e),
                });
                continue;
            }
        };
        let res = sqlx::query("INSERT INTO documents (collection, body) VALUES (?1, ?2)")
            .bind(collection)
            .bind(&body)
            .execute(&mut *tx)
            .await;
        match res {
            Ok(_) => outcome.inserted += 1,
            Err(e) => {
                warn!("Row {} rejected for '{}': {}", index, collection, e);
                outcome.rejected.push(RejectedRow {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    tx.commit().await?;
    debug!(
        "Batch into '{}': {} inserted, {} rejected",
        collection,
        outcome.inserted,
        outcome.rejected.len()
    );
    Ok(outcome)
}

/// All documents of a collection in insertion order. Bodies that no longer
/// parse as JSON objects are skipped with a warning.
pub async fn fetch_collection(pool: &SqlitePool, collection: &str) -> anyhow::Result<Vec<Document>> {
    let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")
        .bind(collection)
        .fetch_all(pool)
        .await?;
    let mut docs = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.get(0);
        let body: String = row.get(1);
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => docs.push(map),
            Ok(_) | Err(_) => warn!("Skipping malformed document {} in '{}'", id, collection),
        }
    }
    Ok(docs)
}

pub async fn list_collections(pool: &SqlitePool) -> anyhow::Result<Vec<CollectionStats>> {
    let rows = sqlx::query(
        "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| CollectionStats {
            name: row.get(0),
            documents: row.get(1),
        })
        .collect())
}
