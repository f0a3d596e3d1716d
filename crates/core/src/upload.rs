//! Loads configured CSV sources and writes them to the document store.

use crate::categories::{self, CategoryTable};
use crate::config::SourceConfig;
use crate::csv_loader;
use crate::filters::RowFilter;
use crate::models::{RowFailure, UploadReport};
use crate::prober::{CharsetClassifier, Prober};
use anyhow::Context;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of one source in a multi-source run.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Uploaded(UploadReport),
    Failed { collection: String, error: String },
}

pub async fn ingest_source<C: CharsetClassifier>(
    pool: &SqlitePool,
    source: &SourceConfig,
    base_dir: &Path,
    prober: &Prober<C>,
) -> anyhow::Result<UploadReport> {
    let csv_path = resolve(base_dir, &source.csv);
    info!("Loading CSV for '{}': {:?}", source.collection, csv_path);
    let loaded = csv_loader::load_csv(&csv_path, prober)?;
    info!("Columns in {:?}: {:?}", csv_path, loaded.headers);

    let mut docs = loaded.documents;
    if let Some(cat_path) = &source.categories {
        let table: CategoryTable = categories::load_categories(&resolve(base_dir, cat_path))?;
        let matched = categories::merge_categories(&mut docs, &table, &source.category_field);
        info!("Matched {}/{} rows to a category", matched, docs.len());
    }

    let docs = RowFilter::from(&source.filter).apply(docs);
    let attempted = docs.len();

    let outcome = storage::insert_documents(pool, &source.collection, &docs)
        .await
        .with_context(|| format!("Failed to write collection '{}'", source.collection))?;

    let report = UploadReport {
        collection: source.collection.clone(),
        attempted,
        inserted: outcome.inserted,
        failures: outcome
            .rejected
            .into_iter()
            .map(|r| RowFailure {
                row: r.index,
                reason: r.reason,
            })
            .collect(),
    };
    if report.is_clean() {
        info!("Uploaded {} documents to '{}'", report.inserted, report.collection);
    } else {
        warn!(
            "Uploaded {} of {} documents to '{}'",
            report.inserted, report.attempted, report.collection
        );
    }
    Ok(report)
}

/// Runs every source in order. A failing source is recorded and the run
/// moves on to the next one.
pub async fn ingest_all<C: CharsetClassifier>(
    pool: &SqlitePool,
    sources: &[SourceConfig],
    base_dir: &Path,
    prober: &Prober<C>,
) -> Vec<SourceOutcome> {
    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
        match ingest_source(pool, source, base_dir, prober).await {
            Ok(report) => outcomes.push(SourceOutcome::Uploaded(report)),
            Err(e) => {
                error!("Failed to upload {}: {:#}", source.collection, e);
                outcomes.push(SourceOutcome::Failed {
                    collection: source.collection.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }
    outcomes
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        base_dir.join(p)
    }
}
