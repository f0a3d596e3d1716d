use anyhow::{bail, Result};
use ingest_core::config::SourceConfig;
use ingest_core::prober::{CharsetClassifier, Prober};
use ingest_core::upload::{self, SourceOutcome};
use sqlx::SqlitePool;
use std::io::Write;
use std::path::Path;

/// Picks the sources named in `only` (all of them when empty).
pub fn select_sources<'a>(sources: &'a [SourceConfig], only: &[String]) -> Result<Vec<&'a SourceConfig>> {
    if only.is_empty() {
        return Ok(sources.iter().collect());
    }
    let mut picked = Vec::new();
    for name in only {
        match sources.iter().find(|s| &s.collection == name) {
            Some(s) => picked.push(s),
            None => bail!("no source configured for collection '{}'", name),
        }
    }
    Ok(picked)
}

pub async fn run_ingest<C: CharsetClassifier>(
    pool: &SqlitePool,
    sources: &[SourceConfig],
    base_dir: &Path,
    prober: &Prober<C>,
    json: bool,
    out: &mut impl Write,
) -> Result<Vec<SourceOutcome>> {
    let outcomes = upload::ingest_all(pool, sources, base_dir, prober).await;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&outcomes)?)?;
    } else {
        for outcome in &outcomes {
            match outcome {
                SourceOutcome::Uploaded(report) => {
                    writeln!(
                        out,
                        "✅ Uploaded {} of {} documents to '{}'",
                        report.inserted, report.attempted, report.collection
                    )?;
                    for failure in &report.failures {
                        writeln!(out, "   row {}: {}", failure.row, failure.reason)?;
                    }
                }
                SourceOutcome::Failed { collection, error } => {
                    writeln!(out, "❌ Failed to upload {}: {}", collection, error)?;
                }
            }
        }
    }
    Ok(outcomes)
}

pub fn failed_count(outcomes: &[SourceOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| matches!(o, SourceOutcome::Failed { .. }))
        .count()
}
