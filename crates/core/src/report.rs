//! Aggregates over uploaded documents: the numbers behind the trending
//! dashboard.

use crate::models::Document;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

pub const REGION_FIELD: &str = "region";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub collections: Vec<String>,
    pub documents: usize,
    pub top_liked: Vec<Ranked>,
    pub dislikes_by_category: Vec<Ranked>,
    pub ratings_disabled: Vec<Ranked>,
    pub top_viewed: Vec<Ranked>,
    pub views_by_region: Vec<Ranked>,
}

pub async fn build_report(
    pool: &SqlitePool,
    collections: &[String],
    top_n: usize,
) -> anyhow::Result<Report> {
    let mut all = Vec::new();
    for collection in collections {
        let mut docs = storage::fetch_collection(pool, collection).await?;
        info!("Fetched {} documents from '{}'", docs.len(), collection);
        let region = region_of(collection);
        for doc in docs.iter_mut() {
            doc.insert(REGION_FIELD.to_string(), Value::String(region.clone()));
        }
        all.extend(docs);
    }
    let mut report = aggregate(&all, top_n);
    report.collections = collections.to_vec();
    Ok(report)
}

pub fn aggregate(docs: &[Document], top_n: usize) -> Report {
    let mut top_liked = sum_by(docs, "title", "likes");
    top_liked.truncate(top_n);
    let mut top_viewed = sum_by(docs, "title", "views");
    top_viewed.truncate(top_n);
    let mut ratings_disabled = count_by(docs, "title", |d| is_true(d.get("ratings_disabled")));
    ratings_disabled.truncate(top_n);

    Report {
        generated_at: Utc::now().to_rfc3339(),
        collections: Vec::new(),
        documents: docs.len(),
        top_liked,
        dislikes_by_category: sum_by(docs, "category_id", "dislikes"),
        ratings_disabled,
        top_viewed,
        views_by_region: sum_by(docs, REGION_FIELD, "views"),
    }
}

/// `USvideos` -> `us`.
pub fn region_of(collection: &str) -> String {
    collection.chars().take(2).collect::<String>().to_lowercase()
}

/// Sums `value_field` per distinct `key_field`, highest first. Rows without
/// a key are ignored; missing or non-numeric values count as zero.
pub fn sum_by(docs: &[Document], key_field: &str, value_field: &str) -> Vec<Ranked> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for doc in docs {
        let Some(key) = doc.get(key_field).and_then(key_of) else {
            continue;
        };
        *totals.entry(key).or_default() += doc.get(value_field).and_then(number_of).unwrap_or(0.0);
    }
    ranked(totals)
}

pub fn count_by(docs: &[Document], key_field: &str, pred: impl Fn(&Document) -> bool) -> Vec<Ranked> {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for doc in docs.iter().filter(|d| pred(d)) {
        if let Some(key) = doc.get(key_field).and_then(key_of) {
            *counts.entry(key).or_default() += 1.0;
        }
    }
    ranked(counts)
}

fn ranked(totals: HashMap<String, f64>) -> Vec<Ranked> {
    let mut out: Vec<Ranked> = totals
        .into_iter()
        .map(|(key, value)| Ranked { key, value })
        .collect();
    out.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    out
}

fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, title: &str, rows: &[Ranked]) -> fmt::Result {
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))?;
    if rows.is_empty() {
        writeln!(f, "  (no data)")?;
    }
    for row in rows {
        writeln!(f, "  {:>14}  {}", fmt_value(row.value), row.key)?;
    }
    writeln!(f)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trending report: {} documents from [{}]\n",
            self.documents,
            self.collections.join(", ")
        )?;
        write_table(f, "Top liked videos", &self.top_liked)?;
        write_table(f, "Dislikes by category", &self.dislikes_by_category)?;
        write_table(f, "Ratings disabled (top videos)", &self.ratings_disabled)?;
        write_table(f, "Top viewed videos", &self.top_viewed)?;
        write_table(f, "Views by region", &self.views_by_region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().unwrap().clone()
    }

    fn sample() -> Vec<Document> {
        vec![
            doc(json!({"title": "A", "likes": 10, "dislikes": 1, "views": 100, "category_id": 10, "region": "us"})),
            doc(json!({"title": "A", "likes": 5, "dislikes": 2, "views": 50, "category_id": 10, "region": "ca", "ratings_disabled": true})),
            doc(json!({"title": "B", "likes": "7", "views": 500, "category_id": 24, "region": "ca", "ratings_disabled": "True"})),
            doc(json!({"title": "C", "likes": 15, "dislikes": 4, "views": 20, "category_id": 24, "region": "de", "ratings_disabled": false})),
            doc(json!({"likes": 1000, "views": 1, "region": "in"})),
        ]
    }

    fn pairs(rows: &[Ranked]) -> Vec<(&str, f64)> {
        rows.iter().map(|r| (r.key.as_str(), r.value)).collect()
    }

    #[test]
    fn sums_rank_descending_and_truncate() {
        let report = aggregate(&sample(), 2);
        assert_eq!(pairs(&report.top_liked), vec![("A", 15.0), ("C", 15.0)]);
        assert_eq!(pairs(&report.top_viewed), vec![("B", 500.0), ("A", 150.0)]);
        assert_eq!(report.documents, 5);
    }

    #[test]
    fn untruncated_breakdowns() {
        let report = aggregate(&sample(), 1);
        assert_eq!(pairs(&report.dislikes_by_category), vec![("24", 4.0), ("10", 3.0)]);
        assert_eq!(
            pairs(&report.views_by_region),
            vec![("ca", 550.0), ("us", 100.0), ("de", 20.0), ("in", 1.0)]
        );
    }

    #[test]
    fn ratings_disabled_counts_true_rows() {
        let report = aggregate(&sample(), 10);
        assert_eq!(pairs(&report.ratings_disabled), vec![("A", 1.0), ("B", 1.0)]);
    }

    #[test]
    fn region_is_lowercased_prefix() {
        assert_eq!(region_of("USvideos"), "us");
        assert_eq!(region_of("D"), "d");
    }

    #[test]
    fn text_rendering_lists_every_table() {
        let text = aggregate(&sample(), 3).to_string();
        assert!(text.contains("Top liked videos"));
        assert!(text.contains("Views by region"));
        assert!(text.contains("550  ca"));
    }
}
