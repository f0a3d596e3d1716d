use crate::models::Document;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CATEGORY_TITLE_FIELD: &str = "category_title";

/// Category id to title, assignable categories only.
pub type CategoryTable = HashMap<i64, String>;

#[derive(Debug, Deserialize)]
struct CategoryFile {
    #[serde(default)]
    items: Vec<CategoryItem>,
}

#[derive(Debug, Deserialize)]
struct CategoryItem {
    id: Value,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    assignable: bool,
}

pub fn load_categories(path: &Path) -> anyhow::Result<CategoryTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read category file: {:?}", path))?;
    parse_categories(&raw).with_context(|| format!("Invalid category file: {:?}", path))
}

pub fn parse_categories(raw: &str) -> anyhow::Result<CategoryTable> {
    let file: CategoryFile = serde_json::from_str(raw)?;
    let mut table = CategoryTable::new();
    for item in file.items {
        if !item.snippet.assignable {
            continue;
        }
        let id = as_id(&item.id)
            .with_context(|| format!("Category id is not an integer: {}", item.id))?;
        table.insert(id, item.snippet.title);
    }
    debug!("Loaded {} assignable categories", table.len());
    Ok(table)
}

/// Left join: rows with a known category id gain a `category_title` field.
/// Returns how many rows matched.
pub fn merge_categories(docs: &mut [Document], table: &CategoryTable, id_field: &str) -> usize {
    let mut matched = 0;
    for doc in docs.iter_mut() {
        let title = doc
            .get(id_field)
            .and_then(as_id)
            .and_then(|id| table.get(&id));
        if let Some(title) = title {
            doc.insert(CATEGORY_TITLE_FIELD.to_string(), Value::String(title.clone()));
            matched += 1;
        }
    }
    matched
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
