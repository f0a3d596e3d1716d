use crate::config::FilterConfig;
use crate::models::Document;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RowFilter {
    pub title_field: String,
    pub alphabetic_titles_only: bool,
    pub limit: Option<usize>,
}

impl From<&FilterConfig> for RowFilter {
    fn from(cfg: &FilterConfig) -> Self {
        Self {
            title_field: cfg.title_field.clone(),
            alphabetic_titles_only: cfg.alphabetic_titles_only,
            limit: cfg.limit,
        }
    }
}

impl RowFilter {
    /// Keeps rows whose title starts with an ASCII letter (when enabled),
    /// then truncates to `limit`.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter()
            .filter(|d| !self.alphabetic_titles_only || self.title_is_alphabetic(d))
            .take(limit)
            .collect()
    }

    fn title_is_alphabetic(&self, doc: &Document) -> bool {
        let title = match doc.get(&self.title_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => return false,
            Some(other) => other.to_string(),
        };
        title
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(titles: &[Value]) -> Vec<Document> {
        titles
            .iter()
            .map(|t| json!({ "title": t }).as_object().unwrap().clone())
            .collect()
    }

    fn titles(docs: &[Document]) -> Vec<Value> {
        docs.iter().map(|d| d["title"].clone()).collect()
    }

    #[test]
    fn default_filter_keeps_everything() {
        let filter = RowFilter::from(&FilterConfig::default());
        let input = docs(&[json!("ok"), json!("¡hola"), json!(2024)]);
        assert_eq!(filter.apply(input).len(), 3);
    }

    #[test]
    fn alphabetic_titles_then_limit() {
        let filter = RowFilter {
            title_field: "title".into(),
            alphabetic_titles_only: true,
            limit: Some(2),
        };
        let input = docs(&[
            json!("2 Chainz"),
            json!("Zedd"),
            json!("Élodie"),
            json!(404),
            json!("adele"),
            json!("Muse"),
        ]);
        assert_eq!(titles(&filter.apply(input)), vec![json!("Zedd"), json!("adele")]);
    }

    #[test]
    fn rows_without_title_are_dropped_by_title_filter() {
        let filter = RowFilter {
            title_field: "title".into(),
            alphabetic_titles_only: true,
            limit: None,
        };
        let mut input = docs(&[json!("Keep")]);
        input.push(Document::new());
        assert_eq!(filter.apply(input).len(), 1);
    }
}
