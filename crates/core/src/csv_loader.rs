//! Reads a CSV export into JSON documents, decoding it with the charset the
//! prober picked.

use crate::models::{Document, EncodingGuess};
use crate::prober::{CharsetClassifier, Prober};
use anyhow::Context;
use csv::{ReaderBuilder, Trim};
use encoding_rs::Encoding;
use serde_json::{Number, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Cell values treated as missing, like an empty cell.
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "#N/A"];

#[derive(Debug, Clone)]
pub struct LoadedCsv {
    pub guess: EncodingGuess,
    pub headers: Vec<String>,
    pub documents: Vec<Document>,
}

pub fn load_csv<C: CharsetClassifier>(path: &Path, prober: &Prober<C>) -> anyhow::Result<LoadedCsv> {
    let guess = prober.probe(path)?;
    let encoding = resolve_encoding(&guess.label, prober.fallback());
    let bytes = fs::read(path).with_context(|| format!("Failed to read CSV: {:?}", path))?;
    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        warn!(
            "{:?} contained bytes invalid for {}; replaced with U+FFFD",
            path,
            used.name()
        );
    }
    debug!("Decoded {:?} as {}", path, used.name());

    let (headers, documents) =
        parse_documents(&text).with_context(|| format!("Failed to parse CSV: {:?}", path))?;
    Ok(LoadedCsv {
        guess,
        headers,
        documents,
    })
}

/// Maps a detected label onto a decoder, falling back when the label is not
/// one `encoding_rs` knows.
pub fn resolve_encoding(label: &str, fallback: &str) -> &'static Encoding {
    let normalized = label.trim().to_ascii_lowercase();
    let normalized = normalized.strip_suffix("-sig").unwrap_or(&normalized);
    if let Some(enc) = Encoding::for_label(normalized.as_bytes()) {
        return enc;
    }
    warn!("Unknown encoding label '{}', decoding as '{}'", label, fallback);
    Encoding::for_label(fallback.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
}

pub fn parse_documents(content: &str) -> anyhow::Result<(Vec<String>, Vec<Document>)> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut documents = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", index + 1))?;
        let mut doc = Document::new();
        for (header, raw) in headers.iter().zip(record.iter()) {
            if let Some(value) = type_cell(raw) {
                doc.insert(header.clone(), value);
            }
        }
        documents.push(doc);
    }
    Ok((headers, documents))
}

/// Types a raw cell; `None` means missing.
pub fn type_cell(raw: &str) -> Option<Value> {
    let s = raw.trim();
    if s.is_empty() || MISSING_MARKERS.contains(&s) {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Some(Value::Number(n));
        }
    }
    match s {
        "True" | "true" | "TRUE" => Some(Value::Bool(true)),
        "False" | "false" | "FALSE" => Some(Value::Bool(false)),
        _ => Some(Value::String(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::prober::Classification;
    use serde_json::json;

    struct Fixed(&'static str, f32);

    impl CharsetClassifier for Fixed {
        fn classify(&self, _sample: &[u8]) -> Classification {
            Classification {
                label: Some(self.0.into()),
                confidence: self.1,
            }
        }
    }

    #[test]
    fn cells_are_typed() {
        assert_eq!(type_cell("42"), Some(json!(42)));
        assert_eq!(type_cell("-3.5"), Some(json!(-3.5)));
        assert_eq!(type_cell("True"), Some(json!(true)));
        assert_eq!(type_cell("false"), Some(json!(false)));
        assert_eq!(type_cell(" Music "), Some(json!("Music")));
        assert_eq!(type_cell("17.14.11"), Some(json!("17.14.11")));
        assert_eq!(type_cell(""), None);
        assert_eq!(type_cell("NaN"), None);
    }

    #[test]
    fn empty_cells_are_dropped() {
        let (headers, docs) =
            parse_documents("title,likes,description\nHello,10,\nWorld,,text\n").unwrap();
        assert_eq!(headers, vec!["title", "likes", "description"]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("likes"), Some(&json!(10)));
        assert!(!docs[0].contains_key("description"));
        assert!(!docs[1].contains_key("likes"));
    }

    #[test]
    fn latin1_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DEvideos.csv");
        fs::write(&path, b"title,views\nM\xfcnchen Caf\xe9,12\n").unwrap();
        let prober = Prober::with_classifier(Fixed("ISO-8859-1", 0.2), &ProbeConfig::default());
        let loaded = load_csv(&path, &prober).unwrap();
        assert!(loaded.guess.fell_back);
        assert_eq!(loaded.documents[0].get("title"), Some(&json!("München Café")));
        assert_eq!(loaded.documents[0].get("views"), Some(&json!(12)));
    }

    #[test]
    fn unknown_label_uses_fallback_decoder() {
        assert_eq!(resolve_encoding("klingon-8", "latin1"), encoding_rs::WINDOWS_1252);
        assert_eq!(resolve_encoding("UTF-8-SIG", "latin1"), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("ascii", "latin1"), encoding_rs::WINDOWS_1252);
    }
}
