use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A JSON document built from one CSV row.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingGuess {
    pub path: PathBuf,
    /// Label to decode with. Never empty.
    pub label: String,
    /// Raw classifier answer, before any fallback.
    pub detected: Option<String>,
    pub confidence: f32,
    pub fell_back: bool,
}

impl EncodingGuess {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Human-readable report: the detection line, then a warning line if the
    /// fallback label was substituted.
    pub fn diagnostic_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} → {} (confidence: {:?})",
            self.file_name(),
            self.detected.as_deref().unwrap_or("None"),
            self.confidence
        )];
        if self.fell_back {
            lines.push(format!(
                "⚠️  Low confidence in detection. Falling back to '{}'",
                self.label
            ));
        }
        lines
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    pub collection: String,
    pub attempted: usize,
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(detected: Option<&str>, label: &str, confidence: f32, fell_back: bool) -> EncodingGuess {
        EncodingGuess {
            path: PathBuf::from("data/USvideos.csv"),
            label: label.to_string(),
            detected: detected.map(str::to_string),
            confidence,
            fell_back,
        }
    }

    #[test]
    fn confident_guess_prints_one_line() {
        let lines = guess(Some("utf-8"), "utf-8", 0.99, false).diagnostic_lines();
        assert_eq!(lines, vec!["USvideos.csv → utf-8 (confidence: 0.99)".to_string()]);
    }

    #[test]
    fn whole_confidence_keeps_decimal_point() {
        let lines = guess(Some("ascii"), "ascii", 1.0, false).diagnostic_lines();
        assert_eq!(lines[0], "USvideos.csv → ascii (confidence: 1.0)");
    }

    #[test]
    fn fallback_adds_warning_line() {
        let lines = guess(None, "latin1", 0.0, true).diagnostic_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "USvideos.csv → None (confidence: 0.0)");
        assert!(lines[1].contains("Falling back to 'latin1'"));
    }
}
