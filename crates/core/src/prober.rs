//! Charset detection over a bounded prefix of a file.
//!
//! The classifier is statistical and may answer with no label or a low
//! confidence; in both cases the configured fallback label is substituted
//! while the reported confidence is kept as-is.

use crate::config::ProbeConfig;
use crate::models::EncodingGuess;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_FALLBACK: &str = "latin1";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            ProbeError::Unreadable { source, .. } => source.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Option<String>,
    pub confidence: f32,
}

pub trait CharsetClassifier {
    fn classify(&self, sample: &[u8]) -> Classification;
}

/// Byte-frequency classifier backed by the `chardet` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChardetClassifier;

impl CharsetClassifier for ChardetClassifier {
    fn classify(&self, sample: &[u8]) -> Classification {
        let (charset, confidence, _language) = chardet::detect(&sample.to_vec());
        let label = Some(charset.trim().to_string()).filter(|c| !c.is_empty());
        Classification { label, confidence }
    }
}

#[derive(Debug, Clone)]
pub struct Prober<C = ChardetClassifier> {
    classifier: C,
    sample_bytes: usize,
    min_confidence: f32,
    fallback: String,
}

impl Prober<ChardetClassifier> {
    pub fn new() -> Self {
        Self::from_config(&ProbeConfig::default())
    }

    pub fn from_config(cfg: &ProbeConfig) -> Self {
        Self::with_classifier(ChardetClassifier, cfg)
    }
}

impl Default for Prober<ChardetClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CharsetClassifier> Prober<C> {
    pub fn with_classifier(classifier: C, cfg: &ProbeConfig) -> Self {
        let fallback = if cfg.fallback.trim().is_empty() {
            DEFAULT_FALLBACK.to_string()
        } else {
            cfg.fallback.trim().to_string()
        };
        Self {
            classifier,
            sample_bytes: cfg.sample_bytes,
            min_confidence: cfg.min_confidence,
            fallback,
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn probe(&self, path: &Path) -> Result<EncodingGuess, ProbeError> {
        let sample = read_sample(path, self.sample_bytes).map_err(|source| {
            ProbeError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let guess = self.probe_sample(path, &sample);
        let lines = guess.diagnostic_lines();
        info!("{}", lines[0]);
        if guess.fell_back {
            warn!(file = %guess.file_name(), "low confidence, using '{}'", guess.label);
        }
        Ok(guess)
    }

    /// Applies the confidence policy to an already-read sample.
    pub fn probe_sample(&self, path: &Path, sample: &[u8]) -> EncodingGuess {
        let Classification { label, confidence } = self.classifier.classify(sample);
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        let (chosen, fell_back) = match &label {
            Some(l) if confidence >= self.min_confidence => (l.clone(), false),
            _ => (self.fallback.clone(), true),
        };
        EncodingGuess {
            path: path.to_path_buf(),
            label: chosen,
            detected: label,
            confidence,
            fell_back,
        }
    }
}

fn read_sample(path: &Path, limit: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
