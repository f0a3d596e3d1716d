use anyhow::Result;
use ingest_core::models::EncodingGuess;
use ingest_core::prober::{CharsetClassifier, ProbeError, Prober};
use ingest_core::scanner::{self, ScanOptions};
use std::io::Write;
use std::path::Path;

/// Scans `dir` and writes one diagnostic block per matching file to `out`.
pub fn detect_dir<C: CharsetClassifier>(
    dir: &Path,
    opts: &ScanOptions,
    prober: &Prober<C>,
    json: bool,
    out: &mut impl Write,
) -> Result<Vec<EncodingGuess>> {
    let guesses = scanner::scan(dir, opts, prober)?;
    if !json {
        writeln!(out, "\nScanning directory: {}\n", dir.display())?;
    }
    write_guesses(guesses, json, out)
}

/// In text mode lines are written as each guess arrives, so a read failure
/// part-way still leaves the earlier lines in `out` before the error
/// propagates.
pub fn write_guesses(
    guesses: impl IntoIterator<Item = Result<EncodingGuess, ProbeError>>,
    json: bool,
    out: &mut impl Write,
) -> Result<Vec<EncodingGuess>> {
    let mut collected = Vec::new();
    for guess in guesses {
        let guess = guess?;
        if !json {
            for line in guess.diagnostic_lines() {
                writeln!(out, "{}", line)?;
            }
        }
        collected.push(guess);
    }
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&collected)?)?;
    }
    Ok(collected)
}
