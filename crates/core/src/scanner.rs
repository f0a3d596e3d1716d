//! Walks one directory level and probes every file with the configured
//! extension. Probing is lazy: nothing is read until the iterator is pulled.

use crate::config::ScanConfig;
use crate::models::EncodingGuess;
use crate::prober::{CharsetClassifier, ProbeError, Prober};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),
    #[error("invalid exclude pattern: {0}")]
    BadPattern(#[from] globset::Error),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extension: String,
    pub exclude: Vec<String>,
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            extension: cfg.extension.clone(),
            exclude: cfg.exclude.clone(),
            include_hidden: cfg.include_hidden,
        }
    }
}

/// Lazily yields one guess per matching file in `dir`.
pub fn scan<'p, C: CharsetClassifier + 'p>(
    dir: &Path,
    opts: &ScanOptions,
    prober: &'p Prober<C>,
) -> Result<impl Iterator<Item = Result<EncodingGuess, ProbeError>> + 'p, ScanError> {
    let paths = matching_files(dir, opts)?;
    Ok(paths.map(move |path| prober.probe(&path?)))
}

/// Lazily yields the paths `scan` would probe. Any non-directory entry whose
/// name carries the extension is yielded, dangling symlinks included, so the
/// read failure surfaces when it is probed. Errors listing the directory are
/// yielded as items.
pub fn matching_files(
    dir: &Path,
    opts: &ScanOptions,
) -> Result<impl Iterator<Item = Result<PathBuf, ProbeError>>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
    }
    info!("Scanning directory: {:?}", dir);
    let exclude_set = build_globset(&opts.exclude)?;
    let extension = opts.extension.clone();
    let include_hidden = opts.include_hidden;
    let root = dir.to_path_buf();

    let iter = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(e) => {
                let path = e.into_path();
                let wanted = !path.is_dir()
                    && has_extension(&path, &extension)
                    && (include_hidden || !is_hidden(&path))
                    && !exclude_set.is_match(&path);
                wanted.then_some(Ok(path))
            }
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                Some(Err(ProbeError::Unreadable {
                    path,
                    source: err.into(),
                }))
            }
        });
    Ok(iter)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(extension))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::prober::Classification;
    use std::fs;

    struct Ascii;

    impl CharsetClassifier for Ascii {
        fn classify(&self, _sample: &[u8]) -> Classification {
            Classification {
                label: Some("ascii".into()),
                confidence: 1.0,
            }
        }
    }

    fn prober() -> Prober<Ascii> {
        Prober::with_classifier(Ascii, &ProbeConfig::default())
    }

    #[test]
    fn yields_one_guess_per_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("USvideos.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("CAvideos.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("US_category_id.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.csv.bak"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();
        fs::write(dir.path().join("nested.csv").join("deep.csv"), "x").unwrap();

        let prober = prober();
        let mut names: Vec<String> = scan(dir.path(), &ScanOptions::default(), &prober)
            .unwrap()
            .map(|g| g.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, vec!["CAvideos.csv", "USvideos.csv"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "hi").unwrap();
        let prober = prober();
        let count = scan(dir.path(), &ScanOptions::default(), &prober)
            .unwrap()
            .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prober = prober();
        let err = scan(&dir.path().join("absent"), &ScanOptions::default(), &prober)
            .err()
            .unwrap();
        assert!(matches!(err, ScanError::DirectoryNotFound(_)));
    }

    #[test]
    fn custom_extension_hidden_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tsv"), "x").unwrap();
        fs::write(dir.path().join("b.tsv"), "x").unwrap();
        fs::write(dir.path().join(".c.tsv"), "x").unwrap();
        fs::write(dir.path().join("d.csv"), "x").unwrap();
        let opts = ScanOptions {
            extension: ".tsv".into(),
            exclude: vec!["**/b.tsv".into()],
            include_hidden: false,
        };
        let found: Vec<PathBuf> = matching_files(dir.path(), &opts)
            .unwrap()
            .map(|p| p.unwrap())
            .collect();
        assert_eq!(found, vec![dir.path().join("a.tsv")]);
    }

    #[test]
    fn hidden_files_are_included_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".x.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("visible.csv"), "a\n1\n").unwrap();

        let prober = prober();
        let mut names: Vec<String> = scan(dir.path(), &ScanOptions::default(), &prober)
            .unwrap()
            .map(|g| g.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, vec![".x.csv", "visible.csv"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_surfaces_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.csv"), dir.path().join("USvideos.csv"))
            .unwrap();

        let prober = prober();
        let results: Vec<_> = scan(dir.path(), &ScanOptions::default(), &prober)
            .unwrap()
            .collect();
        assert_eq!(results.len(), 1);
        let err = results.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_still_match() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.csv");
        if fs::write(dir.path().join(name), "a\n1\n").is_err() {
            // Filesystem rejects non-UTF-8 names.
            return;
        }
        let count = matching_files(dir.path(), &ScanOptions::default())
            .unwrap()
            .filter(|p| p.is_ok())
            .count();
        assert_eq!(count, 1);
    }
}
