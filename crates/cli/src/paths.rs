use std::path::{Path, PathBuf};

/// Directory relative config paths are resolved against: the config file's
/// own directory when one was given, else the working directory.
pub fn base_dir(config_path: Option<&str>) -> std::io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let base = config_path
        .map(Path::new)
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| cwd.join(p))
        .unwrap_or(cwd);
    Ok(base)
}

pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
