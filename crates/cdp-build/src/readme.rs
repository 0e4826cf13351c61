use std::path::{Path, PathBuf};

/// Write a minimal `README.md` unless one exists.
///
/// A freshly created GitHub repository needs at least one file for the
/// first commit. Returns `true` when a file was written.
pub fn write_if_missing(dir: &Path, name: &str, framework: &str) -> Result<bool, ReadmeError> {
    let path = dir.join("README.md");
    if path.exists() {
        return Ok(false);
    }

    std::fs::write(&path, render(name, framework)).map_err(|e| ReadmeError { path, source: e })?;
    Ok(true)
}

pub fn render(name: &str, framework: &str) -> String {
    format!(
        "# {name}\n\n## Framework\n\n{framework}\n\n## Deployment\n\nThis project is deployed to Coolify.\n"
    )
}

#[derive(Debug, thiserror::Error)]
#[error("failed to write {path}")]
pub struct ReadmeError {
    pub path: PathBuf,
    pub source: std::io::Error,
}
