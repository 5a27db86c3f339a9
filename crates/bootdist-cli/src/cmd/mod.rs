//! Subcommand implementations

pub mod build;
pub mod chainload;
pub mod classify;
pub mod inspect;
pub mod normalize;

use anyhow::{Context, Result};
use bootdist_schema::DistSpec;
use std::path::Path;

/// Load a dist spec, resolve its paths against the file's directory and
/// validate it.
pub async fn load_spec(path: &Path) -> Result<DistSpec> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dist spec {}", path.display()))?;
    let mut spec = DistSpec::from_toml_str(&content)
        .with_context(|| format!("Invalid dist spec {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let base = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base
    };
    let base = tokio::fs::canonicalize(base)
        .await
        .with_context(|| format!("Failed to resolve {}", base.display()))?;
    spec.resolve_paths(&base);
    spec.validate()
        .with_context(|| format!("Invalid dist spec {}", path.display()))?;
    Ok(spec)
}
