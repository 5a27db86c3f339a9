//! Inspect command

use anyhow::{Context, Result};
use bootdist_core::ArchiveReader;
use crossterm::style::Stylize;
use std::path::Path;

use crate::ui::theme::format_size;

/// List an archive's entries with size, timestamp and digest.
pub async fn inspect(path: &Path, json: bool) -> Result<()> {
    let owned = path.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || {
        ArchiveReader::open(&owned).and_then(|mut reader| reader.entries())
    })
    .await
    .context("Inspect task panicked")?
    .with_context(|| format!("Failed to read archive {}", path.display()))?;

    if json {
        let rows: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "size": e.size,
                    "modified": e.modified,
                    "blake3": e.digest.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in &entries {
        println!(
            "{:<width$}  {:>10}  {}  {}",
            entry.name,
            format_size(entry.size),
            entry.modified.as_deref().unwrap_or("-").dark_grey(),
            entry.digest.short().dark_grey()
        );
    }
    println!(
        "{}",
        format!("{} entries", entries.len()).dark_grey()
    );
    Ok(())
}
