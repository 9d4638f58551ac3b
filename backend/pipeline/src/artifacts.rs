//! Stage artifacts on disk: OCR JSON and the summary Markdown.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Write `value` as pretty JSON, creating parent directories.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize artifact")?;
    write_text(path, &json).await
}

pub async fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path).await?;
    fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub async fn read_summary(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read summary: {}", path.display()))
}
