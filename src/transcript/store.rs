use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Filename-safe ISO-8601 timestamp: colons and periods become hyphens.
pub fn timestamp_slug(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Write the transcript to `transcript-<timestamp>.txt` under `dir`.
pub fn save_transcript(dir: &Path, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    let path = dir.join(format!("transcript-{}.txt", timestamp_slug(Utc::now())));
    fs::write(&path, text)
        .with_context(|| format!("failed to write transcript: {}", path.display()))?;

    info!("Saved transcript to {}", path.display());
    Ok(path)
}

/// Place the transcript on the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("failed to access clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("failed to copy transcript to clipboard")?;
    Ok(())
}
