//! `filebox json <path>` and `filebox restore <record>` – the portable form.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use filebox_core::{FileBox, FileBoxConfig};

/// Read `path` into memory and return its JSON record. Local-file handles
/// are bound to this machine, so the bytes travel as a buffer record.
pub async fn run_json(path: &Path, name: Option<&str>) -> Result<String> {
    let local = FileBox::from_file(path);
    let bytes = local
        .to_buffer()
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let fb = FileBox::from_buffer(bytes, name.unwrap_or(local.name()));
    Ok(fb.to_json()?)
}

pub async fn run_restore(
    record: &Path,
    cfg: Arc<FileBoxConfig>,
    output: Option<&Path>,
    overwrite: bool,
) -> Result<PathBuf> {
    let json = tokio::fs::read_to_string(record)
        .await
        .with_context(|| format!("failed to read {}", record.display()))?;
    let fb = FileBox::from_json(&json, None)?.with_config(cfg);
    tracing::debug!(handle = %fb, "restoring");
    Ok(fb.to_file(output, overwrite).await?)
}
