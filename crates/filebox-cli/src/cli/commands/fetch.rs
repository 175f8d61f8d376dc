//! `filebox fetch <url>` – download a remote file to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use filebox_core::{FileBox, FileBoxConfig, Headers};
use tokio_util::sync::CancellationToken;

/// Resolve `url`, download it and return the path written. Ctrl-C cancels
/// the transfer and removes the partial file.
pub async fn run_fetch(
    url: &str,
    headers: Headers,
    cfg: Arc<FileBoxConfig>,
    output: Option<&Path>,
    overwrite: bool,
) -> Result<PathBuf> {
    let cancel = CancellationToken::new();
    let fb = FileBox::from_url(url, headers)?
        .with_config(cfg)
        .with_cancel_token(cancel.clone());

    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling download");
            on_interrupt.cancel();
        }
    });

    let result = fb
        .to_file(output, overwrite)
        .await
        .with_context(|| format!("failed to fetch {url}"));
    watcher.abort();
    result
}
