//! `filebox info <url>` – show resolved metadata of a remote file.

use std::sync::Arc;

use anyhow::Result;
use filebox_core::downloader::{choose_strategy, Strategy};
use filebox_core::{FileBox, FileBoxConfig, Headers};

pub async fn run_info(url: &str, headers: Headers, cfg: Arc<FileBoxConfig>) -> Result<()> {
    let fb = FileBox::from_url(url, headers)?.with_config(Arc::clone(&cfg));
    fb.ready().await?;
    let Some(remote) = fb.remote() else {
        return Ok(());
    };

    let size = remote
        .content_length
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let strategy = match choose_strategy(remote, &cfg) {
        Strategy::Single => "single GET".to_string(),
        Strategy::Chunked {
            total_size,
            chunk_size,
        } => format!("{} range requests", total_size.div_ceil(chunk_size)),
    };

    println!("{:<14} {}", "handle", fb);
    println!("{:<14} {}", "url", remote.effective_url);
    println!("{:<14} {}", "status", remote.status);
    println!("{:<14} {}", "size", size);
    println!("{:<14} {}", "type", fb.mime_type().unwrap_or("-"));
    println!("{:<14} {}", "ranges", if remote.accept_ranges { "yes" } else { "no" });
    println!("{:<14} {}", "strategy", strategy);
    Ok(())
}
