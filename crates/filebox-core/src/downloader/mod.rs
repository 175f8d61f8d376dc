//! Remote body acquisition.
//!
//! Given a resolved [`RemoteDescriptor`], picks between a single GET and the
//! chunked range downloader and returns the body as one ordered
//! [`ByteStream`]. Range requests are sent to the effective URL, so a
//! redirect to another host is resolved once and every chunk goes there.

mod chunk;
mod chunked;
mod single;

pub use chunked::{download_chunked, ChunkedRequest};
pub use single::download_single;

use crate::config::FileBoxConfig;
use crate::error::Result;
use crate::fetch::{FetchOptions, Headers};
use crate::fetch_head::RemoteDescriptor;
use crate::stream::ByteStream;

/// How a remote body will be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Single,
    Chunked { total_size: u64, chunk_size: u64 },
}

/// Chunked when slicing is enabled, the server accepts byte ranges and the
/// resource is larger than one chunk; single GET otherwise.
pub fn choose_strategy(descriptor: &RemoteDescriptor, cfg: &FileBoxConfig) -> Strategy {
    let chunk_size = cfg.chunk_size.max(1);
    match descriptor.content_length {
        Some(total_size)
            if !cfg.no_slice_down
                && (200..300).contains(&descriptor.status)
                && descriptor.supports_slicing(chunk_size) =>
        {
            Strategy::Chunked {
                total_size,
                chunk_size,
            }
        }
        _ => Strategy::Single,
    }
}

/// Open the body of a resolved remote resource.
pub async fn open_remote_stream(
    descriptor: &RemoteDescriptor,
    headers: &Headers,
    cfg: &FileBoxConfig,
    opts: &FetchOptions,
) -> Result<ByteStream> {
    let strategy = choose_strategy(descriptor, cfg);
    tracing::info!(url = %descriptor.effective_url, ?strategy, "opening remote stream");
    match strategy {
        Strategy::Single => download_single(&descriptor.effective_url, headers, opts).await,
        Strategy::Chunked {
            total_size,
            chunk_size,
        } => Ok(download_chunked(
            ChunkedRequest {
                url: descriptor.effective_url.clone(),
                headers: headers.clone(),
                total_size,
                chunk_size,
                concurrency: cfg.chunk_concurrency(),
                retry: cfg.retry_policy(),
            },
            opts.clone(),
        )),
    }
}
