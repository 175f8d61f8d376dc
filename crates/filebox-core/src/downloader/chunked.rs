//! Chunked range download: N range GETs reassembled into one ordered stream.
//!
//! A driver task keeps up to `concurrency` chunk requests in flight through a
//! `FuturesOrdered`, which yields results in submission (= chunk index) order
//! no matter which request finishes first. Each finished chunk is handed to
//! the consumer over a one-slot channel, so at most `concurrency + 1` chunks
//! are ever held in memory and no new request is issued while the consumer is
//! not reading.

use bytes::Bytes;
use futures_util::stream::FuturesOrdered;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::chunk::download_one_chunk;
use crate::error::{FileBoxError, Result};
use crate::fetch::{FetchOptions, Headers};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::segmenter::{ChunkPlan, ChunkRange};
use crate::stream::ByteStream;

/// What to download and how to split it.
#[derive(Debug, Clone)]
pub struct ChunkedRequest {
    /// Effective URL of the resource (after redirects).
    pub url: String,
    pub headers: Headers,
    pub total_size: u64,
    pub chunk_size: u64,
    /// Chunk requests in flight at once (at least 1).
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

type ChunkOutcome = (ChunkRange, std::result::Result<Bytes, (u32, FileBoxError)>);

/// Start the chunked download and return its output stream.
///
/// The stream yields the resource body in order and ends with `Ok` only
/// after exactly `total_size` bytes. On retry exhaustion it ends with
/// `ChunkDownloadFailed`; on cancellation with `Cancelled`. Dropping the
/// stream stops the driver and aborts in-flight requests.
pub fn download_chunked(req: ChunkedRequest, opts: FetchOptions) -> ByteStream {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(drive(req, opts, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn fetch_with_retry(
    url: String,
    headers: Headers,
    range: ChunkRange,
    policy: RetryPolicy,
    opts: FetchOptions,
) -> ChunkOutcome {
    let res = run_with_retry(&policy, |attempt| {
        tracing::debug!(
            chunk = range.index,
            range = %range.range_header_value(),
            attempt,
            "chunk request"
        );
        let url = url.clone();
        let headers = headers.clone();
        let opts = opts.clone();
        async move { download_one_chunk(&url, &headers, range, &opts).await }
    })
    .await;
    (range, res)
}

/// Deliver `item` unless the consumer is gone or the download is cancelled.
/// Returns false when the driver should stop.
async fn deliver(tx: &mpsc::Sender<Result<Bytes>>, opts: &FetchOptions, item: Result<Bytes>) -> bool {
    tokio::select! {
        biased;
        _ = opts.cancel.cancelled() => {
            let _ = tx.try_send(Err(FileBoxError::Cancelled));
            false
        }
        sent = tx.send(item) => sent.is_ok(),
    }
}

async fn drive(req: ChunkedRequest, opts: FetchOptions, tx: mpsc::Sender<Result<Bytes>>) {
    let mut plan = ChunkPlan::new(req.total_size, req.chunk_size);
    let concurrency = req.concurrency.max(1);
    let mut in_flight = FuturesOrdered::new();
    let mut next_to_issue = 0usize;

    tracing::info!(
        url = %req.url,
        total = req.total_size,
        chunk_size = req.chunk_size,
        chunks = plan.chunk_count(),
        concurrency,
        "chunked download"
    );

    loop {
        while in_flight.len() < concurrency && next_to_issue < plan.chunk_count() {
            let range = plan.range(next_to_issue);
            plan.mark_in_flight(next_to_issue);
            in_flight.push_back(fetch_with_retry(
                req.url.clone(),
                req.headers.clone(),
                range,
                req.retry,
                opts.clone(),
            ));
            next_to_issue += 1;
        }

        let outcome = tokio::select! {
            biased;
            _ = opts.cancel.cancelled() => {
                tracing::debug!(url = %req.url, "chunked download cancelled");
                let _ = deliver_error(&tx, FileBoxError::Cancelled).await;
                return;
            }
            _ = tx.closed() => {
                tracing::debug!(url = %req.url, "consumer dropped chunked stream");
                return;
            }
            outcome = in_flight.next() => outcome,
        };

        let Some((range, res)) = outcome else {
            break;
        };

        match res {
            Ok(bytes) => {
                plan.mark_emitted(range.index, bytes.len() as u64);
                tracing::debug!(chunk = range.index, bytes = bytes.len(), "chunk emitted");
                if !deliver(&tx, &opts, Ok(bytes)).await {
                    return;
                }
            }
            Err((attempts, cause)) => {
                plan.mark_failed(range.index);
                let err = if cause.is_cancelled() {
                    FileBoxError::Cancelled
                } else {
                    tracing::warn!(chunk = range.index, attempts, error = %cause, "chunk failed");
                    FileBoxError::ChunkDownloadFailed {
                        index: range.index,
                        attempts,
                        source: Box::new(cause),
                    }
                };
                // Dropping `in_flight` on return aborts the remaining requests.
                let _ = deliver_error(&tx, err).await;
                return;
            }
        }
    }

    debug_assert!(plan.is_complete());
    tracing::debug!(url = %req.url, bytes = plan.bytes_emitted(), "chunked download complete");
}

/// Send a terminal error; the consumer may already be gone.
async fn deliver_error(tx: &mpsc::Sender<Result<Bytes>>, err: FileBoxError) -> bool {
    tx.send(Err(err)).await.is_ok()
}
