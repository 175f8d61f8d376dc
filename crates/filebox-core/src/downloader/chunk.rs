//! One range request, buffered in full.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::error::{FileBoxError, Result};
use crate::fetch::{self, FetchOptions, FetchRequest, Headers};
use crate::segmenter::ChunkRange;

/// Fetch `range` of `url` and return exactly `range.len()` bytes.
///
/// The response must be 200 or 206 with a positive Content-Length equal to
/// the range length; anything else is an `InvalidChunkResponse`, which the
/// caller retries.
pub(super) async fn download_one_chunk(
    url: &str,
    headers: &Headers,
    range: ChunkRange,
    opts: &FetchOptions,
) -> Result<Bytes> {
    let req = FetchRequest::get(url).with_headers(headers).with_range(range);
    let resp = fetch::fetch(req, opts).await?;

    let status = resp.status();
    let content_length = resp.content_length();
    let usable = matches!(status, 200 | 206)
        && content_length.is_some_and(|n| n > 0 && n == range.len());
    if !usable {
        return Err(FileBoxError::InvalidChunkResponse {
            status,
            content_length,
        });
    }

    let mut body = resp.into_body();
    let mut buf = BytesMut::with_capacity(range.len() as usize);
    while let Some(piece) = body.next().await {
        buf.extend_from_slice(&piece?);
    }
    let received = buf.len() as u64;
    if received != range.len() {
        return Err(FileBoxError::IncompleteBody {
            expected: range.len(),
            received,
        });
    }
    Ok(buf.freeze())
}
