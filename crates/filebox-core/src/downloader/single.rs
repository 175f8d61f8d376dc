//! Single-stream HTTP GET (non-Range fallback).

use crate::error::Result;
use crate::fetch::{self, FetchOptions, FetchRequest, Headers};
use crate::stream::ByteStream;

/// GET `url` once and return its body.
///
/// Fails with `Http` on a non-2xx status. The body ends in `IncompleteBody`
/// if fewer bytes arrive than the response announced.
pub async fn download_single(url: &str, headers: &Headers, opts: &FetchOptions) -> Result<ByteStream> {
    let req = FetchRequest::get(url).with_headers(headers);
    let resp = fetch::fetch(req, opts).await?.error_for_status()?;
    tracing::debug!(url, content_length = ?resp.content_length(), "single GET started");
    Ok(resp.into_body())
}
