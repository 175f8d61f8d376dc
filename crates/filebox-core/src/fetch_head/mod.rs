//! HTTP HEAD / metadata probing.
//!
//! Issues HEAD requests through [`crate::fetch`] and follows redirects by hand
//! so the hop count is bounded and every hop gets the request timeout. The
//! result carries `Content-Length`, `Content-Type`, `Accept-Ranges` and the
//! Content-Disposition filename of the final response.

mod parse;

use crate::error::{FileBoxError, Result};
use crate::fetch::{self, FetchOptions, FetchRequest, Headers};

pub(crate) use parse::parse_headers;

/// Redirects followed before giving up with `RedirectLoop`.
pub const MAX_REDIRECTS: usize = 7;

/// Metadata of a remote resource after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    /// URL of the final, non-redirect response.
    pub effective_url: String,
    pub status: u32,
    pub content_length: Option<u64>,
    /// MIME essence of `Content-Type`, parameters stripped.
    pub content_type: Option<String>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub content_disposition: Option<String>,
    /// Filename parsed out of `content_disposition`.
    pub filename: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RemoteDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True when the chunked range downloader can serve this resource with
    /// chunks of `chunk_size` bytes.
    pub fn supports_slicing(&self, chunk_size: u64) -> bool {
        self.accept_ranges && self.content_length.is_some_and(|len| len > chunk_size)
    }
}

/// Probe `url` with HEAD, following up to [`MAX_REDIRECTS`] redirects.
///
/// Caller headers are sent on every hop. A final non-2xx status is returned
/// as-is; the GET that follows reports it.
pub async fn resolve(url: &str, headers: &Headers, opts: &FetchOptions) -> Result<RemoteDescriptor> {
    let mut current = url::Url::parse(url)?;
    let mut redirects = 0usize;

    loop {
        let req = FetchRequest::head(current.as_str()).with_headers(headers);
        let resp = fetch::fetch(req, opts).await?;
        let head = resp.head().clone();
        drop(resp);

        if !head.is_redirect() {
            if !head.is_success() {
                tracing::warn!(url = %current, status = head.status, "HEAD returned non-success status");
            }
            let descriptor = parse_headers(current.as_str(), &head);
            tracing::debug!(
                url = %descriptor.effective_url,
                redirects,
                content_length = ?descriptor.content_length,
                accept_ranges = descriptor.accept_ranges,
                "resolved"
            );
            return Ok(descriptor);
        }

        let Some(location) = head.header("location").filter(|l| !l.trim().is_empty()) else {
            return Err(FileBoxError::MalformedRedirect {
                url: current.to_string(),
                status: head.status,
            });
        };

        if redirects == MAX_REDIRECTS {
            return Err(FileBoxError::RedirectLoop {
                url: url.to_string(),
                limit: MAX_REDIRECTS,
            });
        }
        redirects += 1;

        let next = current.join(location.trim())?;
        tracing::debug!(from = %current, to = %next, status = head.status, "redirect");
        current = next;
    }
}
