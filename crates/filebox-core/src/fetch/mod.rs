//! Single-shot HTTP fetch: one GET or HEAD, the unit of retry.
//!
//! Uses the curl crate (libcurl) on the blocking pool. The async side
//! enforces two independent timeouts: the request timeout bounds the wait for
//! the response head, the response timeout bounds every gap between body
//! bytes. Either one, or the caller's cancellation token, aborts the transfer
//! and ends the body stream with the matching error.

mod body;
mod head;
mod transfer;

pub use head::ResponseHead;

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{FileBoxConfig, ProxyConfig};
use crate::error::{FileBoxError, Result};
use crate::segmenter::ChunkRange;
use crate::stream::ByteStream;
use transfer::{AbortFlag, AbortOnDrop, Event, TransferSpec};

/// Caller-supplied request headers (name → value).
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub range: Option<ChunkRange>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Headers::new(),
            range: None,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self {
            method: Method::Head,
            ..Self::get(url)
        }
    }

    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.headers = headers.clone();
        self
    }

    pub fn with_range(mut self, range: ChunkRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Per-fetch limits, proxy and cancellation.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub request_timeout: Duration,
    pub response_timeout: Duration,
    pub proxy: Option<ProxyConfig>,
    pub cancel: CancellationToken,
}

impl FetchOptions {
    pub fn from_config(cfg: &FileBoxConfig, cancel: CancellationToken) -> Self {
        Self {
            request_timeout: cfg.request_timeout(),
            response_timeout: cfg.response_timeout(),
            proxy: cfg.proxy.clone(),
            cancel,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&FileBoxConfig::default(), CancellationToken::new())
    }
}

/// Response head plus a lazily consumed body.
pub struct FetchResponse {
    url: String,
    head: ResponseHead,
    body: ByteStream,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("url", &self.url)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

impl FetchResponse {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u32 {
        self.head.status
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length()
    }

    pub fn into_body(self) -> ByteStream {
        self.body
    }

    /// Fail with `Http` unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.head.is_success() {
            Ok(self)
        } else {
            Err(FileBoxError::Http {
                status: self.head.status,
                url: self.url,
            })
        }
    }
}

/// Reject anything but plain and TLS HTTP before a transfer starts.
pub(crate) fn check_scheme(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FileBoxError::UnsupportedScheme(other.to_string())),
    }
}

/// Issue one request and wait (at most `request_timeout`) for its head.
///
/// Redirects are not followed. The body is read through the returned
/// response; its stream enforces `response_timeout` between chunks.
pub async fn fetch(req: FetchRequest, opts: &FetchOptions) -> Result<FetchResponse> {
    check_scheme(&req.url)?;
    if opts.cancel.is_cancelled() {
        return Err(FileBoxError::Cancelled);
    }

    tracing::debug!(
        url = %req.url,
        method = ?req.method,
        range = ?req.range.map(|r| r.range_header_value()),
        "fetch"
    );

    let spec = TransferSpec {
        url: req.url.clone(),
        method: req.method,
        headers: req.headers,
        range: req.range.map(|r| r.curl_range()),
        connect_timeout: opts.request_timeout,
        proxy: opts.proxy.clone(),
    };
    let flag = AbortFlag::default();
    let abort = AbortOnDrop(flag.clone());
    let mut rx = transfer::spawn(spec, flag);

    let first = tokio::select! {
        biased;
        _ = opts.cancel.cancelled() => return Err(FileBoxError::Cancelled),
        ev = tokio::time::timeout(opts.request_timeout, rx.recv()) => ev,
    };

    let head = match first {
        Err(_) => return Err(FileBoxError::RequestTimeout(opts.request_timeout)),
        Ok(Some(Event::Head(head))) => head,
        Ok(Some(Event::Done(Err(e)))) if e.is_operation_timedout() => {
            return Err(FileBoxError::RequestTimeout(opts.request_timeout));
        }
        Ok(Some(Event::Done(Err(e)))) => return Err(FileBoxError::Transport(e)),
        Ok(Some(Event::Data(_))) | Ok(Some(Event::Done(Ok(())))) | Ok(None) => {
            return Err(FileBoxError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before a response head",
            )));
        }
    };

    tracing::debug!(url = %req.url, status = head.status, "response head");

    let has_body = req.method == Method::Get && !matches!(head.status, 100..=199 | 204 | 304);
    let expected = if has_body { head.content_length() } else { None };
    let body = body::body_stream(
        rx,
        abort,
        expected,
        opts.response_timeout,
        opts.cancel.clone(),
    );

    Ok(FetchResponse {
        url: req.url,
        head,
        body,
    })
}
