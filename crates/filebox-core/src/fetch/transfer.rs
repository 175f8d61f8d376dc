//! One libcurl transfer on a blocking thread, reported as channel events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use curl::easy::{Easy, List, ProxyType};
use tokio::sync::mpsc;

use super::head::{HeadParser, ResponseHead};
use super::{Headers, Method};
use crate::config::{ProxyConfig, ProxyKind};

/// Events buffered between the curl thread and the async reader.
const EVENT_BUFFER: usize = 16;

#[derive(Debug)]
pub(super) enum Event {
    Head(ResponseHead),
    Data(Bytes),
    Done(Result<(), curl::Error>),
}

/// Everything the curl thread needs, owned.
#[derive(Debug, Clone)]
pub(super) struct TransferSpec {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    /// libcurl range value, e.g. `0-1023`.
    pub range: Option<String>,
    pub connect_timeout: Duration,
    pub proxy: Option<ProxyConfig>,
}

/// Raised when the reader gives up: curl stops at its next callback.
#[derive(Debug, Clone, Default)]
pub(super) struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub(super) fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub(super) fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Raises the flag when dropped, so an abandoned response never keeps a
/// transfer running.
#[derive(Debug)]
pub(super) struct AbortOnDrop(pub(super) AbortFlag);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

/// Start the transfer on the blocking pool. The last event is always `Done`
/// unless the receiver is gone.
pub(super) fn spawn(spec: TransferSpec, abort: AbortFlag) -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::task::spawn_blocking(move || {
        let result = perform(&spec, &tx, &abort);
        if let Err(e) = &result {
            tracing::debug!(url = %spec.url, error = %e, "transfer ended with error");
        }
        let _ = tx.blocking_send(Event::Done(result));
    });
    rx
}

fn perform(
    spec: &TransferSpec,
    tx: &mpsc::Sender<Event>,
    abort: &AbortFlag,
) -> Result<(), curl::Error> {
    let mut easy = Easy::new();
    easy.url(&spec.url)?;
    match spec.method {
        Method::Head => easy.nobody(true)?,
        Method::Get => easy.get(true)?,
    }
    // Redirects are followed one hop at a time by the resolver.
    easy.follow_location(false)?;
    easy.connect_timeout(spec.connect_timeout)?;
    easy.progress(true)?;
    if let Some(range) = &spec.range {
        easy.range(range)?;
    }
    if let Some(proxy) = &spec.proxy {
        apply_proxy(&mut easy, proxy)?;
    }

    let mut list = List::new();
    for (k, v) in &spec.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !spec.headers.is_empty() {
        easy.http_headers(list)?;
    }

    let tunnel = matches!(&spec.proxy, Some(p) if p.kind == ProxyKind::Http)
        && spec.url.starts_with("https:");
    let mut parser = HeadParser::new(tunnel);

    let mut transfer = easy.transfer();
    transfer.header_function(|line| {
        if abort.is_raised() {
            return false;
        }
        match parser.feed(line) {
            Some(head) => tx.blocking_send(Event::Head(head)).is_ok(),
            None => true,
        }
    })?;
    transfer.write_function(|data| {
        if abort.is_raised() {
            return Ok(0);
        }
        // Returning fewer bytes than offered aborts the transfer.
        match tx.blocking_send(Event::Data(Bytes::copy_from_slice(data))) {
            Ok(()) => Ok(data.len()),
            Err(_) => Ok(0),
        }
    })?;
    transfer.progress_function(|_, _, _, _| !abort.is_raised())?;
    transfer.perform()
}

fn apply_proxy(easy: &mut Easy, proxy: &ProxyConfig) -> Result<(), curl::Error> {
    easy.proxy(&format!("{}:{}", proxy.host, proxy.port))?;
    easy.proxy_type(match proxy.kind {
        ProxyKind::Http => ProxyType::Http,
        ProxyKind::Socks4 => ProxyType::Socks4,
        ProxyKind::Socks5 => ProxyType::Socks5,
        ProxyKind::Socks5h => ProxyType::Socks5Hostname,
    })?;
    if let Some(user) = &proxy.username {
        easy.proxy_username(user)?;
    }
    if let Some(pass) = &proxy.password {
        easy.proxy_password(pass)?;
    }
    Ok(())
}
