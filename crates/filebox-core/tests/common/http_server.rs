//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body with HEAD and Range GET support, plus a few
//! special paths:
//! - `/redirect/N` answers 302 to `/redirect/N-1`, and `/redirect/1` to
//!   `/file.bin`, so it takes exactly N redirects to reach the body.
//! - `/no-location` answers 302 without a Location header.
//! - `/moved` answers 302 to `ServerOptions::moved_to` (absolute URL).
//! - `/missing` answers 404.
//!
//! Failures and slowness are injected through [`ServerOptions`]. Every
//! request is recorded so tests can count range requests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// If true, GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// If true, omit `Accept-Ranges: bytes`.
    pub hide_ranges: bool,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    /// Range GETs starting at `.0` answer 503 for the first `.1` attempts.
    pub fail_range: Option<(u64, usize)>,
    /// Sleep before writing anything back.
    pub first_byte_delay: Option<Duration>,
    /// Like `first_byte_delay`, but for GET only; HEAD answers at once.
    pub get_delay: Option<Duration>,
    /// Send half of a GET body, sleep, then send the rest.
    pub body_stall: Option<Duration>,
    /// Announce this many more bytes than are sent on a plain GET.
    pub short_body_by: Option<usize>,
    /// Target of `/moved`.
    pub moved_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    pub method: String,
    pub path: String,
    /// (start, end inclusive)
    pub range: Option<(u64, u64)>,
}

pub struct TestServer {
    base: String,
    log: Arc<Mutex<Vec<LoggedRequest>>>,
}

impl TestServer {
    /// `http://127.0.0.1:<port>` joined with `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn range_requests(&self) -> Vec<(u64, u64)> {
        self.requests().iter().filter_map(|r| r.range).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }
}

struct Shared {
    body: Vec<u8>,
    opts: ServerOptions,
    failures_left: Mutex<HashMap<u64, usize>>,
    log: Arc<Mutex<Vec<LoggedRequest>>>,
}

pub fn start(body: Vec<u8>) -> TestServer {
    start_with_options(body, ServerOptions::default())
}

/// Starts the server on a background thread; it runs until the process exits.
pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let log = Arc::new(Mutex::new(Vec::new()));
    let failures_left = opts
        .fail_range
        .map(|(start, n)| HashMap::from([(start, n)]))
        .unwrap_or_default();
    let shared = Arc::new(Shared {
        body,
        opts,
        failures_left: Mutex::new(failures_left),
        log: Arc::clone(&log),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &shared));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        log,
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, path, range) = parse_request(request);
    shared.log.lock().unwrap().push(LoggedRequest {
        method: method.to_string(),
        path: path.to_string(),
        range,
    });

    let opts = &shared.opts;
    if let Some(delay) = opts.first_byte_delay {
        thread::sleep(delay);
    }

    if let Some(n) = path.strip_prefix("/redirect/") {
        let n: u32 = n.parse().unwrap_or(1);
        let location = if n <= 1 {
            "/file.bin".to_string()
        } else {
            format!("/redirect/{}", n - 1)
        };
        return redirect(&mut stream, Some(&location));
    }
    if path == "/no-location" {
        return redirect(&mut stream, None);
    }
    if path == "/moved" {
        return redirect(&mut stream, opts.moved_to.as_deref());
    }
    if path == "/missing" {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    let is_head = method.eq_ignore_ascii_case("HEAD");
    if !is_head && !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(
            b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    if !is_head {
        if let Some(delay) = opts.get_delay {
            thread::sleep(delay);
        }
    }

    let body = &shared.body[..];
    let total = body.len() as u64;
    let mut extra = String::new();
    if !opts.hide_ranges && !opts.ignore_ranges {
        extra.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(ct) = &opts.content_type {
        extra.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    if let Some(cd) = &opts.content_disposition {
        extra.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }

    if is_head {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
            total, extra
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let range = range.filter(|_| !opts.ignore_ranges);
    if let Some((start, _)) = range {
        let mut failures = shared.failures_left.lock().unwrap();
        if let Some(left) = failures.get_mut(&start) {
            if *left > 0 {
                *left -= 1;
                drop(failures);
                let _ = stream.write_all(
                    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                );
                return;
            }
        }
    }

    let (status, slice, announced) = match range {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    total
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            extra.push_str(&format!(
                "Content-Range: bytes {}-{}/{}\r\n",
                start, end_incl, total
            ));
            let slice = &body[start as usize..=end_incl as usize];
            ("206 Partial Content", slice, slice.len())
        }
        None => ("200 OK", body, body.len() + opts.short_body_by.unwrap_or(0)),
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status, announced, extra
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    match opts.body_stall {
        Some(stall) => {
            let half = slice.len() / 2;
            let _ = stream.write_all(&slice[..half]);
            let _ = stream.flush();
            thread::sleep(stall);
            let _ = stream.write_all(&slice[half..]);
        }
        None => {
            let _ = stream.write_all(slice);
        }
    }
    let _ = stream.flush();
}

fn redirect(stream: &mut TcpStream, location: Option<&str>) {
    let location = location
        .map(|l| format!("Location: {}\r\n", l))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 302 Found\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
        location
    );
    let _ = stream.write_all(response.as_bytes());
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
