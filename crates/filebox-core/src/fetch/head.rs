//! Response status and headers, assembled from curl header callbacks.

/// Status line and headers of one HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    /// Header (name, value) pairs in arrival order, names as sent.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Splits the raw header callback stream into response heads.
///
/// libcurl reports every header block it sees: interim `1xx` responses and,
/// when tunnelling through an HTTP proxy, the proxy's `CONNECT` answer. Only
/// the final block is returned.
#[derive(Debug)]
pub(super) struct HeadParser {
    current: ResponseHead,
    in_block: bool,
    tunnel_pending: bool,
}

impl HeadParser {
    pub(super) fn new(tunnel_pending: bool) -> Self {
        Self {
            current: ResponseHead::default(),
            in_block: false,
            tunnel_pending,
        }
    }

    /// Feed one raw header line; returns the head when a final block ends.
    /// Bytes that are not UTF-8 (Latin-1 filenames) become U+FFFD.
    pub(super) fn feed(&mut self, raw: &[u8]) -> Option<ResponseHead> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            if !self.in_block {
                return None;
            }
            self.in_block = false;
            let head = std::mem::take(&mut self.current);
            if (100..200).contains(&head.status) {
                return None;
            }
            if self.tunnel_pending && head.is_success() {
                self.tunnel_pending = false;
                return None;
            }
            return Some(head);
        }

        if line.starts_with("HTTP/") {
            self.in_block = true;
            self.current = ResponseHead {
                status: line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|code| code.parse().ok())
                    .unwrap_or(0),
                headers: Vec::new(),
            };
        } else if let Some((name, value)) = line.split_once(':') {
            self.current
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
        None
    }
}
