//! Content-Disposition filename extraction.

/// The filename announced by a Content-Disposition value, if any.
///
/// `filename*` (RFC 5987, UTF-8 only) wins over `filename`. Quoted values may
/// contain `;` and backslash escapes. Empty names count as absent.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain = None;
    for (key, value) in params(header_value) {
        if key.eq_ignore_ascii_case("filename*") {
            let extended = value
                .split_once("''")
                .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                .map(|(_, encoded)| percent_decode(encoded))
                .filter(|name| !name.is_empty());
            if extended.is_some() {
                return extended;
            }
        } else if key.eq_ignore_ascii_case("filename") && !value.is_empty() {
            plain = Some(value);
        }
    }
    plain
}

/// `key=value` pairs after the disposition type, values unquoted.
fn params(header_value: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = header_value;
    while let Some(idx) = rest.find(';') {
        rest = &rest[idx + 1..];
        let Some(eq) = rest.find('=') else {
            continue;
        };
        if rest[..eq].contains(';') {
            continue;
        }
        let key = rest[..eq].trim().to_string();
        let after = rest[eq + 1..].trim_start();
        let (value, remainder) = if let Some(quoted) = after.strip_prefix('"') {
            read_quoted(quoted)
        } else {
            let end = after.find(';').unwrap_or(after.len());
            (after[..end].trim().to_string(), &after[end..])
        };
        out.push((key, value));
        rest = remainder;
    }
    out
}

/// Read up to the closing quote; returns the unescaped text and what follows.
fn read_quoted(s: &str) -> (String, &str) {
    let mut value = String::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return (value, &s[i + 1..]),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }
    (value, "")
}

/// Percent-decode `input`. Malformed escapes are kept as-is; invalid UTF-8
/// is replaced.
pub(super) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
