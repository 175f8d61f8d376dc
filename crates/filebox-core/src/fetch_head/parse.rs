//! Turn a final response head into a RemoteDescriptor.

use crate::fetch::ResponseHead;
use crate::mime;
use crate::url_model::{basename, parse_content_disposition_filename};

use super::RemoteDescriptor;

/// Build the descriptor for `head`, the response of `effective_url`.
pub(crate) fn parse_headers(effective_url: &str, head: &ResponseHead) -> RemoteDescriptor {
    let content_length = head.content_length();
    let accept_ranges = head
        .header("accept-ranges")
        .map(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")))
        .unwrap_or(false);
    let content_type = head
        .header("content-type")
        .map(mime::essence)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let content_disposition = head.header("content-disposition").map(str::to_string);
    let filename = content_disposition
        .as_deref()
        .and_then(parse_content_disposition_filename)
        .map(|f| basename(&f))
        .filter(|f| !f.is_empty());

    RemoteDescriptor {
        effective_url: effective_url.to_string(),
        status: head.status,
        content_length,
        content_type,
        accept_ranges,
        content_disposition,
        filename,
        headers: head.headers.clone(),
    }
}
