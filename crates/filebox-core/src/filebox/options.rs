//! Generic construction from a kind plus payload fields.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use uuid::Uuid;

use super::payload::{FileBoxKind, Payload};
use super::{decode_base64, FileBox};
use crate::error::{FileBoxError, Result};
use crate::fetch::{check_scheme, Headers};
use crate::qr::QR_FILENAME;
use crate::registry::BlobRegistry;
use crate::stream::ByteStream;
use crate::url_model::{basename, name_from_url};

/// Fields for [`FileBox::new`]. Only the field matching `kind` is read;
/// it must be present.
pub struct FileBoxOptions {
    pub kind: FileBoxKind,
    pub name: Option<String>,
    pub buffer: Option<Bytes>,
    pub path: Option<PathBuf>,
    pub stream: Option<ByteStream>,
    pub url: Option<String>,
    pub headers: Option<Headers>,
    pub base64: Option<String>,
    pub qr_code: Option<String>,
    pub uuid: Option<Uuid>,
    pub registry: Option<Arc<BlobRegistry>>,
}

impl FileBoxOptions {
    pub fn new(kind: FileBoxKind) -> Self {
        Self {
            kind,
            name: None,
            buffer: None,
            path: None,
            stream: None,
            url: None,
            headers: None,
            base64: None,
            qr_code: None,
            uuid: None,
            registry: None,
        }
    }
}

fn missing(kind: FileBoxKind, field: &str) -> FileBoxError {
    FileBoxError::config(format!("{kind} handle requires `{field}`"))
}

/// Build the payload and display name, or fail with `Configuration`.
pub(super) fn build(opts: FileBoxOptions) -> Result<FileBox> {
    let kind = opts.kind;
    let name = opts.name.map(|n| basename(&n));
    let require_name = |name: Option<String>| name.ok_or_else(|| missing(kind, "name"));

    let (payload, name) = match kind {
        FileBoxKind::Buffer => {
            let buffer = opts.buffer.ok_or_else(|| missing(kind, "buffer"))?;
            (Payload::Buffer(buffer), require_name(name)?)
        }
        FileBoxKind::LocalFile => {
            let path = opts.path.ok_or_else(|| missing(kind, "path"))?;
            let name = name.unwrap_or_else(|| basename(&path.to_string_lossy()));
            (Payload::LocalFile(path), name)
        }
        FileBoxKind::Stream => {
            let stream = opts.stream.ok_or_else(|| missing(kind, "stream"))?;
            (Payload::Stream(Mutex::new(Some(stream))), require_name(name)?)
        }
        FileBoxKind::RemoteUrl => {
            let url = opts.url.ok_or_else(|| missing(kind, "url"))?;
            check_scheme(&url)?;
            let name = name.unwrap_or_else(|| name_from_url(&url));
            let headers = opts.headers.unwrap_or_default();
            (Payload::RemoteUrl { url, headers }, name)
        }
        FileBoxKind::Base64 => {
            let text = opts.base64.ok_or_else(|| missing(kind, "base64"))?;
            (Payload::Base64(decode_base64(&text)?), require_name(name)?)
        }
        FileBoxKind::QrPayload => {
            let value = opts.qr_code.ok_or_else(|| missing(kind, "qr_code"))?;
            if value.is_empty() {
                return Err(missing(kind, "qr_code"));
            }
            let name = name.unwrap_or_else(|| QR_FILENAME.to_string());
            (Payload::QrPayload(value), name)
        }
        FileBoxKind::RegisteredBlob => {
            let uuid = opts.uuid.ok_or_else(|| missing(kind, "uuid"))?;
            let registry = opts.registry.ok_or_else(|| missing(kind, "registry"))?;
            let name = name.unwrap_or_else(|| uuid.to_string());
            (Payload::RegisteredBlob { uuid, registry }, name)
        }
    };

    Ok(FileBox::with_payload(payload, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_payload_fails_fast() {
        for kind in [
            FileBoxKind::Buffer,
            FileBoxKind::LocalFile,
            FileBoxKind::Stream,
            FileBoxKind::RemoteUrl,
            FileBoxKind::Base64,
            FileBoxKind::QrPayload,
            FileBoxKind::RegisteredBlob,
        ] {
            let mut opts = FileBoxOptions::new(kind);
            opts.name = Some("x.bin".into());
            let err = FileBox::new(opts).unwrap_err();
            assert!(matches!(err, FileBoxError::Configuration(_)), "{kind}: {err}");
        }
    }

    #[test]
    fn buffer_requires_a_name() {
        let mut opts = FileBoxOptions::new(FileBoxKind::Buffer);
        opts.buffer = Some(Bytes::from_static(b"x"));
        let err = FileBox::new(opts).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn names_are_reduced_to_basename() {
        let mut opts = FileBoxOptions::new(FileBoxKind::Buffer);
        opts.buffer = Some(Bytes::from_static(b"x"));
        opts.name = Some("dir/sub/report.txt".into());
        assert_eq!(FileBox::new(opts).unwrap().name(), "report.txt");
    }

    #[test]
    fn url_and_file_names_are_derived() {
        let mut opts = FileBoxOptions::new(FileBoxKind::RemoteUrl);
        opts.url = Some("https://example.com/files/a.zip".into());
        let fb = FileBox::new(opts).unwrap();
        assert_eq!(fb.name(), "a.zip");
        assert_eq!(fb.kind(), FileBoxKind::RemoteUrl);

        let mut opts = FileBoxOptions::new(FileBoxKind::LocalFile);
        opts.path = Some(PathBuf::from("/tmp/some/file.txt"));
        assert_eq!(FileBox::new(opts).unwrap().name(), "file.txt");
    }

    #[test]
    fn bad_url_fails_fast() {
        let mut opts = FileBoxOptions::new(FileBoxKind::RemoteUrl);
        opts.url = Some("ftp://example.com/a".into());
        assert!(matches!(
            FileBox::new(opts),
            Err(FileBoxError::UnsupportedScheme(_))
        ));
    }
}
