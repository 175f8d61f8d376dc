//! The FileBox handle: one payload, one streaming interface.
//!
//! A handle holds exactly one [`Payload`] chosen at construction and routes
//! every read through [`FileBox::to_stream`]. Buffer, file, base64, QR,
//! remote and registered-blob handles can be read any number of times; a
//! stream handle hands its stream out once and then fails with
//! `StreamAlreadyConsumed`.
//!
//! Remote handles resolve lazily: the first read (or an explicit
//! [`FileBox::ready`]) probes the URL with HEAD, follows redirects and caches
//! the result. The Content-Disposition filename and Content-Type of that
//! response refine `name()` and `mime_type()` from then on.

mod options;
mod payload;
mod serialize;

pub use options::FileBoxOptions;
pub use payload::FileBoxKind;
pub use serialize::{SerializedFileBox, SerializedPayload};

pub(crate) use payload::Payload;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use base64::Engine;
use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::FileBoxConfig;
use crate::downloader::open_remote_stream;
use crate::error::{FileBoxError, Result};
use crate::fetch::{check_scheme, FetchOptions, Headers};
use crate::fetch_head::{self, RemoteDescriptor};
use crate::mime;
use crate::qr;
use crate::registry::BlobRegistry;
use crate::storage::{save_stream, SaveOptions};
use crate::stream::{self, ByteStream};
use crate::url_model::{basename, local_filename, name_from_url};

/// Caller-defined key/value data attached to a handle.
pub type Metadata = BTreeMap<String, serde_json::Value>;

static EMPTY_METADATA: Metadata = BTreeMap::new();

pub struct FileBox {
    name: String,
    payload: Payload,
    metadata: OnceLock<Metadata>,
    remote: OnceCell<RemoteDescriptor>,
    config: Arc<FileBoxConfig>,
    cancel: CancellationToken,
}

/// Standard alphabet; padding optional on input.
const LENIENT_BASE64: base64::engine::GeneralPurpose = base64::engine::GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    base64::engine::GeneralPurposeConfig::new()
        .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
);

pub(crate) fn decode_base64(text: &str) -> Result<Bytes> {
    let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(Bytes::from(LENIENT_BASE64.decode(cleaned)?))
}

impl FileBox {
    fn with_payload(payload: Payload, name: String) -> Self {
        Self {
            name,
            payload,
            metadata: OnceLock::new(),
            remote: OnceCell::new(),
            config: Arc::new(FileBoxConfig::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Build from a kind and its payload field; fails with `Configuration`
    /// when the field is missing.
    pub fn new(options: FileBoxOptions) -> Result<Self> {
        options::build(options)
    }

    pub fn from_buffer(buffer: impl Into<Bytes>, name: impl AsRef<str>) -> Self {
        Self::with_payload(Payload::Buffer(buffer.into()), basename(name.as_ref()))
    }

    /// A handle over a local file; the name is the path's base name.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = basename(&path.to_string_lossy());
        Self::with_payload(Payload::LocalFile(path), name)
    }

    /// Wrap a one-shot stream. It can be read once.
    pub fn from_stream(stream: ByteStream, name: impl AsRef<str>) -> Self {
        Self::with_payload(
            Payload::Stream(Mutex::new(Some(stream))),
            basename(name.as_ref()),
        )
    }

    /// A remote handle. Nothing is fetched until it is read or readied.
    pub fn from_url(url: &str, headers: Headers) -> Result<Self> {
        check_scheme(url)?;
        let name = name_from_url(url);
        Ok(Self::with_payload(
            Payload::RemoteUrl {
                url: url.to_string(),
                headers,
            },
            name,
        ))
    }

    /// Decode `text` now; invalid base64 fails here, not on read.
    pub fn from_base64(text: &str, name: impl AsRef<str>) -> Result<Self> {
        Ok(Self::with_payload(
            Payload::Base64(decode_base64(text)?),
            basename(name.as_ref()),
        ))
    }

    /// `data:<mime>;base64,<text>`
    pub fn from_data_url(data_url: &str, name: impl AsRef<str>) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| FileBoxError::config("data URL must start with `data:`"))?;
        let (header, text) = rest
            .split_once(',')
            .ok_or_else(|| FileBoxError::config("data URL has no `,` separator"))?;
        if !header.ends_with(";base64") {
            return Err(FileBoxError::config("only base64 data URLs are supported"));
        }
        Self::from_base64(text, name)
    }

    /// A QR code for `value`, rendered as SVG on read.
    pub fn from_qr_code(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(FileBoxError::config("QR code payload is empty"));
        }
        Ok(Self::with_payload(
            Payload::QrPayload(value),
            qr::QR_FILENAME.to_string(),
        ))
    }

    pub fn from_uuid(uuid: Uuid, name: impl AsRef<str>, registry: Arc<BlobRegistry>) -> Self {
        Self::with_payload(
            Payload::RegisteredBlob { uuid, registry },
            basename(name.as_ref()),
        )
    }

    /// Replace the display name (base name only).
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = basename(name);
        self
    }

    pub fn with_config(mut self, config: Arc<FileBoxConfig>) -> Self {
        self.config = config;
        self
    }

    /// Token that aborts resolution, downloads and file writes of this handle.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn kind(&self) -> FileBoxKind {
        self.payload.kind()
    }

    pub fn config(&self) -> &FileBoxConfig {
        &self.config
    }

    /// Display name. For remote handles a Content-Disposition filename from
    /// the resolved response takes over.
    pub fn name(&self) -> &str {
        self.remote
            .get()
            .and_then(|d| d.filename.as_deref())
            .unwrap_or(&self.name)
    }

    /// Content-Type of the resolved response, else a guess from the name.
    pub fn mime_type(&self) -> Option<&str> {
        self.remote
            .get()
            .and_then(|d| d.content_type.as_deref())
            .or_else(|| mime::from_name(self.name()))
    }

    /// Byte length as far as it is known without reading.
    ///
    /// Buffers report their length. A remote handle reports the resolved
    /// Content-Length, or the length of its URL before resolution.
    pub fn size(&self) -> Option<u64> {
        match &self.payload {
            Payload::Buffer(b) | Payload::Base64(b) => Some(b.len() as u64),
            Payload::RemoteUrl { url, .. } => match self.remote.get() {
                Some(d) => d.content_length,
                None => Some(url.len() as u64),
            },
            Payload::LocalFile(_)
            | Payload::Stream(_)
            | Payload::QrPayload(_)
            | Payload::RegisteredBlob { .. } => None,
        }
    }

    /// The resolved remote descriptor, once [`ready`](Self::ready) has run.
    pub fn remote(&self) -> Option<&RemoteDescriptor> {
        self.remote.get()
    }

    pub fn metadata(&self) -> &Metadata {
        self.metadata.get().unwrap_or(&EMPTY_METADATA)
    }

    /// Set metadata once. A second call fails with `MetadataFrozen`.
    pub fn set_metadata(&self, metadata: Metadata) -> Result<()> {
        self.metadata
            .set(metadata)
            .map_err(|_| FileBoxError::MetadataFrozen)
    }

    fn fetch_options(&self) -> FetchOptions {
        FetchOptions::from_config(&self.config, self.cancel.clone())
    }

    /// Resolve remote metadata. A no-op for every other kind and for a
    /// remote handle that is already resolved.
    pub async fn ready(&self) -> Result<()> {
        self.resolve().await.map(|_| ())
    }

    async fn resolve(&self) -> Result<Option<&RemoteDescriptor>> {
        let Payload::RemoteUrl { url, headers } = &self.payload else {
            return Ok(None);
        };
        let descriptor = self
            .remote
            .get_or_try_init(|| async {
                let opts = self.fetch_options();
                let d = fetch_head::resolve(url, headers, &opts).await?;
                if let Some(filename) = d.filename.as_deref() {
                    tracing::debug!(from = %self.name, to = filename, "remote name refined");
                }
                Ok::<_, FileBoxError>(d)
            })
            .await?;
        Ok(Some(descriptor))
    }

    /// A fresh stream over the payload.
    pub async fn to_stream(&self) -> Result<ByteStream> {
        if self.cancel.is_cancelled() {
            return Err(FileBoxError::Cancelled);
        }
        let stream = match &self.payload {
            Payload::Buffer(b) | Payload::Base64(b) => stream::from_bytes(b.clone()),
            Payload::LocalFile(path) => stream::from_path(path).await?,
            Payload::Stream(slot) => Payload::take_stream(slot)?,
            Payload::RemoteUrl { headers, .. } => {
                let descriptor = self
                    .resolve()
                    .await?
                    .ok_or_else(|| FileBoxError::config("remote handle did not resolve"))?;
                // Remote streams observe the token themselves.
                return open_remote_stream(descriptor, headers, &self.config, &self.fetch_options()).await;
            }
            Payload::QrPayload(value) => stream::from_bytes(Bytes::from(qr::render_svg(value)?)),
            Payload::RegisteredBlob { uuid, registry } => registry.load(uuid).await?,
        };
        Ok(stream::cancellable(stream, self.cancel.clone()))
    }

    /// The whole payload in memory.
    pub async fn to_buffer(&self) -> Result<Bytes> {
        if let Some(bytes) = self.payload.in_memory() {
            return Ok(bytes.clone());
        }
        stream::collect(self.to_stream().await?).await
    }

    pub async fn to_base64(&self) -> Result<String> {
        let bytes = self.to_buffer().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// `data:<mime>;base64,<text>`. Fails with `MissingMimeType` when
    /// neither the response nor the name gives a MIME type.
    pub async fn to_data_url(&self) -> Result<String> {
        let base64 = self.to_base64().await?;
        let mime = self
            .mime_type()
            .ok_or_else(|| FileBoxError::MissingMimeType(self.name().to_string()))?;
        Ok(format!("data:{mime};base64,{base64}"))
    }

    /// Write the payload to `path` (default: the sanitized name in the
    /// current directory) and return the path written.
    ///
    /// Fails with `FileExists` when the target exists and `overwrite` is
    /// false. Nothing is left behind on failure.
    pub async fn to_file(&self, path: Option<&Path>, overwrite: bool) -> Result<PathBuf> {
        self.ready().await?;
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(local_filename(self.name())),
        };
        if !overwrite && tokio::fs::try_exists(&target).await? {
            return Err(FileBoxError::FileExists(target));
        }

        let size_hint = match &self.payload {
            Payload::RemoteUrl { .. } => self.remote.get().and_then(|d| d.content_length),
            other => other.in_memory().map(|b| b.len() as u64),
        };
        let opts = SaveOptions {
            overwrite,
            size_hint,
            chunk_size: usize::try_from(self.config.chunk_size.max(1)).unwrap_or(usize::MAX),
        };
        let stream = stream::cancellable(self.to_stream().await?, self.cancel.clone());
        let written = save_stream(stream, &target, opts).await?;
        tracing::info!(path = %target.display(), bytes = written, kind = %self.kind(), "saved handle");
        Ok(target)
    }

    /// Copy the payload into `dest`; returns the bytes written.
    pub async fn pipe_to<W>(&self, dest: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        stream::copy_to(self.to_stream().await?, dest).await
    }

    /// The QR payload text. A QR handle returns its value; any other handle
    /// is read and decoded as an image holding a QR code.
    pub async fn to_qr_code(&self) -> Result<String> {
        match &self.payload {
            Payload::QrPayload(value) => Ok(value.clone()),
            _ => qr::decode_image(&self.to_buffer().await?),
        }
    }

    /// Register the payload in `registry` and return its reference. A
    /// handle that already lives in `registry` returns its own uuid.
    pub async fn to_uuid(&self, registry: &Arc<BlobRegistry>) -> Result<Uuid> {
        if let Payload::RegisteredBlob { uuid, registry: own } = &self.payload {
            if Arc::ptr_eq(own, registry) && registry.contains(uuid) {
                return Ok(*uuid);
            }
        }
        registry.register(self.to_stream().await?).await
    }
}

impl fmt::Display for FileBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileBox#{}<{}>", self.kind(), self.name())
    }
}

impl fmt::Debug for FileBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBox")
            .field("name", &self.name())
            .field("payload", &self.payload)
            .field("metadata", self.metadata())
            .field("resolved", &self.remote.initialized())
            .finish()
    }
}
