//! Error type shared by every FileBox component.
//!
//! Network and filesystem failures surface through the stream's error channel
//! at the point of consumption; construction-time misuse fails synchronously.

use std::path::PathBuf;
use std::time::Duration;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, FileBoxError>;

#[derive(Debug, thiserror::Error)]
pub enum FileBoxError {
    /// A handle was built without the payload its kind requires, or with an
    /// unusable one (bad URL, bad base64, missing registry).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("too many redirects (>{limit}) starting from {url}")]
    RedirectLoop { url: String, limit: usize },

    #[error("HTTP {status} redirect from {url} has no Location header")]
    MalformedRedirect { url: String, status: u32 },

    #[error("request timed out after {0:?} waiting for the response")]
    RequestTimeout(Duration),

    #[error("response stalled for more than {0:?}")]
    ResponseTimeout(Duration),

    #[error("chunk {index} failed after {attempts} attempt(s): {source}")]
    ChunkDownloadFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: Box<FileBoxError>,
    },

    #[error("stream has already been consumed")]
    StreamAlreadyConsumed,

    #[error("operation cancelled")]
    Cancelled,

    #[error("HTTP {status} from {url}")]
    Http { status: u32, url: String },

    /// A range response that cannot be used for a chunk (wrong status or no body).
    #[error("unusable chunk response: HTTP {status}, content-length {content_length:?}")]
    InvalidChunkResponse {
        status: u32,
        content_length: Option<u64>,
    },

    /// Fewer (or more) bytes arrived than announced. Never downgraded to a short stream.
    #[error("incomplete body: expected {expected} bytes, got {received}")]
    IncompleteBody { expected: u64, received: u64 },

    #[error("metadata can not be modified after it is set")]
    MetadataFrozen,

    #[error("{0} handles are process-local and can not be serialized")]
    NotSerializable(&'static str),

    #[error("file exists: {} (pass overwrite to replace it)", .0.display())]
    FileExists(PathBuf),

    #[error("no MIME type known for {0}")]
    MissingMimeType(String),

    #[error("unknown or expired blob {0}")]
    UnknownBlob(uuid::Uuid),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("transport: {0}")]
    Transport(#[from] curl::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("QR code: {0}")]
    QrCode(#[from] qrcode::types::QrError),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("no readable QR code: {0}")]
    QrDecode(String),
}

impl FileBoxError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        FileBoxError::Configuration(msg.into())
    }

    /// True when this error (or the cause it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            FileBoxError::Cancelled => true,
            FileBoxError::ChunkDownloadFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
