//! The one payload a handle carries.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{FileBoxError, Result};
use crate::fetch::Headers;
use crate::registry::BlobRegistry;
use crate::stream::ByteStream;

/// Which backing form a handle has. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileBoxKind {
    Buffer,
    LocalFile,
    Stream,
    RemoteUrl,
    Base64,
    QrPayload,
    RegisteredBlob,
}

impl FileBoxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileBoxKind::Buffer => "Buffer",
            FileBoxKind::LocalFile => "LocalFile",
            FileBoxKind::Stream => "Stream",
            FileBoxKind::RemoteUrl => "RemoteUrl",
            FileBoxKind::Base64 => "Base64",
            FileBoxKind::QrPayload => "QrPayload",
            FileBoxKind::RegisteredBlob => "RegisteredBlob",
        }
    }

    /// False for kinds whose payload only makes sense inside this process.
    pub fn is_portable(self) -> bool {
        !matches!(self, FileBoxKind::LocalFile | FileBoxKind::Stream)
    }
}

impl fmt::Display for FileBoxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) enum Payload {
    Buffer(Bytes),
    LocalFile(PathBuf),
    /// Taken on first read; `None` afterwards.
    Stream(Mutex<Option<ByteStream>>),
    RemoteUrl { url: String, headers: Headers },
    /// Decoded bytes of the base64 text the handle was built from.
    Base64(Bytes),
    QrPayload(String),
    RegisteredBlob {
        uuid: Uuid,
        registry: Arc<BlobRegistry>,
    },
}

impl Payload {
    pub(crate) fn kind(&self) -> FileBoxKind {
        match self {
            Payload::Buffer(_) => FileBoxKind::Buffer,
            Payload::LocalFile(_) => FileBoxKind::LocalFile,
            Payload::Stream(_) => FileBoxKind::Stream,
            Payload::RemoteUrl { .. } => FileBoxKind::RemoteUrl,
            Payload::Base64(_) => FileBoxKind::Base64,
            Payload::QrPayload(_) => FileBoxKind::QrPayload,
            Payload::RegisteredBlob { .. } => FileBoxKind::RegisteredBlob,
        }
    }

    /// Hand out the raw stream of a Stream payload exactly once.
    pub(crate) fn take_stream(slot: &Mutex<Option<ByteStream>>) -> Result<ByteStream> {
        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(FileBoxError::StreamAlreadyConsumed)
    }

    /// Bytes held in memory, if any.
    pub(crate) fn in_memory(&self) -> Option<&Bytes> {
        match self {
            Payload::Buffer(b) | Payload::Base64(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Payload::LocalFile(p) => f.debug_tuple("LocalFile").field(p).finish(),
            Payload::Stream(_) => f.write_str("Stream"),
            Payload::RemoteUrl { url, .. } => f.debug_struct("RemoteUrl").field("url", url).finish_non_exhaustive(),
            Payload::Base64(b) => f.debug_tuple("Base64").field(&b.len()).finish(),
            Payload::QrPayload(s) => f.debug_tuple("QrPayload").field(s).finish(),
            Payload::RegisteredBlob { uuid, .. } => f.debug_tuple("RegisteredBlob").field(uuid).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::from_bytes;

    #[test]
    fn stream_slot_is_taken_once() {
        let slot = Mutex::new(Some(from_bytes(Bytes::from_static(b"x"))));
        assert!(Payload::take_stream(&slot).is_ok());
        assert!(matches!(
            Payload::take_stream(&slot),
            Err(FileBoxError::StreamAlreadyConsumed)
        ));
    }

    #[test]
    fn portability() {
        assert!(FileBoxKind::Buffer.is_portable());
        assert!(FileBoxKind::RemoteUrl.is_portable());
        assert!(FileBoxKind::RegisteredBlob.is_portable());
        assert!(!FileBoxKind::Stream.is_portable());
        assert!(!FileBoxKind::LocalFile.is_portable());
    }
}
