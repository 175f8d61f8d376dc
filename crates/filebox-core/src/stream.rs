//! The byte stream every FileBox producer returns.

use std::path::Path;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::error::{FileBoxError, Result};

/// Boxed, sendable stream of byte chunks. Errors end the stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// A stream yielding `bytes` as a single chunk (nothing for an empty buffer).
pub fn from_bytes(bytes: Bytes) -> ByteStream {
    if bytes.is_empty() {
        return Box::pin(stream::empty());
    }
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Open `path` and stream its contents. The open error is returned here, read
/// errors surface on the stream.
pub async fn from_path(path: &Path) -> Result<ByteStream> {
    let file = tokio::fs::File::open(path).await?;
    Ok(Box::pin(
        ReaderStream::new(file).map(|r| r.map_err(FileBoxError::from)),
    ))
}

/// Drain a stream into one contiguous buffer.
pub async fn collect(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Copy a stream into `dest`, returning the number of bytes written.
pub async fn copy_to<W>(mut stream: ByteStream, dest: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        dest.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    dest.flush().await?;
    Ok(written)
}

/// End `stream` with `Cancelled` as soon as `cancel` fires.
pub fn cancellable(stream: ByteStream, cancel: CancellationToken) -> ByteStream {
    Box::pin(stream::unfold(Some((stream, cancel)), |state| async move {
        let (mut stream, cancel) = state?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some((Err(FileBoxError::Cancelled), None)),
            item = stream.next() => item.map(|item| (item, Some((stream, cancel)))),
        }
    }))
}
