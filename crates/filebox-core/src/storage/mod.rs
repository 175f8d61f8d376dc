//! Writing a byte stream to disk.
//!
//! Bytes land in a `.part` file next to the destination (preallocated when
//! the size is known) and are renamed over the destination only after the
//! whole stream succeeded. Every failure path, cancellation included,
//! removes the temp file.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

use std::path::{Path, PathBuf};

use futures_util::StreamExt;

use crate::chunker::rechunk;
use crate::error::{FileBoxError, Result};
use crate::stream::ByteStream;

/// Temporary file suffix used before the rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: `file.iso` → `file.iso.part`.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// How [`save_stream`] writes its destination.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Replace an existing destination instead of failing with `FileExists`.
    pub overwrite: bool,
    /// Expected byte count, used to preallocate.
    pub size_hint: Option<u64>,
    /// Size of each disk write.
    pub chunk_size: usize,
}

/// Drain `stream` into `final_path`. Returns the number of bytes written.
pub async fn save_stream(stream: ByteStream, final_path: &Path, opts: SaveOptions) -> Result<u64> {
    if !opts.overwrite && tokio::fs::try_exists(final_path).await? {
        return Err(FileBoxError::FileExists(final_path.to_path_buf()));
    }

    let tp = temp_path(final_path);
    let size_hint = opts.size_hint.filter(|n| *n > 0);
    let writer = {
        let tp = tp.clone();
        tokio::task::spawn_blocking(move || -> Result<StorageWriter> {
            let mut builder = StorageWriterBuilder::create(&tp)?;
            if let Some(size) = size_hint {
                builder.preallocate(size)?;
            }
            Ok(builder.build())
        })
        .await
        .map_err(join_error)??
    };

    match write_all(&writer, stream, opts.chunk_size, size_hint).await {
        Ok(written) => {
            let dest = final_path.to_path_buf();
            let w = writer.clone();
            let finalized = tokio::task::spawn_blocking(move || w.finalize(&dest))
                .await
                .map_err(join_error)
                .and_then(|r| r);
            match finalized {
                Ok(()) => {
                    tracing::debug!(path = %final_path.display(), bytes = written, "saved");
                    Ok(written)
                }
                Err(e) => {
                    writer.discard();
                    Err(e)
                }
            }
        }
        Err(e) => {
            tracing::debug!(path = %tp.display(), error = %e, "save failed, removing temp file");
            writer.discard();
            Err(e)
        }
    }
}

async fn write_all(
    writer: &StorageWriter,
    stream: ByteStream,
    chunk_size: usize,
    size_hint: Option<u64>,
) -> Result<u64> {
    let mut chunks = rechunk(stream, chunk_size);
    let mut offset = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let len = chunk.len() as u64;
        let w = writer.clone();
        tokio::task::spawn_blocking(move || w.write_at(offset, &chunk))
            .await
            .map_err(join_error)??;
        offset += len;
    }

    let w = writer.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        if size_hint.is_some_and(|n| n != offset) {
            w.set_len(offset)?;
        }
        w.sync()
    })
    .await
    .map_err(join_error)??;
    Ok(offset)
}

fn join_error(e: tokio::task::JoinError) -> FileBoxError {
    FileBoxError::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::from_bytes;
    use bytes::Bytes;
    use std::io::Read;

    fn opts(overwrite: bool, size_hint: Option<u64>) -> SaveOptions {
        SaveOptions {
            overwrite,
            size_hint,
            chunk_size: 4,
        }
    }

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("file.iso"));
        assert_eq!(p.to_string_lossy(), "file.iso.part");
        let p2 = temp_path(Path::new("/tmp/archive.zip"));
        assert_eq!(p2.to_string_lossy(), "/tmp/archive.zip.part");
    }

    #[test]
    fn create_preallocate_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.bin");
        let tp = temp_path(&final_path);

        let mut builder = StorageWriterBuilder::create(&tp).unwrap();
        builder.preallocate(100).unwrap();
        let writer = builder.build();

        writer.write_at(0, b"hello").unwrap();
        writer.write_at(50, b"world").unwrap();
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        let mut buf = vec![0u8; 100];
        std::fs::File::open(&final_path)
            .unwrap()
            .read_exact(&mut buf)
            .unwrap();
        assert_eq!(&buf[0..5], b"hello");
        assert_eq!(&buf[50..55], b"world");
    }

    #[test]
    fn discard_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.part");
        let writer = StorageWriterBuilder::create(&tp).unwrap().build();
        writer.write_at(0, b"abc").unwrap();
        writer.discard();
        assert!(!tp.exists());
    }

    #[tokio::test]
    async fn save_stream_writes_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        let n = save_stream(from_bytes(Bytes::from_static(b"hello world")), &dest, opts(false, Some(11)))
            .await
            .unwrap();
        assert_eq!(n, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn save_stream_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        std::fs::write(&dest, b"old").unwrap();

        let err = save_stream(from_bytes(Bytes::from_static(b"new")), &dest, opts(false, None))
            .await
            .unwrap_err();
        assert!(matches!(err, FileBoxError::FileExists(_)));
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");

        save_stream(from_bytes(Bytes::from_static(b"new")), &dest, opts(true, None))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        let failing: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FileBoxError::Cancelled),
        ]));
        let err = save_stream(failing, &dest, opts(false, Some(100))).await.unwrap_err();
        assert!(matches!(err, FileBoxError::Cancelled));
        assert!(!dest.exists());
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn short_stream_is_trimmed_to_bytes_written() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        save_stream(from_bytes(Bytes::from_static(b"abc")), &dest, opts(false, Some(10)))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }
}
