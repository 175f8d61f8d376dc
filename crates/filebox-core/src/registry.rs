//! Short-lived blob store for handing handles across process boundaries.
//!
//! A registered stream is written to `<store_dir>/<uuid>` and stays loadable
//! until its TTL runs out, it is removed, or the registry is closed. The
//! registry is an explicit object: the creator calls [`BlobRegistry::init`],
//! shares it (usually as `Arc<BlobRegistry>`) and calls
//! [`BlobRegistry::close`] when done.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::error::{FileBoxError, Result};
use crate::storage::{save_stream, SaveOptions};
use crate::stream::{self, ByteStream};

/// How long a blob stays loadable after registration.
pub const DEFAULT_BLOB_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Defaults to `<tmp>/filebox-registry.<pid>`.
    pub store_dir: Option<PathBuf>,
    /// Defaults to [`DEFAULT_BLOB_TTL`].
    pub ttl: Option<Duration>,
}

type Timers = Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>;

#[derive(Debug)]
pub struct BlobRegistry {
    store_dir: PathBuf,
    ttl: Duration,
    entries: Timers,
    closed: AtomicBool,
}

pub fn default_store_dir() -> PathBuf {
    std::env::temp_dir().join(format!("filebox-registry.{}", std::process::id()))
}

impl BlobRegistry {
    /// Create the store directory (if needed) and return a ready registry.
    pub async fn init(options: RegistryOptions) -> Result<Self> {
        let store_dir = options.store_dir.unwrap_or_else(default_store_dir);
        match tokio::fs::metadata(&store_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(FileBoxError::config(format!(
                    "{} is not a directory",
                    store_dir.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&store_dir).await?;
            }
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(dir = %store_dir.display(), "blob registry initialized");
        Ok(Self {
            store_dir,
            ttl: options.ttl.unwrap_or(DEFAULT_BLOB_TTL),
            entries: Arc::default(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn blob_path(&self, uuid: &Uuid) -> PathBuf {
        self.store_dir.join(uuid.to_string())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FileBoxError::config("blob registry is closed"));
        }
        Ok(())
    }

    /// Drain `stream` into the store and return its new reference.
    pub async fn register(&self, stream: ByteStream) -> Result<Uuid> {
        self.ensure_open()?;
        let uuid = Uuid::new_v4();
        let path = self.blob_path(&uuid);
        let bytes = save_stream(
            stream,
            &path,
            SaveOptions {
                overwrite: false,
                size_hint: None,
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
        )
        .await?;

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let timer = tokio::spawn(expire(
            Arc::clone(&self.entries),
            uuid,
            path,
            self.ttl,
        ));
        entries.insert(uuid, timer);
        tracing::debug!(%uuid, bytes, ttl = ?self.ttl, "blob registered");
        Ok(uuid)
    }

    /// True while `uuid` is registered and not expired.
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uuid)
    }

    /// Stream the blob behind `uuid`. Loading does not consume it.
    pub async fn load(&self, uuid: &Uuid) -> Result<ByteStream> {
        self.ensure_open()?;
        if !self.contains(uuid) {
            return Err(FileBoxError::UnknownBlob(*uuid));
        }
        match stream::from_path(&self.blob_path(uuid)).await {
            Err(FileBoxError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileBoxError::UnknownBlob(*uuid))
            }
            other => other,
        }
    }

    /// Forget `uuid` and delete its file. Returns false if it was unknown.
    pub async fn remove(&self, uuid: &Uuid) -> Result<bool> {
        let timer = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uuid);
        let Some(timer) = timer else {
            return Ok(false);
        };
        timer.abort();
        match tokio::fs::remove_file(self.blob_path(uuid)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Stop every expiry timer and delete the store directory.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.abort_timers();
        match tokio::fs::remove_dir_all(&self.store_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %self.store_dir.display(), error = %e, "failed to remove blob store");
                return Err(e.into());
            }
        }
        tracing::debug!(dir = %self.store_dir.display(), "blob registry closed");
        Ok(())
    }

    fn abort_timers(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in entries.drain() {
            timer.abort();
        }
    }
}

impl Drop for BlobRegistry {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

async fn expire(entries: Timers, uuid: Uuid, path: PathBuf, ttl: Duration) {
    tokio::time::sleep(ttl).await;
    entries
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&uuid);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => tracing::debug!(%uuid, "blob expired"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(%uuid, error = %e, "failed to remove expired blob"),
    }
}
