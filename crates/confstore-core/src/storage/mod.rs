//! Storage backend capability contract.
//!
//! A backend is anything that can answer "does this path exist?" and hand out
//! an exclusive byte stream for reading or overwriting a path. The service
//! crate ships a hierarchical filesystem backend and a flat key/value
//! backend; embedders may plug in their own.
//!
//! Paths are opaque strings rather than `std::path::Path` because the
//! key/value backend's keys (for example `ls:///module/settings.json`) are
//! not filesystem paths. Each backend interprets the string in its own
//! namespace.
//!
//! # Stream ownership
//!
//! A [`StorageStream`] returned by an open call is exclusively owned by the
//! caller for one read/write/close sequence. [`StorageStream::close`] is
//! idempotent and safe to call after an error; any read or write after close
//! fails with [`StorageError::Closed`].

use async_trait::async_trait;
use thiserror::Error;

/// Error type for storage backend operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The target does not exist and the open call did not ask to create it.
    #[error("no resource at {0}")]
    NotFound(String),

    /// The backend reported an access violation for the target.
    #[error("access denied for {0}")]
    PermissionDenied(String),

    /// The backend cannot serve requests at all (missing device, detached
    /// store, unsupported runtime).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// A record was larger than the backend's declared per-record limit.
    #[error("record exceeds the backend limit of {limit} bytes")]
    CapacityExceeded { limit: u64 },

    /// The stream was used after [`StorageStream::close`].
    #[error("stream is closed")]
    Closed,

    /// An opaque I/O failure, passed through from the underlying driver.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a stream opened through a volume may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read the full current content of the target.
    Read,
    /// Truncate-or-create the target and replace its content.
    Overwrite,
}

/// A storage implementation satisfying the open/read/write/exists contract.
///
/// Implementations must be shareable across tasks; all methods take `&self`
/// and any interior state is the implementation's concern.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// The backend's declared maximum record size in bytes, if it has one.
    ///
    /// Volumes fall back to [`crate::volume::DEFAULT_MAX_SIZE`] when this
    /// returns `None`.
    fn max_record_size(&self) -> Option<u64> {
        None
    }

    /// Reports whether a resource exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Opens `path` for reading.
    ///
    /// With `create_if_missing` set, an absent target is materialized as an
    /// empty resource (including any missing parent structure) instead of
    /// failing, so a first read yields empty content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the target is absent and
    /// `create_if_missing` is `false`, [`StorageError::PermissionDenied`] on
    /// access violations, and [`StorageError::Io`] for other driver failures.
    async fn open_read(
        &self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError>;

    /// Opens `path` for overwriting, truncating any existing content.
    ///
    /// With `create_intermediate` set, missing parent structure is created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PermissionDenied`] on access violations and
    /// [`StorageError::Io`] for other driver failures.
    async fn open_overwrite(
        &self,
        path: &str,
        create_intermediate: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError>;
}

/// An exclusive byte stream over one storage target.
#[async_trait]
pub trait StorageStream: Send {
    /// Reads the full remaining content of the target.
    async fn read_all(&mut self) -> Result<Vec<u8>, StorageError>;

    /// Writes `data` to the target.
    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Releases the stream. Idempotent; safe to call after an error.
    async fn close(&mut self) -> Result<(), StorageError>;
}
