//! Flat key/value fallback backend.
//!
//! Modelled on web local-storage semantics: a flat namespace of records keyed
//! by the full location string (volumes mounted here use the `ls:///` root),
//! with a declared per-record size limit. There is no hierarchy, so
//! "create intermediate structure" is a no-op and open-with-create can always
//! be satisfied.
//!
//! Records live in process memory for the lifetime of the store; hosts that
//! have a durable flat store (browser local storage, an embedded KV device)
//! supply their own [`StorageBackend`] implementation instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use confstore_core::{StorageBackend, StorageError, StorageStream};

/// Declared per-record limit, matching common web local-storage quotas.
pub const MAX_RECORD_SIZE: u64 = 5_242_880;

type Records = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// The key/value backend. Clones share the same record map.
#[derive(Debug, Clone, Default)]
pub struct LocalStoreBackend {
    records: Records,
}

impl LocalStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for LocalStoreBackend {
    fn max_record_size(&self) -> Option<u64> {
        Some(MAX_RECORD_SIZE)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().await.contains_key(path))
    }

    async fn open_read(
        &self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        let mut records = self.records.lock().await;
        let snapshot = match records.get(path) {
            Some(content) => content.clone(),
            None if create_if_missing => {
                records.insert(path.to_string(), Vec::new());
                Vec::new()
            }
            None => return Err(StorageError::NotFound(path.to_string())),
        };
        Ok(Box::new(LocalStoreStream::reader(snapshot)))
    }

    async fn open_overwrite(
        &self,
        path: &str,
        _create_intermediate: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        Ok(Box::new(LocalStoreStream::writer(
            path,
            Arc::clone(&self.records),
        )))
    }
}

/// Stream over one record. Reads serve a snapshot taken at open; writes
/// buffer and commit atomically on close.
struct LocalStoreStream {
    snapshot: Vec<u8>,
    pending: Vec<u8>,
    target: Option<(String, Records)>,
    dirty: bool,
    closed: bool,
}

impl LocalStoreStream {
    fn reader(snapshot: Vec<u8>) -> Self {
        Self {
            snapshot,
            pending: Vec::new(),
            target: None,
            dirty: false,
            closed: false,
        }
    }

    fn writer(path: &str, records: Records) -> Self {
        Self {
            snapshot: Vec::new(),
            pending: Vec::new(),
            target: Some((path.to_string(), records)),
            dirty: false,
            closed: false,
        }
    }
}

#[async_trait]
impl StorageStream for LocalStoreStream {
    async fn read_all(&mut self) -> Result<Vec<u8>, StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(self.snapshot.clone())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        let projected = (self.pending.len() + data.len()) as u64;
        if projected > MAX_RECORD_SIZE {
            return Err(StorageError::CapacityExceeded {
                limit: MAX_RECORD_SIZE,
            });
        }
        self.pending.extend_from_slice(data);
        self.dirty = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.dirty {
            if let Some((path, records)) = self.target.take() {
                records.lock().await.insert(path, std::mem::take(&mut self.pending));
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_read_with_create_materializes_empty_record() {
        // Arrange
        let backend = LocalStoreBackend::new();
        assert!(!backend.exists("ls:///module/a.json").await.unwrap());

        // Act
        let mut stream = backend.open_read("ls:///module/a.json", true).await.unwrap();
        let content = stream.read_all().await.unwrap();
        stream.close().await.unwrap();

        // Assert – the record now exists and reads as empty
        assert!(content.is_empty());
        assert!(backend.exists("ls:///module/a.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_read_without_create_fails_on_absent_record() {
        let backend = LocalStoreBackend::new();

        let error = match backend.open_read("ls:///missing", false).await {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };

        assert!(matches!(error, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_overwrite_commits_on_close() {
        // Arrange
        let backend = LocalStoreBackend::new();
        let mut stream = backend.open_overwrite("ls:///a", true).await.unwrap();

        // Act – record is not visible until the stream closes
        stream.write(b"{\"k\":1}").await.unwrap();
        assert!(!backend.exists("ls:///a").await.unwrap());
        stream.close().await.unwrap();

        // Assert
        let mut reader = backend.open_read("ls:///a", false).await.unwrap();
        assert_eq!(reader.read_all().await.unwrap(), b"{\"k\":1}");
        reader.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_content() {
        let backend = LocalStoreBackend::new();
        for payload in [&b"first"[..], &b"second"[..]] {
            let mut stream = backend.open_overwrite("ls:///a", true).await.unwrap();
            stream.write(payload).await.unwrap();
            stream.close().await.unwrap();
        }

        let mut reader = backend.open_read("ls:///a", false).await.unwrap();
        assert_eq!(reader.read_all().await.unwrap(), b"second");
        reader.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_declared_record_limit_is_enforced_on_write() {
        // Arrange
        let backend = LocalStoreBackend::new();
        let mut stream = backend.open_overwrite("ls:///big", true).await.unwrap();
        let oversized = vec![b'x'; (MAX_RECORD_SIZE + 1) as usize];

        // Act
        let error = stream.write(&oversized).await.unwrap_err();
        stream.close().await.unwrap();

        // Assert – rejected record never became visible
        assert!(matches!(error, StorageError::CapacityExceeded { .. }));
        assert!(!backend.exists("ls:///big").await.unwrap());
    }

    #[tokio::test]
    async fn test_declared_max_record_size_matches_constant() {
        let backend = LocalStoreBackend::new();
        assert_eq!(backend.max_record_size(), Some(MAX_RECORD_SIZE));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = LocalStoreBackend::new();
        let mut stream = backend.open_overwrite("ls:///a", true).await.unwrap();
        stream.write(b"x").await.unwrap();

        stream.close().await.unwrap();
        stream.close().await.unwrap();

        assert!(matches!(stream.write(b"y").await, Err(StorageError::Closed)));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let backend = LocalStoreBackend::new();
        let clone = backend.clone();

        let mut stream = backend.open_overwrite("ls:///shared", true).await.unwrap();
        stream.write(b"1").await.unwrap();
        stream.close().await.unwrap();

        assert!(clone.exists("ls:///shared").await.unwrap());
    }
}
