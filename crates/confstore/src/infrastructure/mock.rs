//! Mock storage backend for unit and integration testing.
//!
//! # Why a mock backend?
//!
//! The real backends either touch the filesystem or carry their own
//! concurrency, which makes call-level assertions awkward. The `MockBackend`
//! replaces all of that with in-memory recording: every `exists`, open,
//! write, and close call is pushed into a shared record so tests can inspect
//! exactly what the mount coordinator and the configuration service did, and
//! in what order.
//!
//! # Failure injection
//!
//! The `fail_*` flags are atomics so a test can flip behaviour after the
//! backend has been shared as `Arc<dyn StorageBackend>`. Setting one makes
//! the corresponding operation fail with `StorageError::Unavailable`, which
//! exercises the error-handling paths of the callers without a broken host.
//!
//! # Usage in tests
//!
//! ```ignore
//! let backend = Arc::new(MockBackend::new());
//! let store = ConfigStore::with_backends(
//!     None,
//!     Some(Arc::clone(&backend) as Arc<dyn StorageBackend>),
//!     Platform::Other,
//! );
//!
//! store.load("module/a.json").await.unwrap();
//!
//! // Assert the stream was released exactly once.
//! assert_eq!(backend.closes.lock().unwrap().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use confstore_core::{AccessMode, StorageBackend, StorageError, StorageStream};

/// One recorded open call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCall {
    pub path: String,
    pub mode: AccessMode,
    pub create: bool,
}

/// A backend that records all calls and serves content from memory.
///
/// Record fields are `Arc`-shared because the streams a backend hands out
/// outlive the `&self` borrow that created them.
pub struct MockBackend {
    /// Record content served to read streams and committed by write streams.
    pub content: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Every path passed to `exists`, in call order. One probe sequence
    /// performs exactly one `exists` call.
    pub exists_calls: Arc<Mutex<Vec<String>>>,
    /// Every open call, in call order.
    pub open_calls: Arc<Mutex<Vec<OpenCall>>>,
    /// Every (path, payload) passed to a stream write.
    pub write_calls: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    /// Every stream close, by path, in call order. Recorded on every call so
    /// tests can assert "exactly once".
    pub closes: Arc<Mutex<Vec<String>>>,
    /// Result of `exists` when `fail_exists` is unset.
    pub exists_result: Arc<AtomicBool>,
    pub fail_exists: Arc<AtomicBool>,
    pub fail_open: Arc<AtomicBool>,
    pub fail_read: Arc<AtomicBool>,
    pub fail_write: Arc<AtomicBool>,
    max_size: Option<u64>,
}

impl MockBackend {
    /// Creates a backend with empty records, `exists` reporting `true`, and
    /// no failure injection.
    pub fn new() -> Self {
        Self {
            content: Arc::new(Mutex::new(HashMap::new())),
            exists_calls: Arc::new(Mutex::new(Vec::new())),
            open_calls: Arc::new(Mutex::new(Vec::new())),
            write_calls: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(Vec::new())),
            exists_result: Arc::new(AtomicBool::new(true)),
            fail_exists: Arc::new(AtomicBool::new(false)),
            fail_open: Arc::new(AtomicBool::new(false)),
            fail_read: Arc::new(AtomicBool::new(false)),
            fail_write: Arc::new(AtomicBool::new(false)),
            max_size: None,
        }
    }

    /// Declares a per-record size limit, which volumes pick up as capacity.
    pub fn with_max_record_size(mut self, limit: u64) -> Self {
        self.max_size = Some(limit);
        self
    }

    /// Pre-seeds content at a fully-resolved location.
    pub fn seed(&self, path: &str, content: &[u8]) {
        self.content
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
    }

    fn record_open(&self, path: &str, mode: AccessMode, create: bool) {
        self.open_calls.lock().unwrap().push(OpenCall {
            path: path.to_string(),
            mode,
            create,
        });
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn max_record_size(&self) -> Option<u64> {
        self.max_size
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.exists_calls.lock().unwrap().push(path.to_string());
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock exists failure".to_string()));
        }
        Ok(self.exists_result.load(Ordering::SeqCst))
    }

    async fn open_read(
        &self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        self.record_open(path, AccessMode::Read, create_if_missing);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock open failure".to_string()));
        }

        let snapshot = {
            let mut content = self.content.lock().unwrap();
            match content.get(path) {
                Some(existing) => existing.clone(),
                None if create_if_missing => {
                    content.insert(path.to_string(), Vec::new());
                    Vec::new()
                }
                None => return Err(StorageError::NotFound(path.to_string())),
            }
        };
        Ok(Box::new(MockStream::new(self, path, snapshot)))
    }

    async fn open_overwrite(
        &self,
        path: &str,
        create_intermediate: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        self.record_open(path, AccessMode::Overwrite, create_intermediate);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock open failure".to_string()));
        }
        Ok(Box::new(MockStream::new(self, path, Vec::new())))
    }
}

/// Stream twin of [`MockBackend`]: serves the snapshot taken at open,
/// buffers writes, and commits them to the backend's content map on the
/// first close.
struct MockStream {
    path: String,
    snapshot: Vec<u8>,
    pending: Vec<u8>,
    dirty: bool,
    closed: bool,
    content: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    write_calls: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    closes: Arc<Mutex<Vec<String>>>,
    fail_read: Arc<AtomicBool>,
    fail_write: Arc<AtomicBool>,
}

impl MockStream {
    fn new(backend: &MockBackend, path: &str, snapshot: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            snapshot,
            pending: Vec::new(),
            dirty: false,
            closed: false,
            content: Arc::clone(&backend.content),
            write_calls: Arc::clone(&backend.write_calls),
            closes: Arc::clone(&backend.closes),
            fail_read: Arc::clone(&backend.fail_read),
            fail_write: Arc::clone(&backend.fail_write),
        }
    }
}

#[async_trait]
impl StorageStream for MockStream {
    async fn read_all(&mut self) -> Result<Vec<u8>, StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(self.snapshot.clone())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        self.write_calls
            .lock()
            .unwrap()
            .push((self.path.clone(), data.to_vec()));
        self.pending.extend_from_slice(data);
        self.dirty = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        // Every call is recorded so tests can assert exact counts; only the
        // first call commits.
        self.closes.lock().unwrap().push(self.path.clone());
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.dirty {
            self.content
                .lock()
                .unwrap()
                .insert(self.path.clone(), std::mem::take(&mut self.pending));
        }
        Ok(())
    }
}
