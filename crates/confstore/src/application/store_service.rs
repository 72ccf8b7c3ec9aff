//! ConfigStore: the public load/save facade over the mounted volume.
//!
//! Every operation first obtains the configuration volume from the
//! [`MountCoordinator`] (mounting lazily on first use), then performs one
//! open/read-or-write/close sequence against it. Streams are released on
//! every exit path, including parse failures and size-limit rejections.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use confstore_core::{AccessMode, ConfigVolume, Platform, StorageBackend, StorageError, StorageStream};

use crate::application::mount::{MountCoordinator, MountError};
use crate::infrastructure::file_system::FileSystemBackend;
use crate::infrastructure::local_store::LocalStoreBackend;

/// Error type for configuration load/save operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No storage backend could host the configuration volume.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// `save` was called without a path.
    #[error("there is no path specified to save the configuration")]
    InvalidPath,

    /// The serialized payload is larger than the volume capacity.
    #[error("the configuration file is too big; there is a size limit of {limit} bytes per file for storing local configuration data")]
    FileSizeExceedsLimit { limit: u64 },

    /// Stored content is not valid JSON.
    #[error("stored configuration is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The value passed to `save` could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Opaque passthrough of a backend I/O failure.
    #[error(transparent)]
    Backend(#[from] StorageError),
}

impl ConfigError {
    /// Stable identifier for programmatic matching, independent of the
    /// human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Mount(_) => "config-error-mount-unavailable",
            ConfigError::InvalidPath => "config-error-invalid-path",
            ConfigError::FileSizeExceedsLimit { .. } => "config-error-file-size-exeeds-limit",
            ConfigError::Parse(_) => "config-error-parse",
            ConfigError::Serialize(_) => "config-error-serialize",
            ConfigError::Backend(_) => "config-error-backend-io",
        }
    }
}

/// The configuration service.
///
/// Cheap to clone; clones share the same coordinator and therefore the same
/// mounted volume.
#[derive(Clone)]
pub struct ConfigStore {
    coordinator: Arc<MountCoordinator>,
}

impl ConfigStore {
    /// Creates a store wired to the default backends: the real filesystem
    /// plus the in-process key/value fallback, on the current platform.
    pub fn new() -> Self {
        Self::with_backends(
            Some(Arc::new(FileSystemBackend::new()) as Arc<dyn StorageBackend>),
            Some(Arc::new(LocalStoreBackend::new()) as Arc<dyn StorageBackend>),
            Platform::current(),
        )
    }

    /// Creates a store with explicit backend availability, for embedders and
    /// tests. `None` means the runtime has no such backend.
    pub fn with_backends(
        file_system: Option<Arc<dyn StorageBackend>>,
        local_store: Option<Arc<dyn StorageBackend>>,
        platform: Platform,
    ) -> Self {
        Self {
            coordinator: Arc::new(MountCoordinator::new(file_system, local_store, platform)),
        }
    }

    /// Loads the configuration document at `path`.
    ///
    /// A path that was never saved yields an empty JSON object: the volume is
    /// opened with creation enabled, so an absent target is materialized as
    /// an empty resource rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Mount`] when no volume can be mounted,
    /// [`ConfigError::Parse`] when the stored content is not valid JSON, and
    /// passes backend I/O errors through unchanged.
    pub async fn load(&self, path: &str) -> Result<Value, ConfigError> {
        let volume = self.coordinator.mount().await?;
        let mut stream = volume.open(path, AccessMode::Read, true).await?;

        let read = stream.read_all().await;
        close_quietly(stream.as_mut(), path).await;

        parse_document(&read?)
    }

    /// Saves `value` as the configuration document at `path`.
    ///
    /// The serialized byte length is checked against the volume capacity
    /// before anything is written; an oversized payload is rejected without
    /// a write, though the opened stream is still released.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] immediately (before any mount
    /// attempt) when `path` is empty, [`ConfigError::FileSizeExceedsLimit`]
    /// when the payload is over capacity, [`ConfigError::Mount`] when no
    /// volume can be mounted, and passes backend I/O errors through
    /// unchanged.
    pub async fn save(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::InvalidPath);
        }

        let volume = self.coordinator.mount().await?;
        let mut stream = volume.open(path, AccessMode::Overwrite, true).await?;

        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(error) => {
                close_quietly(stream.as_mut(), path).await;
                return Err(ConfigError::Serialize(error));
            }
        };

        let limit = volume.capacity_bytes();
        if payload.len() as u64 > limit {
            close_quietly(stream.as_mut(), path).await;
            return Err(ConfigError::FileSizeExceedsLimit { limit });
        }

        let written = stream.write(&payload).await;
        close_quietly(stream.as_mut(), path).await;
        written?;
        Ok(())
    }

    /// Returns the mounted configuration volume, for callers that need raw
    /// volume metadata rather than load/save.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Mount`] when no volume can be mounted.
    pub async fn get_volume(&self) -> Result<Arc<ConfigVolume>, ConfigError> {
        Ok(self.coordinator.mount().await?)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases a stream, demoting a close failure to a log line: the primary
/// result of the surrounding operation has already been decided.
async fn close_quietly(stream: &mut dyn StorageStream, path: &str) {
    if let Err(error) = stream.close().await {
        debug!(path, %error, "failed to release configuration stream");
    }
}

/// Parses stored bytes as a JSON document. Empty content (a freshly
/// materialized resource) is a blank object.
fn parse_document(bytes: &[u8]) -> Result<Value, ConfigError> {
    if bytes.iter().all(|byte| byte.is_ascii_whitespace()) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(ConfigError::Parse)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
