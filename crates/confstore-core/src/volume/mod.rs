//! The configuration volume: a named mount point over one storage backend.
//!
//! A [`ConfigVolume`] binds exactly one [`StorageBackend`] to a root prefix
//! and exposes path-scoped open and query operations plus descriptive
//! metadata. The mount coordinator in the service crate constructs one
//! volume on the first successful backend probe; it is then shared as
//! `Arc<ConfigVolume>` for the remainder of the process and never torn down
//! explicitly.

use std::sync::Arc;

use serde::Serialize;

use crate::storage::{AccessMode, StorageBackend, StorageError, StorageStream};

/// Protocol tag distinguishing configuration volumes from other volume
/// classes in the host I/O system.
pub const VOLUME_PROTOCOL: &str = "cfg";

/// Stable local identifier of the configuration volume.
pub const VOLUME_LOCAL_ID: &str = "config";

/// Capacity in bytes assumed when the backend declares no record limit.
pub const DEFAULT_MAX_SIZE: u64 = 5_242_880;

const VOLUME_NAME: &str = "Configuration (Local)";
const VOLUME_DESCRIPTION: &str = "Contains local module configuration data.";

/// Persistence class of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeClass {
    /// Content survives process exit.
    Persistent,
    /// Content lives only as long as the process.
    Temporary,
}

/// Visibility scope of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeScope {
    /// Per-user configuration.
    Local,
    /// Per-machine configuration. Defined by the volume model but not
    /// produced by any mount path in this crate.
    Device,
}

/// One entry in a volume listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeEntry {
    pub path: String,
}

/// Serializable snapshot of a volume's metadata, for host reporting.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub protocol: &'static str,
    pub local_id: &'static str,
    pub capacity_bytes: u64,
    pub class: VolumeClass,
    pub scope: VolumeScope,
    pub read_only: bool,
    pub root: String,
}

/// A mounted configuration volume.
///
/// All metadata is fixed at construction; only the open/exists/query
/// operations touch the backend.
pub struct ConfigVolume {
    capacity_bytes: u64,
    read_only: bool,
    class: VolumeClass,
    scope: VolumeScope,
    backend: Arc<dyn StorageBackend>,
    root: String,
}

impl ConfigVolume {
    /// Wraps `backend` at the given root prefix.
    ///
    /// Capacity comes from the backend's declared record limit, or
    /// [`DEFAULT_MAX_SIZE`] when it declares none.
    pub fn new(backend: Arc<dyn StorageBackend>, root: impl Into<String>) -> Self {
        let capacity_bytes = backend.max_record_size().unwrap_or(DEFAULT_MAX_SIZE);
        Self {
            capacity_bytes,
            read_only: false,
            class: VolumeClass::Persistent,
            scope: VolumeScope::Local,
            backend,
            root: root.into(),
        }
    }

    /// Opens `path` on the backend under this volume's root.
    ///
    /// One leading `/` is stripped from `path` before the root prefix is
    /// prepended, so `"/module/a.json"` and `"module/a.json"` address the
    /// same target.
    ///
    /// # Errors
    ///
    /// Passes backend errors through unchanged: [`StorageError::Unavailable`]
    /// when the backend reports the target inaccessible,
    /// [`StorageError::PermissionDenied`] on access violations, and the rest
    /// of the [`StorageError`] taxonomy as the backend maps them.
    pub async fn open(
        &self,
        path: &str,
        mode: AccessMode,
        create_path: bool,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        let target = self.location(path);
        match mode {
            AccessMode::Read => self.backend.open_read(&target, create_path).await,
            AccessMode::Overwrite => self.backend.open_overwrite(&target, create_path).await,
        }
    }

    /// Reports whether `path` exists on the backend.
    ///
    /// Used while probing during mount; ordinary load/save goes through
    /// [`ConfigVolume::open`] with creation enabled instead.
    ///
    /// # Errors
    ///
    /// Passes backend errors through unchanged.
    pub async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.backend.exists(&self.location(path)).await
    }

    /// Lists the volume's contents.
    ///
    /// Listing is not part of the current contract; this always resolves to
    /// an empty sequence. Load/save never call it, so an implementation may
    /// be added later without breaking existing callers.
    pub async fn query(&self) -> Result<Vec<VolumeEntry>, StorageError> {
        Ok(Vec::new())
    }

    /// The fully-resolved storage location for a volume-relative path.
    pub fn location(&self, path: &str) -> String {
        let relative = path.strip_prefix('/').unwrap_or(path);
        format!("{}{}", self.root, relative)
    }

    /// Snapshot of the volume metadata.
    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            name: VOLUME_NAME,
            description: VOLUME_DESCRIPTION,
            protocol: VOLUME_PROTOCOL,
            local_id: VOLUME_LOCAL_ID,
            capacity_bytes: self.capacity_bytes,
            class: self.class,
            scope: self.scope,
            read_only: self.read_only,
            root: self.root.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        VOLUME_NAME
    }

    pub fn description(&self) -> &'static str {
        VOLUME_DESCRIPTION
    }

    pub fn protocol(&self) -> &'static str {
        VOLUME_PROTOCOL
    }

    pub fn local_id(&self) -> &'static str {
        VOLUME_LOCAL_ID
    }

    /// Maximum serialized record size accepted by save operations.
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn class(&self) -> VolumeClass {
        self.class
    }

    pub fn scope(&self) -> VolumeScope {
        self.scope
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The root prefix prepended to every volume-relative path.
    pub fn root(&self) -> &str {
        &self.root
    }
}

impl std::fmt::Debug for ConfigVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigVolume")
            .field("protocol", &VOLUME_PROTOCOL)
            .field("root", &self.root)
            .field("capacity_bytes", &self.capacity_bytes)
            .finish()
    }
}
