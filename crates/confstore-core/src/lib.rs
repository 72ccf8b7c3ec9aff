//! # confstore-core
//!
//! Shared library for ConfStore containing the storage capability contract,
//! the platform resolver, the per-platform configuration path table, and the
//! configuration volume model.
//!
//! This crate is used by the `confstore` service crate and by embedders that
//! supply their own storage backends. It performs no I/O itself: every
//! operation that touches a disk or a key/value store goes through the
//! [`storage::StorageBackend`] trait, whose implementations live in the
//! infrastructure layer of the service crate (or in the embedding host).
//!
//! The crate defines:
//!
//! - **`storage`** – The backend capability contract: existence checks and
//!   open-for-read / open-for-overwrite operations that hand out exclusive
//!   byte streams. Two implementations are expected in practice: a
//!   hierarchical filesystem backend and a flat key/value backend.
//!
//! - **`domain`** – Pure platform logic: which operating system family the
//!   process runs on, and where that family keeps per-user configuration.
//!
//! - **`volume`** – The [`volume::ConfigVolume`] type: a named, described
//!   mount point that scopes paths onto exactly one backend and carries the
//!   volume metadata (persistence class, scope, capacity).

pub mod domain;
pub mod storage;
pub mod volume;

// Re-export the most-used types at the crate root so callers can write
// `confstore_core::Platform` instead of `confstore_core::domain::platform::Platform`.
pub use domain::paths::{user_config_base, user_config_base_with};
pub use domain::platform::Platform;
pub use storage::{AccessMode, StorageBackend, StorageError, StorageStream};
pub use volume::{
    ConfigVolume, VolumeClass, VolumeEntry, VolumeInfo, VolumeScope, DEFAULT_MAX_SIZE,
    VOLUME_LOCAL_ID, VOLUME_PROTOCOL,
};
