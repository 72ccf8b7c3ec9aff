//! # confstore
//!
//! Durable, cross-platform load/save of module configuration data as JSON
//! documents, with a one-time, concurrency-safe storage fallback protocol.
//!
//! The [`ConfigStore`] facade lazily mounts a configuration volume on first
//! use: the mount coordinator probes a hierarchical filesystem backend at
//! the platform's per-user configuration directory, and falls back to a flat
//! key/value backend when no usable filesystem location exists. The winning
//! volume is cached for the lifetime of the process; a failed mount is not
//! cached and a later call retries.
//!
//! ```text
//! ConfigStore::load / save / get_volume
//!  └─ MountCoordinator          -- lazy, memoized, single probe sequence
//!       ├─ FileSystemBackend    -- preferred: human-inspectable files
//!       └─ LocalStoreBackend    -- degraded fallback: flat records
//! ```

pub mod application;
pub mod infrastructure;

pub use application::mount::{MountCoordinator, MountError, LOCAL_STORE_ROOT, MOUNT_UNAVAILABLE};
pub use application::store_service::{ConfigError, ConfigStore};
pub use infrastructure::file_system::FileSystemBackend;
pub use infrastructure::local_store::LocalStoreBackend;
