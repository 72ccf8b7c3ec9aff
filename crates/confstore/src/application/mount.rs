//! MountCoordinator: the storage fallback state machine.
//!
//! The coordinator binds a configuration volume to a concrete backend the
//! first time any caller needs one, and serializes concurrent first callers
//! onto a single probe sequence.
//!
//! # Probe order
//!
//! The order is fixed: the filesystem backend is tried first, at the
//! platform's per-user configuration directory, because real files are
//! human-inspectable and support folder structure. Only when no usable
//! filesystem location exists does the coordinator fall back to the flat
//! key/value backend rooted at `ls:///`.
//!
//! # State machine
//!
//! ```text
//! Unmounted ──first caller──▶ Mounting ──probe ok──▶ Mounted (cached forever)
//!     ▲                          │
//!     └───────probe failed───────┘   (failure is broadcast, never cached)
//! ```
//!
//! Callers that arrive while a probe is in flight attach to the pending
//! outcome through a shared `watch` channel instead of re-entering the probe
//! logic. The probe itself runs in a spawned task, so it runs to completion
//! even if the caller that started it goes away.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use confstore_core::{user_config_base, ConfigVolume, Platform, StorageBackend};

/// Root prefix of a volume mounted on the key/value fallback backend.
pub const LOCAL_STORE_ROOT: &str = "ls:///";

/// Reason reported when neither backend can host the configuration volume.
pub const MOUNT_UNAVAILABLE: &str = "The runtime does not support saving local configuration.";

/// Error type for mount operations.
///
/// Cloneable so one probe outcome can be broadcast to every attached waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MountError {
    reason: String,
}

impl MountError {
    fn unsupported() -> Self {
        Self {
            reason: MOUNT_UNAVAILABLE.to_string(),
        }
    }

    fn interrupted() -> Self {
        Self {
            reason: "the configuration mount did not complete".to_string(),
        }
    }

    /// Human-readable reason for the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

type MountOutcome = Result<Arc<ConfigVolume>, MountError>;

/// Pending probes publish `None`, then exactly one terminal `Some(outcome)`.
type OutcomeReceiver = watch::Receiver<Option<MountOutcome>>;

enum MountState {
    Unmounted,
    Mounting(OutcomeReceiver),
    Mounted(Arc<ConfigVolume>),
}

/// The mount coordinator.
///
/// Backends are injected as `Option`s so embedders and tests control which
/// capabilities the runtime offers; `None` means "this runtime has no such
/// backend".
pub struct MountCoordinator {
    file_system: Option<Arc<dyn StorageBackend>>,
    local_store: Option<Arc<dyn StorageBackend>>,
    platform: Platform,
    state: Arc<Mutex<MountState>>,
}

impl MountCoordinator {
    /// Creates a coordinator in the unmounted state.
    pub fn new(
        file_system: Option<Arc<dyn StorageBackend>>,
        local_store: Option<Arc<dyn StorageBackend>>,
        platform: Platform,
    ) -> Self {
        Self {
            file_system,
            local_store,
            platform,
            state: Arc::new(Mutex::new(MountState::Unmounted)),
        }
    }

    /// Returns the mounted configuration volume, probing backends on first
    /// use.
    ///
    /// Concurrent callers before the first mount completes share one probe
    /// sequence and observe the same outcome. A successful mount is cached
    /// for the remainder of the process; a failed mount is not, and the next
    /// call restarts probing.
    ///
    /// # Errors
    ///
    /// Returns [`MountError`] with reason [`MOUNT_UNAVAILABLE`] when neither
    /// backend can host the volume.
    pub async fn mount(&self) -> MountOutcome {
        let mut rx = {
            let mut state = self.state.lock().await;
            match &*state {
                MountState::Mounted(volume) => return Ok(Arc::clone(volume)),
                MountState::Mounting(rx) => rx.clone(),
                MountState::Unmounted => {
                    let (tx, rx) = watch::channel(None);
                    *state = MountState::Mounting(rx.clone());
                    self.spawn_probe(tx);
                    rx
                }
            }
        };

        loop {
            let current = (*rx.borrow_and_update()).clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(MountError::interrupted());
            }
        }
    }

    /// Whether a volume is currently mounted, without triggering a probe.
    pub async fn is_mounted(&self) -> bool {
        matches!(&*self.state.lock().await, MountState::Mounted(_))
    }

    fn spawn_probe(&self, tx: watch::Sender<Option<MountOutcome>>) {
        let file_system = self.file_system.clone();
        let local_store = self.local_store.clone();
        let platform = self.platform;
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let outcome = probe(file_system, local_store, platform).await;

            // Publish the new state before waking waiters, so a waiter that
            // immediately re-enters mount() observes the terminal state.
            {
                let mut state = state.lock().await;
                *state = match &outcome {
                    Ok(volume) => MountState::Mounted(Arc::clone(volume)),
                    Err(_) => MountState::Unmounted,
                };
            }
            let _ = tx.send(Some(outcome));
        });
    }
}

/// Runs one full probe sequence: filesystem first, key/value second.
async fn probe(
    file_system: Option<Arc<dyn StorageBackend>>,
    local_store: Option<Arc<dyn StorageBackend>>,
    platform: Platform,
) -> MountOutcome {
    match try_file_system(file_system, platform).await {
        Ok(volume) => {
            info!(root = volume.root(), "mounted configuration volume on the filesystem backend");
            return Ok(Arc::new(volume));
        }
        Err(reason) => {
            // Intermediate failure only; the fallback may still succeed.
            debug!(%reason, "filesystem backend unavailable, trying key/value fallback");
        }
    }

    match local_store {
        Some(backend) => {
            let volume = ConfigVolume::new(backend, LOCAL_STORE_ROOT);
            info!("mounted configuration volume on the key/value fallback backend");
            Ok(Arc::new(volume))
        }
        None => Err(MountError::unsupported()),
    }
}

/// Attempts the filesystem backend at the platform's user configuration
/// directory. The `Err` string is the suppressed intermediate reason.
async fn try_file_system(
    backend: Option<Arc<dyn StorageBackend>>,
    platform: Platform,
) -> Result<ConfigVolume, String> {
    let backend = backend.ok_or("this runtime has no filesystem backend")?;
    let base = user_config_base(platform)
        .ok_or_else(|| format!("no user configuration path for {platform:?}"))?;

    match backend.exists(&base).await {
        Ok(true) => Ok(ConfigVolume::new(backend, base)),
        Ok(false) => Err(format!("configuration base path {base} does not exist")),
        Err(error) => Err(format!("probing {base} failed: {error}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::infrastructure::local_store::LocalStoreBackend;
    use crate::infrastructure::mock::MockBackend;
    use confstore_core::VOLUME_PROTOCOL;

    /// Tests that resolve a filesystem base path pin HOME to a fixed value so
    /// they behave the same on any machine.
    fn pin_home() {
        std::env::set_var("HOME", "/home/confstore-tests");
    }

    fn coordinator(
        file_system: Option<Arc<dyn StorageBackend>>,
        local_store: Option<Arc<dyn StorageBackend>>,
        platform: Platform,
    ) -> MountCoordinator {
        MountCoordinator::new(file_system, local_store, platform)
    }

    #[tokio::test]
    async fn test_filesystem_selected_when_base_path_exists() {
        // Arrange
        pin_home();
        let fs = Arc::new(MockBackend::new());
        let kv = Arc::new(MockBackend::new());
        let coord = coordinator(
            Some(Arc::clone(&fs) as Arc<dyn StorageBackend>),
            Some(kv as Arc<dyn StorageBackend>),
            Platform::Linux,
        );

        // Act
        let volume = coord.mount().await.unwrap();

        // Assert – filesystem wins even though the key/value backend exists
        assert_eq!(volume.root(), "/home/confstore-tests/.config/");
        assert_eq!(volume.protocol(), VOLUME_PROTOCOL);
        assert_eq!(fs.exists_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_selected_when_base_path_missing() {
        // Arrange – the filesystem backend reports the base path absent
        pin_home();
        let fs = Arc::new(MockBackend::new());
        fs.exists_result.store(false, Ordering::SeqCst);
        let kv = Arc::new(MockBackend::new());
        let coord = coordinator(
            Some(fs as Arc<dyn StorageBackend>),
            Some(kv as Arc<dyn StorageBackend>),
            Platform::Linux,
        );

        // Act
        let volume = coord.mount().await.unwrap();

        // Assert
        assert_eq!(volume.root(), LOCAL_STORE_ROOT);
    }

    #[tokio::test]
    async fn test_fallback_selected_when_platform_has_no_path() {
        let kv = Arc::new(MockBackend::new());
        let coord = coordinator(
            Some(Arc::new(MockBackend::new()) as Arc<dyn StorageBackend>),
            Some(Arc::clone(&kv) as Arc<dyn StorageBackend>),
            Platform::Other,
        );

        let volume = coord.mount().await.unwrap();

        assert_eq!(volume.root(), LOCAL_STORE_ROOT);
    }

    #[tokio::test]
    async fn test_fallback_selected_when_probe_errors() {
        // Arrange – exists() itself fails; the error is suppressed and the
        // fallback is still tried
        pin_home();
        let fs = Arc::new(MockBackend::new());
        fs.fail_exists.store(true, Ordering::SeqCst);
        let coord = coordinator(
            Some(fs as Arc<dyn StorageBackend>),
            Some(Arc::new(LocalStoreBackend::new()) as Arc<dyn StorageBackend>),
            Platform::Linux,
        );

        // Act / Assert
        let volume = coord.mount().await.unwrap();
        assert_eq!(volume.root(), LOCAL_STORE_ROOT);
    }

    #[tokio::test]
    async fn test_mount_fails_when_no_backend_available() {
        let coord = coordinator(None, None, Platform::Other);

        let error = coord.mount().await.unwrap_err();

        assert_eq!(error.reason(), MOUNT_UNAVAILABLE);
        assert!(!coord.is_mounted().await);
    }

    #[tokio::test]
    async fn test_failure_is_not_memoized_and_next_call_retries() {
        // Arrange – base path absent, no fallback: the first mount fails
        pin_home();
        let fs = Arc::new(MockBackend::new());
        fs.exists_result.store(false, Ordering::SeqCst);
        let coord = coordinator(
            Some(Arc::clone(&fs) as Arc<dyn StorageBackend>),
            None,
            Platform::Linux,
        );
        coord.mount().await.unwrap_err();

        // Act – the path appears, the next call probes again and succeeds
        fs.exists_result.store(true, Ordering::SeqCst);
        let volume = coord.mount().await.unwrap();

        // Assert – two probe sequences ran in total
        assert_eq!(volume.root(), "/home/confstore-tests/.config/");
        assert_eq!(fs.exists_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_success_is_memoized_and_never_reprobed() {
        pin_home();
        let fs = Arc::new(MockBackend::new());
        let coord = coordinator(
            Some(Arc::clone(&fs) as Arc<dyn StorageBackend>),
            None,
            Platform::Linux,
        );

        let first = coord.mount().await.unwrap();
        let second = coord.mount().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.exists_calls.lock().unwrap().len(), 1);
        assert!(coord.is_mounted().await);
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_probe() {
        // Arrange
        pin_home();
        let fs = Arc::new(MockBackend::new());
        let coord = Arc::new(coordinator(
            Some(Arc::clone(&fs) as Arc<dyn StorageBackend>),
            Some(Arc::new(MockBackend::new()) as Arc<dyn StorageBackend>),
            Platform::Linux,
        ));

        // Act – eight callers race the first mount
        let mut handles = Vec::new();
        for _ in 0..8 {
            let coord = Arc::clone(&coord);
            handles.push(tokio::spawn(async move { coord.mount().await }));
        }
        let mut volumes = Vec::new();
        for handle in handles {
            volumes.push(handle.await.unwrap().unwrap());
        }

        // Assert – exactly one probe ran and everyone got the same volume
        assert_eq!(fs.exists_calls.lock().unwrap().len(), 1);
        for volume in &volumes[1..] {
            assert!(Arc::ptr_eq(&volumes[0], volume));
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_observe_the_same_failure() {
        let coord = Arc::new(coordinator(None, None, Platform::Other));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coord = Arc::clone(&coord);
            handles.push(tokio::spawn(async move { coord.mount().await }));
        }

        for handle in handles {
            let error = handle.await.unwrap().unwrap_err();
            assert_eq!(error.reason(), MOUNT_UNAVAILABLE);
        }
    }
}
