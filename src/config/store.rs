//! Snapshot store with hot reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::GatewayConfig;
use crate::config::watcher::ConfigWatcher;

/// Default interval of the modification-time poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One immutable configuration as installed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub config: GatewayConfig,
    /// Modification time of the file this snapshot was read from.
    /// `None` for the built-in default.
    pub modified: Option<SystemTime>,
    /// 0 for the built-in default, incremented on every installed change.
    pub version: u64,
}

impl Snapshot {
    /// The empty snapshot served until a file loads successfully.
    pub fn empty() -> Self {
        Self {
            config: GatewayConfig::default().with_defaults(),
            modified: None,
            version: 0,
        }
    }
}

/// Owns the active configuration.
///
/// Readers get the current [`Snapshot`] through a lock-free pointer load.
/// Reloads read and parse the file outside of any reader-visible lock and
/// then swap the pointer; overlapping reloads are serialized by
/// `reload_lock`.
pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwap<Snapshot>,
    reload_lock: Mutex<()>,
    poll_interval: Duration,
    watcher: Mutex<Option<ConfigWatcher>>,
}

impl ConfigStore {
    /// Open the store and attempt the initial load.
    ///
    /// A failed initial load is logged and the empty snapshot is served.
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        Self::with_poll_interval(path, DEFAULT_POLL_INTERVAL)
    }

    /// Like [`ConfigStore::open`] with a custom poll interval.
    pub fn with_poll_interval(path: impl Into<PathBuf>, poll_interval: Duration) -> Arc<Self> {
        let store = Arc::new(Self {
            path: path.into(),
            current: ArcSwap::from_pointee(Snapshot::empty()),
            reload_lock: Mutex::new(()),
            poll_interval,
            watcher: Mutex::new(None),
        });

        if let Err(e) = store.load() {
            tracing::warn!(
                path = %store.path.display(),
                error = %e,
                "Failed to load initial config, serving defaults"
            );
        }

        store
    }

    /// Path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Interval used by the modification-time poll.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The currently installed snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Re-read the file and install the result.
    ///
    /// On error the installed snapshot is left untouched. When the file
    /// parses to the same configuration with the same modification time,
    /// the installed snapshot is returned as is.
    pub fn load(&self) -> Result<Arc<Snapshot>, ConfigError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let loaded = load_config(&self.path)?;
        let previous = self.current.load_full();

        if previous.modified == Some(loaded.modified) && previous.config == loaded.config {
            tracing::debug!(
                version = previous.version,
                "Config unchanged, keeping current snapshot"
            );
            return Ok(previous);
        }

        let snapshot = Arc::new(Snapshot {
            config: loaded.config,
            modified: Some(loaded.modified),
            version: previous.version + 1,
        });
        self.current.store(Arc::clone(&snapshot));

        tracing::info!(
            path = %self.path.display(),
            version = snapshot.version,
            message = %snapshot.config.ping_message(),
            backend_services = snapshot.config.backend_services.len(),
            "Config loaded"
        );

        Ok(snapshot)
    }

    /// Start the event watcher and the modification-time poll.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_watching(self: &Arc<Self>) -> Result<(), ConfigError> {
        let mut slot = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ConfigError::AlreadyWatching);
        }

        *slot = Some(ConfigWatcher::spawn(Arc::clone(self))?);
        Ok(())
    }

    /// Whether the background watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the watcher and wait for its tasks to exit. Idempotent.
    pub async fn stop(&self) -> Result<(), ConfigError> {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(watcher) = watcher {
            watcher.shutdown().await;
            tracing::info!(path = %self.path.display(), "Config watcher stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_file_serves_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.yaml"));

        let snapshot = store.current();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.config.ping_message(), "pong");
        assert!(snapshot.modified.is_none());
    }

    #[test]
    fn test_initial_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "message: ready\n");

        let store = ConfigStore::open(&path);
        let snapshot = store.current();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.config.message, "ready");
        assert!(snapshot.modified.is_some());
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "message: good\n");
        let store = ConfigStore::open(&path);

        write(&path, "message: [broken\n");
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
        assert_eq!(store.current().config.message, "good");

        fs::remove_file(&path).unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Io { .. })));
        assert_eq!(store.current().config.message, "good");
        assert_eq!(store.current().version, 1);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "message: same\n");
        let store = ConfigStore::open(&path);

        let first = store.load().unwrap();
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(second.version, 1);
    }

    #[test]
    fn test_changed_file_installs_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "message: v1\n");
        let store = ConfigStore::open(&path);
        let old = store.current();

        write(&path, "message: v2\n");
        let new = store.load().unwrap();

        assert_eq!(new.version, 2);
        assert_eq!(store.current().config.message, "v2");
        // Readers holding the old snapshot still see it intact.
        assert_eq!(old.config.message, "v1");
    }

    #[test]
    fn test_concurrent_loads_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(
            &path,
            "message: stable\nbackend_services:\n  - name: a\n    \
             url: http://a\n    enabled: true\n",
        );
        let store = ConfigStore::open(&path);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    store.load().unwrap();
                }
            }));
        }
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let snapshot = store.current();
                    assert_eq!(snapshot.config.message, "stable");
                    assert_eq!(snapshot.config.backend_services.len(), 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.current().version, 1);
    }

    #[tokio::test]
    async fn test_start_watching_twice_fails_and_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "message: w\n");
        let store = ConfigStore::open(&path);

        store.start_watching().unwrap();
        assert!(store.is_watching());
        assert!(matches!(store.start_watching(), Err(ConfigError::AlreadyWatching)));

        store.stop().await.unwrap();
        assert!(!store.is_watching());
        store.stop().await.unwrap();
    }
}
