//! Configuration file watcher for hot reload.
//!
//! Two producers feed one reload worker:
//! - filesystem events from `notify`, registered on the parent directory
//!   and filtered to the config file name;
//! - a modification-time poll, for mounts where events are not delivered.
//!
//! The worker is the only caller of [`ConfigStore::load`] on this path,
//! so reloads triggered by both producers for the same change run one
//! after the other. The second one finds nothing new and is a no-op.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::loader::ConfigError;
use crate::config::store::ConfigStore;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// What asked for a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    Event,
    Poll,
}

impl ReloadTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadTrigger::Event => "event",
            ReloadTrigger::Poll => "poll",
        }
    }
}

/// Background watch resources owned by a [`ConfigStore`].
pub struct ConfigWatcher {
    fs_watcher: Option<RecommendedWatcher>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Register the filesystem watch and spawn the event loop, the poll
    /// loop and the reload worker.
    pub fn spawn(store: Arc<ConfigStore>) -> Result<Self, ConfigError> {
        let path = store.path().to_path_buf();
        let poll_interval = store.poll_interval();
        let shutdown = Shutdown::new();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let fs_watcher = watch_file(&path, event_tx)?;

        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        let tasks = vec![
            tokio::spawn(event_loop(
                path.clone(),
                event_rx,
                reload_tx.clone(),
                shutdown.subscribe(),
            )),
            tokio::spawn(poll_loop(
                Arc::clone(&store),
                poll_interval,
                reload_tx,
                shutdown.subscribe(),
            )),
            tokio::spawn(reload_worker(store, reload_rx, shutdown.subscribe())),
        ];

        tracing::info!(
            path = %path.display(),
            poll_interval = ?poll_interval,
            "Config watcher started (events + polling)"
        );

        Ok(Self {
            fs_watcher: Some(fs_watcher),
            shutdown,
            tasks,
        })
    }

    /// Release the filesystem watch and wait for the tasks to exit.
    pub async fn shutdown(mut self) {
        drop(self.fs_watcher.take());
        self.shutdown.trigger();

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Config watcher task ended abnormally");
            }
        }
    }
}

fn watch_file(
    path: &Path,
    event_tx: mpsc::UnboundedSender<Event>,
) -> Result<RecommendedWatcher, ConfigError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(e) => tracing::warn!(error = %e, "Config watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(watch_dir(path), RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Directory to register with the OS watcher.
fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Whether a filesystem event is a content change of the config file.
fn is_config_change(event: &Event, file_name: Option<&OsString>) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    let file_name = file_name.map(|n| n.as_os_str());
    event.paths.iter().any(|p| p.file_name() == file_name)
}

async fn event_loop(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<Event>,
    reload_tx: mpsc::UnboundedSender<ReloadTrigger>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let file_name = path.file_name().map(|n| n.to_os_string());

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if is_config_change(&event, file_name.as_ref()) {
                    tracing::info!(
                        path = %path.display(),
                        kind = ?event.kind,
                        "Config file modified (event)"
                    );
                    let _ = reload_tx.send(ReloadTrigger::Event);
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn poll_loop(
    store: Arc<ConfigStore>,
    interval: Duration,
    reload_tx: mpsc::UnboundedSender<ReloadTrigger>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let metadata = tokio::fs::metadata(store.path()).await;
                let modified = match metadata.and_then(|m| m.modified()) {
                    Ok(modified) => modified,
                    Err(e) => {
                        tracing::warn!(
                            path = %store.path().display(),
                            error = %e,
                            "Failed to check config file"
                        );
                        continue;
                    }
                };

                let newer = store.current().modified.map_or(true, |last| modified > last);
                if newer {
                    tracing::info!(path = %store.path().display(), "Config file modified (poll)");
                    let _ = reload_tx.send(ReloadTrigger::Poll);
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn reload_worker(
    store: Arc<ConfigStore>,
    mut reload_rx: mpsc::UnboundedReceiver<ReloadTrigger>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            trigger = reload_rx.recv() => {
                let Some(trigger) = trigger else { break };
                // Requests queued before this load starts are covered by it.
                while reload_rx.try_recv().is_ok() {}

                let loader = Arc::clone(&store);
                match tokio::task::spawn_blocking(move || loader.load()).await {
                    Ok(Ok(snapshot)) => {
                        metrics::record_config_reload(trigger.as_str(), "success");
                        tracing::debug!(
                            trigger = trigger.as_str(),
                            version = snapshot.version,
                            "Config reload finished"
                        );
                    }
                    Ok(Err(e)) => {
                        metrics::record_config_reload(trigger.as_str(), "failure");
                        tracing::error!(
                            trigger = trigger.as_str(),
                            error = %e,
                            "Failed to reload config. Keeping current configuration."
                        );
                    }
                    Err(e) => tracing::error!(error = %e, "Config reload task failed"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
