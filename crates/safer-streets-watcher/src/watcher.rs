//! Filesystem watcher for the data root

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use safer_streets_core::Repository;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Quiet period after the last event before a reload starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the data watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Data file created or modified
    Changed(PathBuf),
    /// Data file removed
    Removed(PathBuf),
}

/// Watches a data root recursively and forwards events for data files.
pub struct DataWatcher {
    _watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root: PathBuf,
}

impl DataWatcher {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => Self::handle_notify_event(event, &event_tx),
                Err(e) => error!("Data watch error: {}", e),
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching data directory: {}", root.display());

        Ok(Self {
            _watcher: watcher,
            event_rx,
            root,
        })
    }

    fn handle_notify_event(event: notify::Event, event_tx: &mpsc::UnboundedSender<WatchEvent>) {
        let removed = match event.kind {
            notify::EventKind::Create(_) | notify::EventKind::Modify(_) => false,
            notify::EventKind::Remove(_) => true,
            _ => return,
        };
        for path in event.paths.into_iter().filter(|p| is_data_file(p)) {
            debug!("Data file event: {:?}", path);
            let event = if removed {
                WatchEvent::Removed(path)
            } else {
                WatchEvent::Changed(path)
            };
            if event_tx.send(event).is_err() {
                return;
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }
}

/// Reloads a [`Repository`] whenever its data root settles after a change.
pub struct ReloadService {
    watcher: DataWatcher,
    repository: Arc<Repository>,
    debounce: Duration,
}

impl ReloadService {
    pub fn new(repository: Arc<Repository>) -> Result<Self> {
        Self::with_debounce(repository, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(repository: Arc<Repository>, debounce: Duration) -> Result<Self> {
        let watcher = DataWatcher::new(repository.root())?;
        Ok(Self {
            watcher,
            repository,
            debounce,
        })
    }

    /// Process events until the watcher shuts down.
    pub async fn run(mut self) -> Result<()> {
        let debounce = self.debounce;
        loop {
            let Some(first) = self.watcher.event_receiver().recv().await else {
                break;
            };
            let burst = collect_burst(self.watcher.event_receiver(), debounce).await + 1;
            info!("{} data file change(s), first {:?}; reloading", burst, first);

            let repository = Arc::clone(&self.repository);
            match tokio::task::spawn_blocking(move || repository.reload()).await {
                Ok(Ok(catalog)) => {
                    let stats = catalog.stats();
                    info!("Now serving {} areas and {} datasets", stats.areas, stats.datasets);
                }
                // Repository::reload already logged the cause
                Ok(Err(_)) => {}
                Err(e) => warn!("Reload task panicked: {}", e),
            }
        }
        Ok(())
    }
}

/// Drain events until none arrive for `quiet`. Returns how many were drained.
async fn collect_burst(rx: &mut mpsc::UnboundedReceiver<WatchEvent>, quiet: Duration) -> usize {
    let mut drained = 0;
    while let Ok(Some(_)) = timeout(quiet, rx.recv()).await {
        drained += 1;
    }
    drained
}

/// JSON files, skipping hidden and editor temporary files.
pub fn is_data_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && !name.ends_with('~') && name.ends_with(".json")
}
