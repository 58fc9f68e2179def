//! Filesystem notifications that wake the poll loop early.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::Notify;

use super::error::TailError;

const DEBOUNCE: Duration = Duration::from_millis(5);

/// Wakes waiters whenever the tailed file changes.
///
/// Only an optimization; the tail loop stays correct on polling alone.
pub struct FileWake {
    notify: Arc<Notify>,
    // Never locked; only keeps the watcher alive.
    _debouncer: Mutex<Debouncer<RecommendedWatcher, RecommendedCache>>,
}

impl std::fmt::Debug for FileWake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWake").finish_non_exhaustive()
    }
}

impl FileWake {
    /// Watch the directory holding `path` for changes to that file.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created.
    pub fn new(path: &Path) -> Result<Self, TailError> {
        let notify = Arc::new(Notify::new());
        let target: PathBuf = path.to_path_buf();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let waker = Arc::clone(&notify);
        let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let relevant = events.iter().any(|event| {
                        event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == target.file_name())
                    });
                    if relevant {
                        waker.notify_one();
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::debug!(error = %error, "File watcher error");
                    }
                }
            }
        })?;
        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), "Watching log directory");

        Ok(Self {
            notify,
            _debouncer: Mutex::new(debouncer),
        })
    }

    /// Wait until the file changes. A change that happened since the last
    /// wait completes immediately.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }
}
