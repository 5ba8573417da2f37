//! File watcher for hot reloading formula files
//!
//! Editors often save by replacing the file, so every debounced event on a
//! watched path is reported as a modification.

use crate::error::{Error, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Event emitted when a watched formula changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A watched file was written, replaced or touched
    Modified(PathBuf),
    /// The watcher backend reported an error
    Error(String),
}

/// Watches formula files for changes
pub struct FormulaWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<WatchEvent>,
    watched_paths: Arc<Mutex<Vec<PathBuf>>>,
}

fn is_formula_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "json" || e == "formula")
}

impl FormulaWatcher {
    /// Create a watcher with the given debounce window
    pub fn new(debounce: Duration) -> Result<Self> {
        let (tx, rx) = channel();
        let watched_paths: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let watched = Arc::clone(&watched_paths);

        let debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let watched = watched.lock();
                    for event in events {
                        let path = event.path;
                        let is_exact = watched.contains(&path);
                        let in_watched_dir = watched.iter().any(|p| path.starts_with(p));
                        if is_exact || (in_watched_dir && is_formula_file(&path)) {
                            let _ = tx.send(WatchEvent::Modified(path));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchEvent::Error(format!("Watch error: {:?}", e)));
                }
            },
        )
        .map_err(|e| Error::Watch(format!("Failed to create file watcher: {:?}", e)))?;

        Ok(Self {
            debouncer,
            receiver: rx,
            watched_paths,
        })
    }

    /// Watch a formula file, or every formula file in a directory
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        self.debouncer
            .watcher()
            .watch(&canonical, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", canonical.display(), e)))?;

        {
            let mut watched = self.watched_paths.lock();
            if !watched.contains(&canonical) {
                watched.push(canonical.clone());
            }
        }

        tracing::info!("Watching: {}", canonical.display());
        Ok(())
    }

    /// Stop watching a path
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        self.watched_paths.lock().retain(|p| p != &canonical);

        self.debouncer
            .watcher()
            .unwatch(&canonical)
            .map_err(|e| Error::Watch(format!("Failed to unwatch {}: {}", canonical.display(), e)))
    }

    /// Non-blocking receive
    pub fn try_recv(&self) -> Option<WatchEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive with a timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// All pending events
    pub fn drain_events(&self) -> Vec<WatchEvent> {
        self.receiver.try_iter().collect()
    }
}
