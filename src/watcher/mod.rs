//! Live re-indexing of a folder through `notify`
//!
//! Events are collected per path and applied once the path has been quiet for
//! the debounce interval. Whether a path is re-indexed or dropped is decided
//! from the file system at that moment, so rename and editor save sequences
//! collapse into a single update.

use crate::ignore::IgnoreFilter;
use crate::indexer::Indexer;
use crate::storage::normalize_path;
use crate::{FileStatus, Result};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quiet period before a changed path is processed
pub const DEBOUNCE: Duration = Duration::from_millis(500);

const POLL: Duration = Duration::from_millis(100);

/// Counters for one flush or a whole watch session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchStats {
    pub indexed: usize,
    pub removed: usize,
    /// Unsupported, too large or unreadable
    pub skipped: usize,
}

impl WatchStats {
    fn add(&mut self, other: WatchStats) {
        self.indexed += other.indexed;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }
}

pub struct Watcher<'a> {
    root: PathBuf,
    indexer: &'a Indexer<'a>,
    filter: IgnoreFilter,
    debounce: Duration,
    pending: HashMap<PathBuf, Instant>,
    stop: Arc<AtomicBool>,
}

impl<'a> Watcher<'a> {
    pub fn new(root: PathBuf, indexer: &'a Indexer<'a>) -> Self {
        let filter = indexer.ignore_filter(&root);
        Self {
            root,
            indexer,
            filter,
            debounce: DEBOUNCE,
            pending: HashMap::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends [`Watcher::run`] once set (Ctrl+C handler)
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Watch until the stop flag is set or the event channel closes.
    /// Paths still waiting out the debounce are processed before returning.
    pub fn run(&mut self) -> anyhow::Result<WatchStats> {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {} for changes", self.root.display());

        let mut total = WatchStats::default();
        while !self.stop.load(Ordering::SeqCst) {
            match rx.recv_timeout(POLL) {
                Ok(Ok(event)) => self.queue(event, Instant::now()),
                Ok(Err(e)) => tracing::warn!("Watch error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let stats = self.flush_due(Instant::now())?;
            if stats != WatchStats::default() {
                tracing::debug!("Watch flush: {:?}", stats);
            }
            total.add(stats);
        }

        total.add(self.flush_all()?);
        tracing::info!("Stopped watching {}", self.root.display());
        Ok(total)
    }

    /// Record the paths of an event; repeated events restart the quiet period
    pub fn queue(&mut self, event: notify::Event, now: Instant) {
        if matches!(event.kind, EventKind::Access(_) | EventKind::Other) {
            return;
        }
        for path in event.paths {
            if self.is_watched(&path) {
                self.pending.insert(path, now);
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn is_watched(&self, path: &Path) -> bool {
        if self.indexer.is_skipped_path(path) {
            return false;
        }
        !self.filter.is_ignored(path, path.is_dir())
    }

    /// Process paths that have been quiet for the debounce interval
    pub fn flush_due(&mut self, now: Instant) -> Result<WatchStats> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) >= self.debounce)
            .map(|(path, _)| path.clone())
            .collect();
        self.process(due)
    }

    pub fn flush_all(&mut self) -> Result<WatchStats> {
        let all: Vec<PathBuf> = self.pending.keys().cloned().collect();
        self.process(all)
    }

    fn process(&mut self, paths: Vec<PathBuf>) -> Result<WatchStats> {
        let mut stats = WatchStats::default();
        for path in paths {
            self.pending.remove(&path);
            if path.is_file() {
                match self.indexer.index_file(&path)? {
                    Some(FileStatus::New) | Some(FileStatus::Modified) => {
                        tracing::info!("Re-indexed {}", normalize_path(&path));
                        stats.indexed += 1;
                    }
                    Some(_) => {}
                    None => stats.skipped += 1,
                }
            } else if !path.exists() {
                if self.indexer.remove_file(&path)? {
                    tracing::info!("Removed {}", normalize_path(&path));
                    stats.removed += 1;
                } else {
                    // A removed folder only reports its own path
                    let removed = self.indexer.remove_tree(&path)?;
                    if removed > 0 {
                        tracing::info!("Removed {} files under {}", removed, normalize_path(&path));
                    }
                    stats.removed += removed;
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::EventLogger;
    use crate::indexer::IndexOptions;
    use crate::storage::IndexStore;
    use notify::event::{CreateKind, EventKind, RemoveKind};
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> notify::Event {
        notify::Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_debounced_index_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let logger = EventLogger::disabled();
        let indexer = Indexer::new(&store, &logger, IndexOptions::default());
        let mut watcher = Watcher::new(dir.path().to_path_buf(), &indexer);

        let file = dir.path().join("note.md");
        std::fs::write(&file, "# Note\nwatch this budget").unwrap();
        let start = Instant::now();
        watcher.queue(event(EventKind::Create(CreateKind::File), &file), start);
        watcher.queue(event(EventKind::Create(CreateKind::File), &file), start);
        assert_eq!(watcher.pending(), 1);

        // Still inside the quiet period
        let stats = watcher.flush_due(start + Duration::from_millis(100)).unwrap();
        assert_eq!(stats, WatchStats::default());
        assert_eq!(store.count_files().unwrap(), 0);

        let stats = watcher.flush_due(start + DEBOUNCE).unwrap();
        assert_eq!(stats.indexed, 1);
        assert_eq!(store.count_files().unwrap(), 1);

        std::fs::remove_file(&file).unwrap();
        watcher.queue(event(EventKind::Remove(RemoveKind::File), &file), start);
        let stats = watcher.flush_all().unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(store.count_files().unwrap(), 0);
    }

    #[test]
    fn test_ignored_paths_are_not_queued() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let logger = EventLogger::disabled();
        let indexer = Indexer::new(&store, &logger, IndexOptions::default());
        let mut watcher = Watcher::new(dir.path().to_path_buf(), &indexer);

        let ignored = dir.path().join("node_modules").join("pkg.json");
        std::fs::create_dir_all(ignored.parent().unwrap()).unwrap();
        std::fs::write(&ignored, "{}").unwrap();
        watcher.queue(event(EventKind::Create(CreateKind::File), &ignored), Instant::now());
        assert_eq!(watcher.pending(), 0);
    }

    #[test]
    fn test_removed_folder_purges_its_files() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let logger = EventLogger::disabled();
        let indexer = Indexer::new(&store, &logger, IndexOptions::default());
        let mut watcher = Watcher::new(dir.path().to_path_buf(), &indexer);

        let folder = dir.path().join("reports");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("a.txt"), "alpha budget").unwrap();
        std::fs::write(folder.join("b.txt"), "beta budget").unwrap();
        std::fs::write(dir.path().join("keep.txt"), "keep").unwrap();
        indexer.index_root(dir.path()).unwrap();
        assert_eq!(store.count_files().unwrap(), 3);

        std::fs::remove_dir_all(&folder).unwrap();
        watcher.queue(event(EventKind::Remove(RemoveKind::Folder), &folder), Instant::now());
        let stats = watcher.flush_all().unwrap();
        assert_eq!(stats.removed, 2);
        assert_eq!(store.count_files().unwrap(), 1);
    }

    #[test]
    fn test_stop_flag_flushes_pending_paths() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let logger = EventLogger::disabled();
        let indexer = Indexer::new(&store, &logger, IndexOptions::default());
        let stop = Arc::new(AtomicBool::new(false));
        let mut watcher = Watcher::new(dir.path().to_path_buf(), &indexer).with_stop(stop.clone());

        let file = dir.path().join("draft.txt");
        std::fs::write(&file, "unsaved budget notes").unwrap();
        watcher.queue(event(EventKind::Create(CreateKind::File), &file), Instant::now());

        // Interrupted before the quiet period ends
        stop.store(true, Ordering::SeqCst);
        let stats = watcher.run().unwrap();
        assert_eq!(stats.indexed, 1);
        assert_eq!(watcher.pending(), 0);
        assert_eq!(store.count_files().unwrap(), 1);
    }
}
