//! Walking and incremental indexing
//!
//! The coordinator walks the root, hands paths to a pool of worker threads
//! over a crossbeam channel and writes the results to SQLite in batched
//! transactions. Files whose BLAKE3 hash matches the stored one are skipped.

pub mod worker;

use crate::config::IndexlyConfig;
use crate::eventlog::EventLogger;
use crate::extract::{self, ExtractedDocument, ExtractorRegistry};
use crate::ignore::IgnoreFilter;
use crate::semantic::TierFilter;
use crate::storage::{normalize_path, FileMetadata, FileRecord, IndexStore};
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::{Error, FileStatus, IndexMessage, Result};
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Rows written per transaction
const WRITE_BATCH: usize = 200;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub max_file_size: u64,
    /// 0 = one per core
    pub workers: usize,
    pub tags: Vec<String>,
    pub ignore_file: Option<PathBuf>,
    pub ignore_preset: String,
    pub excludes: Vec<String>,
    pub max_cache_entries: usize,
    /// Files and directories never indexed (the database, the log dir)
    pub skip_paths: Vec<PathBuf>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self::from_config(&IndexlyConfig::default())
    }
}

impl IndexOptions {
    pub fn from_config(config: &IndexlyConfig) -> Self {
        Self {
            max_file_size: config.index.max_file_size,
            workers: config.index.workers,
            tags: Vec::new(),
            ignore_file: None,
            ignore_preset: config.index.ignore_preset.clone(),
            excludes: config.index.excludes.clone(),
            max_cache_entries: config.cache.max_entries,
            skip_paths: vec![config.database_path(), config.log_dir()],
        }
    }
}

/// Counters for one indexing run
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexStats {
    pub scanned: usize,
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u128,
}

impl IndexStats {
    pub fn changed(&self) -> usize {
        self.new + self.modified + self.deleted
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms as u64)
    }
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scanned: {} new, {} modified, {} unchanged, {} deleted, {} skipped, {} failed",
            self.scanned, self.new, self.modified, self.unchanged, self.deleted, self.skipped, self.failed
        )
    }
}

pub struct Indexer<'a> {
    store: &'a IndexStore,
    logger: &'a EventLogger,
    registry: ExtractorRegistry,
    tiers: TierFilter,
    options: IndexOptions,
    progress: Option<Sender<ProgressMessage>>,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a IndexStore, logger: &'a EventLogger, options: IndexOptions) -> Self {
        Self {
            store,
            logger,
            registry: extract::default_registry(),
            tiers: TierFilter::new(),
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn report(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            tx.send(msg).ok();
        }
    }

    /// Ignore filter for a root, honouring the configured preset and excludes
    pub fn ignore_filter(&self, root: &Path) -> IgnoreFilter {
        IgnoreFilter::new(
            root,
            self.options.ignore_file.as_deref(),
            &self.options.ignore_preset,
            Some(&self.options.excludes),
        )
    }

    /// The database and log directory are never indexed
    pub fn is_skipped_path(&self, path: &Path) -> bool {
        self.options.skip_paths.iter().any(|skip| path.starts_with(skip))
    }

    /// Files under `root` that pass the ignore rules and have a known extractor
    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let filter = self.ignore_filter(root);
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let path = e.path();
                path == root
                    || (!self.is_skipped_path(path) && !filter.is_ignored(path, e.file_type().is_dir()))
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Walk error: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.registry.is_supported(p))
            .collect()
    }

    /// Index every supported file under `root` and prune vanished ones
    pub fn index_root(&self, root: &Path) -> Result<IndexStats> {
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        let start = Instant::now();
        let root_key = normalize_path(root);

        self.report(ProgressMessage::Started { phase: ProgressPhase::Scanning, total: 0 });
        let files = self.scan(root);
        self.report(ProgressMessage::Finished { phase: ProgressPhase::Scanning });

        let known = self.store.hashes_under(&root_key)?;
        tracing::info!("Indexing {} files under {} ({} known)", files.len(), root_key, known.len());

        let mut stats = IndexStats {
            scanned: files.len(),
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::with_capacity(files.len());

        self.report(ProgressMessage::Started { phase: ProgressPhase::Indexing, total: files.len() });
        self.run_workers(&files, &known, &mut stats, &mut seen)?;
        self.report(ProgressMessage::Finished { phase: ProgressPhase::Indexing });

        // Prune rows whose files vanished
        self.report(ProgressMessage::Started { phase: ProgressPhase::Pruning, total: 0 });
        let vanished: Vec<&String> = known
            .keys()
            .filter(|p| !seen.contains(*p) && !Path::new(p).exists())
            .collect();
        if !vanished.is_empty() {
            self.in_transaction(|| {
                for path in vanished {
                    self.store.delete_file(path)?;
                    self.record_deleted(path, &mut stats);
                }
                Ok(())
            })?;
        }
        self.report(ProgressMessage::Finished { phase: ProgressPhase::Pruning });

        // Tags applied to unchanged files still change search results
        let touched = if self.options.tags.is_empty() {
            stats.changed()
        } else {
            stats.changed() + stats.unchanged
        };
        self.after_write(touched)?;
        stats.duration_ms = start.elapsed().as_millis();
        self.logger.log_summary(
            &root_key,
            stats.new + stats.modified,
            start.elapsed().as_secs_f64(),
        );
        tracing::info!("{}", stats);
        Ok(stats)
    }

    fn run_workers(
        &self,
        files: &[PathBuf],
        known: &HashMap<String, String>,
        stats: &mut IndexStats,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let workers = match self.options.workers {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            n => n,
        };
        let (job_tx, job_rx) = channel::bounded::<&PathBuf>(workers * 4);
        let (msg_tx, msg_rx) = channel::unbounded::<IndexMessage>();
        let registry = &self.registry;
        let max_size = self.options.max_file_size;

        std::thread::scope(|scope| -> Result<()> {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let msg_tx = msg_tx.clone();
                scope.spawn(move || {
                    for path in job_rx {
                        let key = normalize_path(path);
                        let known_hash = known.get(&key).map(String::as_str);
                        let msg = worker::process_file(registry, path, key, known_hash, max_size);
                        if msg_tx.send(msg).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(msg_tx);
            drop(job_rx);

            scope.spawn(move || {
                for path in files {
                    if job_tx.send(path).is_err() {
                        break;
                    }
                }
            });

            self.in_transaction(|| {
                let mut pending = 0usize;
                for msg in msg_rx {
                    let path = match &msg {
                        IndexMessage::Processed { path, .. }
                        | IndexMessage::Skipped(path, _)
                        | IndexMessage::Error(path, _) => path.clone(),
                    };
                    seen.insert(path.clone());

                    self.apply_message(msg, stats)?;
                    pending += 1;
                    if pending >= WRITE_BATCH {
                        self.store.commit()?;
                        self.store.begin_transaction()?;
                        pending = 0;
                    }
                    self.report(ProgressMessage::Advanced { file: path });
                }
                Ok(())
            })
        })
    }

    /// Run `body` inside a transaction; any error rolls back the open one
    fn in_transaction<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        self.store.begin_transaction()?;
        match body().and_then(|()| self.store.commit()) {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(rollback) = self.store.rollback() {
                    tracing::debug!("Rollback after failed write: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn record_deleted(&self, path: &str, stats: &mut IndexStats) {
        stats.deleted += 1;
        self.logger.log(FileStatus::Deleted.event_name(), path);
        self.report(ProgressMessage::Changed { status: FileStatus::Deleted, path: path.to_string() });
    }

    fn apply_message(&self, msg: IndexMessage, stats: &mut IndexStats) -> Result<()> {
        match msg {
            IndexMessage::Processed { path, hash, document, status } => {
                if let Some(doc) = document {
                    self.write_document(&path, &hash, &doc)?;
                    match status {
                        FileStatus::New => stats.new += 1,
                        _ => stats.modified += 1,
                    }
                    self.report(ProgressMessage::Changed { status, path: path.clone() });
                    self.logger.log(status.event_name(), &path);
                } else {
                    stats.unchanged += 1;
                }
                if !self.options.tags.is_empty() {
                    self.store.add_tags(&path, &self.options.tags)?;
                }
            }
            IndexMessage::Skipped(path, reason) => {
                tracing::debug!("Skipped {} ({:?})", path, reason);
                stats.skipped += 1;
                // Became binary or too large since it was indexed
                if self.store.delete_file(&path)? {
                    self.record_deleted(&path, stats);
                }
            }
            IndexMessage::Error(path, err) => {
                tracing::warn!("Failed to index {}: {}", path, err);
                stats.failed += 1;
                self.logger.log("INDEX_ERROR", &path);
                self.report(ProgressMessage::Error(format!("{}: {}", path, err)));
            }
        }
        Ok(())
    }

    /// Tier the text and write the file's rows
    fn write_document(&self, path: &str, hash: &str, doc: &ExtractedDocument) -> Result<()> {
        let tiered = self.tiers.apply(&doc.text);
        let (content, clean_content) = if tiered.is_empty() {
            let name = path.rsplit('/').next().unwrap_or(path);
            let placeholder = format!("File: {}", name);
            (placeholder.clone(), placeholder)
        } else {
            (tiered.content.clone(), tiered.clean_content.clone())
        };

        let record = FileRecord {
            path: path.to_string(),
            content,
            clean_content,
            modified: doc.modified.clone(),
            hash: hash.to_string(),
        };
        let metadata = FileMetadata {
            path: path.to_string(),
            title: doc.title.clone(),
            author: doc.author.clone(),
            subject: doc.subject.clone(),
            created: doc.created.clone(),
            last_modified: Some(doc.modified.clone()),
            last_modified_by: None,
            alias: None,
            format: Some(doc.format.clone()),
            size: Some(doc.size as i64),
            semantic_json: Some(tiered.metadata_json()),
        };
        self.store.upsert_file(&record, &metadata)
    }

    /// Index a single file; `None` when it was skipped
    pub fn index_file(&self, path: &Path) -> Result<Option<FileStatus>> {
        let key = normalize_path(path);
        let known = self.store.get_file_hash(&key)?;
        let msg = worker::process_file(
            &self.registry,
            path,
            key,
            known.as_deref(),
            self.options.max_file_size,
        );

        let mut stats = IndexStats::default();
        let status = match &msg {
            IndexMessage::Processed { status, .. } => Some(*status),
            IndexMessage::Skipped(..) | IndexMessage::Error(..) => None,
        };
        self.apply_message(msg, &mut stats)?;
        self.after_write(stats.changed())?;
        Ok(status)
    }

    /// Drop a file from the index; returns whether it was indexed
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        let key = normalize_path(path);
        let removed = self.store.delete_file(&key)?;
        if removed {
            self.logger.log(FileStatus::Deleted.event_name(), &key);
            self.after_write(1)?;
        }
        Ok(removed)
    }

    /// Drop every indexed file below a folder; returns how many were removed
    pub fn remove_tree(&self, dir: &Path) -> Result<usize> {
        let known = self.store.hashes_under(&normalize_path(dir))?;
        if known.is_empty() {
            return Ok(0);
        }
        let mut stats = IndexStats::default();
        self.in_transaction(|| {
            for path in known.keys() {
                if self.store.delete_file(path)? {
                    self.record_deleted(path, &mut stats);
                }
            }
            Ok(())
        })?;
        self.after_write(stats.deleted)?;
        Ok(stats.deleted)
    }

    /// Bump the generation so cached searches go stale, then trim the cache
    fn after_write(&self, changed: usize) -> Result<()> {
        if changed == 0 {
            return Ok(());
        }
        let generation = self.store.bump_generation()?;
        let pruned = self.store.prune_cache(self.options.max_cache_entries)?;
        tracing::debug!("Index generation {} ({} cache entries pruned)", generation, pruned);
        Ok(())
    }
}
