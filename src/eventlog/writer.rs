//! Background NDJSON writer with batching, rotation and retention

use super::entry::{LogEntry, SummaryEntry};
use crate::config::{LogPartition, LogSettings};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Suffix shared by every event log file
pub const LOG_SUFFIX: &str = "_index_events";

enum LogCommand {
    Line(String),
    Flush(Sender<()>),
}

/// Handle to the background log writer. Dropping it flushes pending lines.
pub struct EventLogger {
    tx: Option<Sender<LogCommand>>,
    handle: Option<thread::JoinHandle<()>>,
    echo: bool,
}

impl EventLogger {
    /// Spawn the writer thread for `dir`
    pub fn start(settings: &LogSettings, dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        let (tx, rx) = channel::unbounded();
        let writer = LogWriter::new(settings, dir);
        let batch_size = settings.batch_size.max(1);
        let interval = Duration::from_millis(settings.flush_interval_ms.max(10));

        let handle = thread::Builder::new()
            .name("indexly-eventlog".to_string())
            .spawn(move || writer.run(rx, batch_size, interval))?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            echo: false,
        })
    }

    /// Logger that drops every event
    pub fn disabled() -> Self {
        Self {
            tx: None,
            handle: None,
            echo: false,
        }
    }

    /// Also print each event line through `tracing`
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn log(&self, event: &str, path: &str) {
        let entry = LogEntry::new(event, path, Local::now());
        if self.echo {
            tracing::info!("[{}] [{}] {}", entry.timestamp, event, path);
        }
        self.send(&entry);
    }

    pub fn log_summary(&self, root: &str, count: usize, duration_seconds: f64) {
        let entry = SummaryEntry::new(root, count, duration_seconds, Local::now());
        self.send(&entry);
    }

    fn send<T: serde::Serialize>(&self, entry: &T) {
        let Some(tx) = &self.tx else {
            return;
        };
        match serde_json::to_string(entry) {
            Ok(line) => {
                tx.send(LogCommand::Line(line)).ok();
            }
            Err(e) => tracing::warn!("Failed to encode log entry: {}", e),
        }
    }

    /// Block until every queued line is on disk
    pub fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (ack_tx, ack_rx) = channel::bounded(1);
            if tx.send(LogCommand::Flush(ack_tx)).is_ok() {
                ack_rx.recv_timeout(Duration::from_secs(10)).ok();
            }
        }
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

struct LogWriter {
    dir: PathBuf,
    max_bytes: u64,
    retention_days: i64,
    partition: LogPartition,
    /// File of the previous batch; retention runs whenever this changes
    current: Option<PathBuf>,
}

impl LogWriter {
    fn new(settings: &LogSettings, dir: PathBuf) -> Self {
        Self {
            dir,
            max_bytes: settings.max_bytes,
            retention_days: settings.retention_days,
            partition: settings.partition,
            current: None,
        }
    }

    fn run(mut self, rx: Receiver<LogCommand>, batch_size: usize, interval: Duration) {
        self.apply_retention(Local::now());
        let mut buffer: Vec<String> = Vec::with_capacity(batch_size);

        loop {
            match rx.recv_timeout(interval) {
                Ok(LogCommand::Line(line)) => {
                    buffer.push(line);
                    if buffer.len() >= batch_size {
                        self.write_batch(&mut buffer);
                    }
                }
                Ok(LogCommand::Flush(ack)) => {
                    self.write_batch(&mut buffer);
                    ack.send(()).ok();
                }
                Err(RecvTimeoutError::Timeout) => self.write_batch(&mut buffer),
                Err(RecvTimeoutError::Disconnected) => {
                    self.write_batch(&mut buffer);
                    break;
                }
            }
        }
    }

    fn write_batch(&mut self, buffer: &mut Vec<String>) {
        self.write_batch_at(buffer, Local::now());
    }

    fn write_batch_at(&mut self, buffer: &mut Vec<String>, now: DateTime<Local>) {
        if buffer.is_empty() {
            return;
        }
        let target = target_file(&self.dir, &partition_stem(now, self.partition), self.max_bytes);
        if self.current.as_ref() != Some(&target) {
            // New partition or size rotation
            if self.current.is_some() {
                self.apply_retention(now);
            }
            self.current = Some(target.clone());
        }

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .and_then(|mut file| {
                let mut payload = buffer.join("\n");
                payload.push('\n');
                file.write_all(payload.as_bytes())
            });

        match result {
            Ok(()) => buffer.clear(),
            Err(e) => {
                tracing::warn!("Failed to write event log {}: {}", target.display(), e);
                buffer.clear();
            }
        }
    }

    fn apply_retention(&self, now: DateTime<Local>) {
        match prune_old_logs(&self.dir, self.retention_days, now.date_naive()) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Removed {} expired event logs", n),
            Err(e) => tracing::warn!("Event log retention failed: {}", e),
        }
    }
}

/// `<YYYY-MM-DD>_index_events` or `<YYYY-MM-DD>T<HH>_index_events`
pub fn partition_stem(now: DateTime<Local>, partition: LogPartition) -> String {
    match partition {
        LogPartition::Daily => format!("{}{}", now.format("%Y-%m-%d"), LOG_SUFFIX),
        LogPartition::Hourly => format!("{}{}", now.format("%Y-%m-%dT%H"), LOG_SUFFIX),
    }
}

/// First file of the `stem`, `stem_1`, `stem_2`, ... sequence that is below `max_bytes`
pub fn target_file(dir: &Path, stem: &str, max_bytes: u64) -> PathBuf {
    let mut counter = 0usize;
    loop {
        let name = if counter == 0 {
            format!("{}.ndjson", stem)
        } else {
            format!("{}_{}.ndjson", stem, counter)
        };
        let path = dir.join(name);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.len() >= max_bytes => counter += 1,
            _ => return path,
        }
    }
}

/// Date a log file belongs to, from its `YYYY-MM-DD` prefix
pub fn log_file_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let prefix = name.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Delete event logs older than `retention_days`; returns how many were removed
pub fn prune_old_logs(dir: &Path, retention_days: i64, today: NaiveDate) -> std::io::Result<usize> {
    let cutoff = today - ChronoDuration::days(retention_days);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(".ndjson") && n.contains(LOG_SUFFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }
        if let Some(date) = log_file_date(&path) {
            if date < cutoff {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}
