//! NDJSON event log
//!
//! Indexing events are queued to a background thread that appends them in
//! batches to `<log dir>/<date>_index_events.ndjson`, rotating by size and
//! deleting files past the retention window. `logs clean` merges the files
//! back into a single export.

pub mod clean;
pub mod entry;
pub mod writer;

pub use clean::{clean_logs, CleanOptions, CleanReport, ExportFormat};
pub use entry::{LogEntry, SummaryEntry};
pub use writer::EventLogger;
