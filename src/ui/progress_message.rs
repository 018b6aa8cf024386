use crate::FileStatus;

/// Stage of an indexing run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Walking the root and applying ignore rules
    Scanning,
    /// Hashing, extracting and writing files
    Indexing,
    /// Dropping rows of files that no longer exist
    Pruning,
}

/// Update sent from the indexer to the render thread
#[derive(Clone, Debug)]
pub enum ProgressMessage {
    /// `total` is only meaningful for [`ProgressPhase::Indexing`]
    Started { phase: ProgressPhase, total: usize },
    /// One more file went through the indexing stage
    Advanced { file: String },
    Finished { phase: ProgressPhase },
    /// A row was written or removed
    Changed { status: FileStatus, path: String },
    Error(String),
}
