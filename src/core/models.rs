use std::path::PathBuf;

/// Per-run tally of copy outcomes. Reset at run start, mutated only by the
/// copy engine, read by the orchestrator to build the final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub processed_files: u64,
    pub processed_directories: u64,
    pub ignored_files: u64,
    pub ignored_directories: u64,
}

impl RunCounters {
    pub fn total_processed(&self) -> u64 {
        self.processed_files + self.processed_directories
    }

    pub fn total_ignored(&self) -> u64 {
        self.ignored_files + self.ignored_directories
    }
}

/// The two caller-supplied paths for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Existing directory to stage and archive.
    pub source: PathBuf,
    /// Final archive path; replaced if it already exists.
    pub output: PathBuf,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

/// Final report for one run, always produced whether the run succeeded,
/// failed, or completed with a cleanup warning.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub bytes_copied: u64,
    pub outcome: RunOutcome,
    /// Set when the staging directory could not be removed after the retry
    /// budget was exhausted; the run outcome is unaffected.
    pub cleanup_warning: Option<String>,
}
