//! Progress events for a single run.
//!
//! Events are delivered over a `tokio::sync::mpsc` channel, fire-and-forget
//! and in order. The `Display` impl renders the human-readable status line
//! a front end shows for each event; front ends that want structure can
//! match on the variants instead.

use std::fmt;
use std::path::PathBuf;

use super::models::{RunOutcome, RunSummary};

/// Phases of the run state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Preparing,
    Copying,
    Archiving,
    CleaningUp,
}

/// One progress notification. Every directory-creation and file-copy
/// attempt produces exactly one item-level event, success or failure.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Phase(RunPhase),
    DirectoryCreated { relative: PathBuf },
    DirectoryIgnored { relative: PathBuf },
    DirectoryFailed { relative: PathBuf, message: String },
    FileCopied { relative: PathBuf },
    FileIgnored { relative: PathBuf },
    FileFailed { relative: PathBuf, message: String },
    /// Staging-directory removal gave up after the retry budget.
    CleanupWarning { message: String },
    /// Always the final event on the channel.
    Summary(RunSummary),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Preparing => write!(f, "Creating staging directory..."),
            RunPhase::Copying => write!(f, "Copying project files..."),
            RunPhase::Archiving => write!(f, "Building archive... this may take a while."),
            RunPhase::CleaningUp => write!(f, "Cleaning up staging directory..."),
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Phase(phase) => write!(f, "{phase}"),
            RunEvent::DirectoryCreated { relative } => {
                write!(f, "Creating directory: {}", relative.display())
            }
            RunEvent::DirectoryIgnored { relative } => {
                write!(f, "Ignoring directory: {}", relative.display())
            }
            RunEvent::DirectoryFailed { relative, message } => {
                write!(
                    f,
                    "Error: could not create directory '{}' - {message}",
                    relative.display()
                )
            }
            RunEvent::FileCopied { relative } => {
                write!(f, "Copying file: {}", relative.display())
            }
            RunEvent::FileIgnored { relative } => {
                write!(f, "Ignoring file: {}", relative.display())
            }
            RunEvent::FileFailed { relative, message } => {
                write!(
                    f,
                    "Error: could not copy file '{}' - {message}",
                    relative.display()
                )
            }
            RunEvent::CleanupWarning { message } => {
                write!(f, "Error while cleaning up staging directory: {message}")
            }
            RunEvent::Summary(summary) => write!(f, "{summary}"),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Success => write!(f, "Archive complete!")?,
            RunOutcome::Failed(message) => write!(f, "Run failed: {message}.")?,
        }
        let c = &self.counters;
        write!(
            f,
            " Copied {} items (files: {}, directories: {}, {} bytes)",
            c.total_processed(),
            c.processed_files,
            c.processed_directories,
            self.bytes_copied,
        )?;
        if c.total_ignored() > 0 {
            write!(
                f,
                ", ignored {} items (files: {}, directories: {})",
                c.total_ignored(),
                c.ignored_files,
                c.ignored_directories,
            )?;
        }
        write!(f, ".")?;
        if let Some(warning) = &self.cleanup_warning {
            write!(f, " Warning: {warning}")?;
        }
        Ok(())
    }
}
