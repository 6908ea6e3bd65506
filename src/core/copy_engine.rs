//! Filtered copy engine.
//!
//! Stages a filtered mirror of the source tree into the staging root in
//! three phases, each on the blocking pool:
//! 1. Scan: enumerate every directory and file under the source (no
//!    pruning, so the counter laws hold exactly).
//! 2. Mirror directories, consulting the exclusion rules per item.
//! 3. Copy files with buffered I/O and timestamp preservation.
//!
//! A single bad item never fails the run: per-item I/O errors are counted
//! as ignored, reported as progress events, and the engine moves on.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::RunError;
use super::filter::ExclusionRules;
use super::models::RunCounters;
use super::progress::RunEvent;

/// Buffer size for file I/O (128KB for throughput)
const BUFFER_SIZE: usize = 128 * 1024;

pub struct FilteredCopyEngine {
    rules: ExclusionRules,
}

/// What the engine hands back to the orchestrator after one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOutcome {
    pub counters: RunCounters,
    pub bytes_copied: u64,
}

impl Default for FilteredCopyEngine {
    fn default() -> Self {
        Self::new(ExclusionRules::default())
    }
}

impl FilteredCopyEngine {
    pub fn new(rules: ExclusionRules) -> Self {
        Self { rules }
    }

    /// Stage a filtered copy of `source` into `destination`.
    ///
    /// Fatal only when the source root itself cannot be enumerated;
    /// everything else degrades to counted, reported per-item failures.
    pub async fn copy(
        &self,
        source: &Path,
        destination: &Path,
        tx: mpsc::Sender<RunEvent>,
    ) -> Result<CopyOutcome, RunError> {
        let scan = scan_tree(source).await?;

        debug!(
            total_files = scan.files.len(),
            total_dirs = scan.directories.len(),
            "Scan complete"
        );

        let counters = mirror_directories(
            source,
            destination,
            scan.directories,
            self.rules.clone(),
            tx.clone(),
        )
        .await?;

        copy_files(
            source,
            destination,
            scan.files,
            self.rules.clone(),
            counters,
            tx,
        )
        .await
    }
}

/// Result of scanning the source tree
#[derive(Default)]
struct ScanResult {
    /// All files found (absolute paths), including those under ignored
    /// directories; classification happens later, per item.
    files: Vec<FileInfo>,
    /// All directories found (absolute paths), parents before children
    directories: Vec<PathBuf>,
}

struct FileInfo {
    path: PathBuf,
    size: u64,
}

/// Enumerate every directory and file under `source` recursively.
async fn scan_tree(source: &Path) -> Result<ScanResult, RunError> {
    let source = source.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let entries = fs::read_dir(&source).map_err(|e| RunError::Scan {
            path: source.clone(),
            source: e,
        })?;

        let mut result = ScanResult::default();
        scan_entries(entries, &mut result);
        Ok(result)
    })
    .await?
}

fn scan_entries(entries: fs::ReadDir, out: &mut ScanResult) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();

        // symlink_metadata so symlinks are not followed
        let metadata = match path.symlink_metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if metadata.is_dir() {
            out.directories.push(path.clone());
            match fs::read_dir(&path) {
                Ok(children) => scan_entries(children, out),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable directory")
                }
            }
        } else if metadata.is_file() {
            out.files.push(FileInfo {
                path,
                size: metadata.len(),
            });
        }
        // Symlinks and other special files are not staged
    }
}

/// Mirror every non-ignored directory into the staging root.
async fn mirror_directories(
    source: &Path,
    destination: &Path,
    directories: Vec<PathBuf>,
    rules: ExclusionRules,
    tx: mpsc::Sender<RunEvent>,
) -> Result<RunCounters, RunError> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();

    let counters = tokio::task::spawn_blocking(move || {
        let mut counters = RunCounters::default();

        for dir_path in &directories {
            let relative = dir_path
                .strip_prefix(&source)
                .expect("directory should be under source")
                .to_path_buf();

            if rules.ignores_directory(&relative) {
                counters.ignored_directories += 1;
                let _ = tx.blocking_send(RunEvent::DirectoryIgnored { relative });
                continue;
            }

            let dest_dir = destination.join(&relative);
            match fs::create_dir_all(&dest_dir) {
                Ok(()) => {
                    counters.processed_directories += 1;
                    let _ = tx.blocking_send(RunEvent::DirectoryCreated { relative });
                }
                Err(e) => {
                    warn!(
                        path = %relative.display(),
                        error = %e,
                        "Failed to create directory"
                    );
                    counters.ignored_directories += 1;
                    let _ = tx.blocking_send(RunEvent::DirectoryFailed {
                        relative,
                        message: e.to_string(),
                    });
                }
            }
        }

        counters
    })
    .await?;

    Ok(counters)
}

/// Copy every non-ignored file into the staging root.
async fn copy_files(
    source: &Path,
    destination: &Path,
    files: Vec<FileInfo>,
    rules: ExclusionRules,
    counters: RunCounters,
    tx: mpsc::Sender<RunEvent>,
) -> Result<CopyOutcome, RunError> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut counters = counters;
        let mut bytes_copied: u64 = 0;

        for file_info in &files {
            let relative = file_info
                .path
                .strip_prefix(&source)
                .expect("file should be under source")
                .to_path_buf();

            if rules.ignores_file(&relative) {
                counters.ignored_files += 1;
                let _ = tx.blocking_send(RunEvent::FileIgnored { relative });
                continue;
            }

            let dest_path = destination.join(&relative);
            debug!(file = %relative.display(), size = file_info.size, "Copying file");

            match copy_single_file(&file_info.path, &dest_path) {
                Ok(file_bytes) => {
                    bytes_copied += file_bytes;
                    counters.processed_files += 1;
                    let _ = tx.blocking_send(RunEvent::FileCopied { relative });
                }
                Err(e) => {
                    warn!(
                        file = %relative.display(),
                        error = %e,
                        "Failed to copy file"
                    );
                    counters.ignored_files += 1;
                    let _ = tx.blocking_send(RunEvent::FileFailed {
                        relative,
                        message: e.to_string(),
                    });
                }
            }
        }

        CopyOutcome {
            counters,
            bytes_copied,
        }
    })
    .await?;

    Ok(outcome)
}

/// Copy a single file, overwriting any existing destination file.
fn copy_single_file(source: &Path, dest: &Path) -> std::io::Result<u64> {
    let source_metadata = fs::metadata(source)?;

    let source_file = File::open(source)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);

    let dest_file = File::create(dest)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut bytes_written: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
        bytes_written += bytes_read as u64;
    }

    writer.flush()?;

    // Preserve permissions; failures here are tolerated on filesystems
    // that do not support them
    let permissions = source_metadata.permissions();
    if let Err(e) = fs::set_permissions(dest, permissions) {
        debug!(dest = %dest.display(), error = %e, "Failed to set file permissions");
    }

    if let Err(e) = preserve_timestamps(&source_metadata, dest) {
        debug!(dest = %dest.display(), error = %e, "Failed to preserve file timestamps");
    }

    Ok(bytes_written)
}

/// Carry access and modification times over to the destination
fn preserve_timestamps(source_metadata: &fs::Metadata, dest: &Path) -> std::io::Result<()> {
    let atime = filetime::FileTime::from_last_access_time(source_metadata);
    let mtime = filetime::FileTime::from_last_modification_time(source_metadata);
    filetime::set_file_times(dest, atime, mtime)
}
