//! Robust removal of the staging directory.
//!
//! Read-only bits are cleared before each delete attempt so the recursive
//! remove does not trip over write-protected files. Transient failures
//! (locks held by scanners, permission hiccups) are retried with a fixed
//! delay; after the retry budget the error is surfaced to the caller as a
//! warning, never as a crash.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Delete attempts before giving up
const MAX_ATTEMPTS: u32 = 5;

/// Fixed delay between attempts; no exponential backoff
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Best-effort recursive delete of `path`.
///
/// Returns `Ok(())` immediately if the path no longer exists. On final
/// failure the last error is returned for reporting; callers must treat it
/// as a warning, not a run failure.
pub fn remove_tree_robustly(path: &Path) -> io::Result<()> {
    let mut last_error = None;

    for attempt in 1..=MAX_ATTEMPTS {
        if !path.exists() {
            return Ok(());
        }

        clear_readonly_attributes(path);

        match fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            // Raced with concurrent removal; the tree is gone either way
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) if attempt < MAX_ATTEMPTS && is_transient_fs_error(&e) => {
                debug!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "Staging delete failed, retrying"
                );
                last_error = Some(e);
                thread::sleep(RETRY_DELAY);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Staging delete failed");
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| io::Error::other("staging delete retries exhausted")))
}

/// Strip the read-only bit from every file in the tree. Individual
/// failures are ignored; the subsequent delete attempt reports them.
fn clear_readonly_attributes(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            if let Err(e) = fs::set_permissions(entry.path(), permissions) {
                debug!(path = %entry.path().display(), error = %e, "Could not clear read-only bit");
            }
        }
    }
}

/// Errors worth retrying: the kinds raised when another process briefly
/// holds a file open or a permission change has not settled yet.
fn is_transient_fs_error(error: &io::Error) -> bool {
    match error.kind() {
        ErrorKind::PermissionDenied => true,
        ErrorKind::ResourceBusy => true,
        ErrorKind::DirectoryNotEmpty => true,
        _ => {
            if let Some(os_error) = error.raw_os_error() {
                matches!(
                    os_error,
                    libc::EACCES | libc::EPERM | libc::EBUSY | libc::ETXTBSY | libc::ENOTEMPTY
                )
            } else {
                false
            }
        }
    }
}
