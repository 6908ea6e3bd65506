//! Pre-run validation.
//!
//! A stateless check any front end can call before starting a run; nothing
//! here touches the run state. The containment check uses real path-segment
//! boundaries, so `project2` is not treated as lying inside `project`.

use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source path is empty")]
    EmptySource,

    #[error("output path is empty")]
    EmptyOutput,

    #[error("source directory does not exist: {0}")]
    SourceMissing(String),

    #[error("source path is not a directory: {0}")]
    SourceNotADirectory(String),

    #[error("output parent directory is not resolvable: {path}: {source}")]
    OutputParentUnresolvable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("output archive would end up inside the source tree: {0}")]
    OutputInsideSource(String),
}

/// Validate the caller-supplied paths for a run.
///
/// Rejects empty paths, a missing or non-directory source, an unresolvable
/// output parent, and an output whose parent lies strictly inside the
/// source tree (the source directory itself is allowed).
pub fn validate_run(source: &Path, output: &Path) -> Result<(), ValidationError> {
    if source.as_os_str().is_empty() {
        return Err(ValidationError::EmptySource);
    }
    if output.as_os_str().is_empty() {
        return Err(ValidationError::EmptyOutput);
    }

    if !source.exists() {
        return Err(ValidationError::SourceMissing(
            source.display().to_string(),
        ));
    }
    if !source.is_dir() {
        return Err(ValidationError::SourceNotADirectory(
            source.display().to_string(),
        ));
    }

    // Canonicalization resolves `..`, symlinks, and relative forms so the
    // containment test compares real path segments
    let canonical_source = source
        .canonicalize()
        .map_err(|_| ValidationError::SourceMissing(source.display().to_string()))?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent =
        parent
            .canonicalize()
            .map_err(|e| ValidationError::OutputParentUnresolvable {
                path: parent.display().to_string(),
                source: e,
            })?;

    if canonical_parent.starts_with(&canonical_source) && canonical_parent != canonical_source {
        return Err(ValidationError::OutputInsideSource(
            output.display().to_string(),
        ));
    }

    Ok(())
}

/// Whether a run may start right now. The pure predicate front ends use
/// for command enablement.
pub fn can_run(source: &Path, output: &Path, is_running: bool) -> bool {
    !is_running && validate_run(source, output).is_ok()
}
