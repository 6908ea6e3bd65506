//! Run orchestration: staging, copy, archive, cleanup, summary.
//!
//! The phase sequence is fixed: Preparing creates a uniquely named staging
//! directory under the system temp dir, Copying stages the filtered tree,
//! Archiving packs it, and CleaningUp removes the staging directory on
//! every exit path. The summary event is always the last event emitted,
//! success or failure.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::archive;
use super::cleanup;
use super::copy_engine::{CopyOutcome, FilteredCopyEngine};
use super::error::RunError;
use super::filter::ExclusionRules;
use super::models::{RunOutcome, RunRequest, RunSummary};
use super::progress::{RunEvent, RunPhase};

pub struct Orchestrator {
    engine: FilteredCopyEngine,
    staging_root: PathBuf,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_rules(ExclusionRules::default())
    }

    pub fn with_rules(rules: ExclusionRules) -> Self {
        Self {
            engine: FilteredCopyEngine::new(rules),
            staging_root: env::temp_dir(),
        }
    }

    /// Place staging directories under `root` instead of the system temp
    /// dir (the staging directory name stays unique per run).
    pub fn staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    /// Execute one run. Never returns an error: failures are captured in
    /// the summary's outcome, and the summary is also emitted as the final
    /// event on `tx`.
    pub async fn run(&self, request: RunRequest, tx: mpsc::Sender<RunEvent>) -> RunSummary {
        let span = info_span!(
            "archive_run",
            source = %request.source.display(),
            output = %request.output.display()
        );

        async {
            info!("Starting archive run");

            let _ = tx.send(RunEvent::Phase(RunPhase::Preparing)).await;

            let staging = self.staging_path();
            if let Err(e) = fs::create_dir_all(&staging) {
                // Nothing staged yet, so nothing to clean up
                let error = RunError::Staging {
                    path: staging,
                    source: e,
                };
                warn!(error = %error, "Run failed before staging");
                let summary = RunSummary {
                    counters: Default::default(),
                    bytes_copied: 0,
                    outcome: RunOutcome::Failed(error.to_string()),
                    cleanup_warning: None,
                };
                let _ = tx.send(RunEvent::Summary(summary.clone())).await;
                return summary;
            }

            let mut copied = CopyOutcome::default();
            let result = self
                .copy_and_archive(&request, &staging, &tx, &mut copied)
                .await;

            let _ = tx.send(RunEvent::Phase(RunPhase::CleaningUp)).await;
            let cleanup_warning = match cleanup_staging(staging).await {
                Ok(()) => None,
                Err(message) => {
                    let _ = tx
                        .send(RunEvent::CleanupWarning {
                            message: message.clone(),
                        })
                        .await;
                    Some(message)
                }
            };

            let outcome = match result {
                Ok(()) => RunOutcome::Success,
                Err(e) => RunOutcome::Failed(e.to_string()),
            };

            let summary = RunSummary {
                counters: copied.counters,
                bytes_copied: copied.bytes_copied,
                outcome,
                cleanup_warning,
            };

            info!(
                processed = summary.counters.total_processed(),
                ignored = summary.counters.total_ignored(),
                success = summary.outcome.is_success(),
                "Run finished"
            );

            let _ = tx.send(RunEvent::Summary(summary.clone())).await;
            summary
        }
        .instrument(span)
        .await
    }

    async fn copy_and_archive(
        &self,
        request: &RunRequest,
        staging: &Path,
        tx: &mpsc::Sender<RunEvent>,
        copied: &mut CopyOutcome,
    ) -> Result<(), RunError> {
        let _ = tx.send(RunEvent::Phase(RunPhase::Copying)).await;
        *copied = self.engine.copy(&request.source, staging, tx.clone()).await?;

        let _ = tx.send(RunEvent::Phase(RunPhase::Archiving)).await;
        let staged = staging.to_path_buf();
        let output = request.output.clone();
        tokio::task::spawn_blocking(move || archive::build_archive(&staged, &output)).await??;

        Ok(())
    }

    /// Uniquely named staging directory, owned by exactly one run.
    fn staging_path(&self) -> PathBuf {
        self.staging_root.join(format!("projpack-{}", Uuid::now_v7()))
    }
}

async fn cleanup_staging(staging: PathBuf) -> Result<(), String> {
    let display = staging.display().to_string();
    let result = tokio::task::spawn_blocking(move || cleanup::remove_tree_robustly(&staging)).await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("could not remove staging directory {display}: {e}")),
        Err(e) => Err(format!("staging cleanup task failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn run_to_completion(
        orchestrator: Orchestrator,
        request: RunRequest,
    ) -> (RunSummary, Vec<RunEvent>) {
        let (tx, mut rx) = mpsc::channel(256);

        let handle = tokio::spawn(async move { orchestrator.run(request, tx).await });

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        (handle.await.unwrap(), events)
    }

    #[tokio::test]
    async fn successful_run_emits_phases_and_summary_last() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("proj");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("main.rs"), b"fn main() {}").unwrap();

        let output = temp.path().join("proj.zip");
        let (summary, events) = run_to_completion(
            Orchestrator::new(),
            RunRequest {
                source,
                output: output.clone(),
            },
        )
        .await;

        assert!(summary.outcome.is_success());
        assert!(summary.cleanup_warning.is_none());
        assert_eq!(summary.counters.processed_files, 1);
        assert!(output.exists());

        let phases: Vec<RunPhase> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Phase(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                RunPhase::Preparing,
                RunPhase::Copying,
                RunPhase::Archiving,
                RunPhase::CleaningUp,
            ]
        );
        assert!(matches!(events.last(), Some(RunEvent::Summary(_))));
    }

    #[tokio::test]
    async fn archive_failure_still_cleans_up_and_reports_counters() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("proj");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("kept.txt"), b"data").unwrap();

        let staging_root = temp.path().join("staging-root");
        fs::create_dir(&staging_root).unwrap();

        // Unwritable output location makes the archive phase fail
        let output = temp.path().join("no-such-dir/out.zip");
        let (summary, events) = run_to_completion(
            Orchestrator::new().staging_root(&staging_root),
            RunRequest { source, output },
        )
        .await;

        assert!(!summary.outcome.is_success());
        // Copy phase completed before the failure, so counters are real
        assert_eq!(summary.counters.processed_files, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::Phase(RunPhase::CleaningUp))));
        assert!(matches!(events.last(), Some(RunEvent::Summary(_))));

        // Cleanup ran on the failure path too
        assert_eq!(fs::read_dir(&staging_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_source_fails_without_an_archive() {
        let temp = tempdir().unwrap();
        let output = temp.path().join("out.zip");
        let (summary, _) = run_to_completion(
            Orchestrator::new(),
            RunRequest {
                source: temp.path().join("nope"),
                output: output.clone(),
            },
        )
        .await;

        assert!(!summary.outcome.is_success());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn staging_directory_is_gone_after_a_successful_run() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("proj");
        fs::create_dir_all(source.join("src")).unwrap();
        fs::write(source.join("src/lib.rs"), b"pub fn f() {}").unwrap();

        let staging_root = temp.path().join("staging-root");
        fs::create_dir(&staging_root).unwrap();

        let (summary, _) = run_to_completion(
            Orchestrator::new().staging_root(&staging_root),
            RunRequest {
                source,
                output: temp.path().join("proj.zip"),
            },
        )
        .await;

        assert!(summary.outcome.is_success());
        assert!(summary.cleanup_warning.is_none());
        assert_eq!(fs::read_dir(&staging_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unusable_staging_root_is_fatal_before_copying() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("proj");
        fs::create_dir(&source).unwrap();

        // A file where the staging root should be
        let staging_root = temp.path().join("blocked");
        fs::write(&staging_root, b"x").unwrap();

        let output = temp.path().join("out.zip");
        let (summary, events) = run_to_completion(
            Orchestrator::new().staging_root(&staging_root),
            RunRequest {
                source,
                output: output.clone(),
            },
        )
        .await;

        assert!(!summary.outcome.is_success());
        assert!(!output.exists());
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunEvent::Phase(RunPhase::Copying))));
    }
}
