use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use projpack::core::{Orchestrator, RunEvent, RunRequest};
use projpack::logging::{self, LogConfig, LogThrottle};
use projpack::validate;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "projpack")]
#[command(about = "Pack a project directory into a zip archive, skipping build output", long_about = None)]
struct Cli {
    /// Project directory to archive
    source: PathBuf,

    /// Output zip path; defaults to <source name>.zip next to the source
    output: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,

    /// Print every per-file progress line instead of a throttled sample
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogConfig {
        json: cli.json_logs,
        verbose: cli.verbose,
    });

    let source = cli.source;
    let output = cli
        .output
        .unwrap_or_else(|| default_output_path(&source));

    validate::validate_run(&source, &output).context("Refusing to start")?;

    // Cancellation is only honored here, before the run begins; once it
    // starts it proceeds to completion including cleanup
    if !cli.yes && !confirm(&source, &output)? {
        println!("Cancelled.");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = Orchestrator::new();
    let request = RunRequest {
        source,
        output,
    };

    let handle = tokio::spawn(async move { orchestrator.run(request, tx).await });

    let throttle = LogThrottle::new(Duration::from_millis(200));
    while let Some(event) = rx.recv().await {
        match &event {
            // Per-file success lines are sampled unless --verbose
            RunEvent::FileCopied { .. } | RunEvent::DirectoryCreated { .. } if !cli.verbose => {
                if throttle.should_log() {
                    println!("{event}");
                }
            }
            _ => println!("{event}"),
        }
    }

    let summary = handle.await.context("Archive run task failed")?;
    match summary.outcome {
        projpack::core::RunOutcome::Success => Ok(()),
        projpack::core::RunOutcome::Failed(message) => bail!(message),
    }
}

/// Default archive path: the source directory's name plus `.zip`, placed
/// beside the source.
fn default_output_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "ProjectArchive".to_string());
    source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{name}.zip"))
}

fn confirm(source: &Path, output: &Path) -> Result<bool> {
    print!(
        "Archive '{}' into '{}'? [y/N] ",
        source.display(),
        output.display()
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}
