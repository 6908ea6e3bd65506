pub mod archive;
pub mod cleanup;
pub mod copy_engine;
pub mod error;
pub mod filter;
pub mod models;
pub mod orchestrator;
pub mod progress;

pub use copy_engine::{CopyOutcome, FilteredCopyEngine};
pub use error::RunError;
pub use filter::ExclusionRules;
pub use models::{RunCounters, RunOutcome, RunRequest, RunSummary};
pub use orchestrator::Orchestrator;
pub use progress::{RunEvent, RunPhase};
