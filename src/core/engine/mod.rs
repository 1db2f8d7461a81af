//! Pipeline execution engine.
//!
//! [`PipelineExecutor`] walks a validated pipeline in order: probe, acquire a
//! slot in the bounded active set, execute, record, report. The first failure
//! halts the run.

mod executor;
mod report;
mod slots;
mod state;

pub use executor::{CancellationToken, ExecutorConfig, PipelineExecutor, DEFAULT_MAX_ACTIVE};
pub use report::{ExecutionReport, FailureDetail, RunStatus, RunSummary, StepOutcome, StepStatus};
pub use slots::{ActiveSet, SlotPermit, SlotPool};
pub use state::{ExecutionPhase, ExecutionState};
