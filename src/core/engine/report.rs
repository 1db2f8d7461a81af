use serde::Serialize;
use uuid::Uuid;

use crate::error::{CauseDetails, Error, Hint, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Skipped,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step: String,
    pub capability: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    pub timestamp: String,
    pub elapsed_ms: u64,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub index: usize,
    pub step: String,
    pub capability: String,
    pub error: CauseDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_run: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub status: RunStatus,
    pub outcomes: Vec<StepOutcome>,
    pub started_at: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<usize>,
    pub peak_active: usize,
    pub max_active: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub reporter_errors: usize,
    pub summary: RunSummary,
    #[serde(skip)]
    pub(crate) cause: Option<Error>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn statuses(&self) -> Vec<StepStatus> {
        self.outcomes.iter().map(|o| o.status).collect()
    }

    /// The wrapped `step.execution_failed` error of a failed run.
    pub fn error(&self) -> Option<&Error> {
        self.cause.as_ref()
    }

    /// `Ok(self)` for a completed run, otherwise the step failure or abort
    /// as an error.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            RunStatus::Completed => Ok(self),
            RunStatus::Failed => Err(self.cause.unwrap_or_else(|| {
                Error::internal_unexpected(format!(
                    "Pipeline '{}' failed without a recorded cause",
                    self.pipeline
                ))
            })),
            RunStatus::Aborted => Err(Error::pipeline_aborted(
                self.pipeline,
                self.aborted_at.unwrap_or(self.outcomes.len()),
            )),
        }
    }
}

pub(crate) fn build_summary(
    outcomes: &[StepOutcome],
    total_steps: usize,
    status: RunStatus,
) -> RunSummary {
    let count = |wanted: StepStatus| outcomes.iter().filter(|o| o.status == wanted).count();

    let next_actions = match status {
        RunStatus::Failed => vec![
            "Fix the failing step and re-run (steps whose goal state exists will be skipped)"
                .to_string(),
        ],
        RunStatus::Aborted => vec!["Re-run the pipeline to resume from the first unfinished step"
            .to_string()],
        RunStatus::Completed => Vec::new(),
    };

    RunSummary {
        total_steps,
        completed: count(StepStatus::Completed),
        skipped: count(StepStatus::Skipped),
        failed: count(StepStatus::Failed),
        not_run: total_steps.saturating_sub(outcomes.len()),
        next_actions,
    }
}
