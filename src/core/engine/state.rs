use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;

use super::report::{build_summary, ExecutionReport, FailureDetail, RunStatus, StepOutcome};
use super::slots::ActiveSet;

/// `Idle → Running → {Completed, Failed, Aborted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Idle,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl ExecutionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionPhase::Completed | ExecutionPhase::Failed | ExecutionPhase::Aborted
        )
    }
}

/// Mutable per-run state. Created by the executor for one `execute` call and
/// consumed into an [`ExecutionReport`].
#[derive(Debug)]
pub struct ExecutionState {
    run_id: Uuid,
    phase: ExecutionPhase,
    index: usize,
    pub(crate) active: ActiveSet,
    outcomes: Vec<StepOutcome>,
    failure: Option<(FailureDetail, Error)>,
    aborted_at: Option<usize>,
    reporter_errors: usize,
    started: Instant,
    started_at: String,
}

impl ExecutionState {
    pub fn new(max_active: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: ExecutionPhase::Idle,
            index: 0,
            active: ActiveSet::new(max_active),
            outcomes: Vec::new(),
            failure: None,
            aborted_at: None,
            reporter_errors: 0,
            started: Instant::now(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    pub fn is_running(&self) -> bool {
        self.phase == ExecutionPhase::Running
    }

    pub fn start(&mut self) {
        if self.phase == ExecutionPhase::Idle {
            self.phase = ExecutionPhase::Running;
            self.index = 0;
            self.started = Instant::now();
            self.started_at = chrono::Utc::now().to_rfc3339();
        }
    }

    /// Append the outcome of the current step and advance.
    pub fn record(&mut self, outcome: StepOutcome) {
        debug_assert!(self.is_running());
        debug_assert_eq!(outcome.index, self.outcomes.len());
        self.outcomes.push(outcome);
        self.index = self.outcomes.len();
    }

    pub fn complete(&mut self) {
        if self.is_running() {
            self.phase = ExecutionPhase::Completed;
        }
    }

    pub fn fail(&mut self, detail: FailureDetail, error: Error) {
        if self.is_running() {
            self.phase = ExecutionPhase::Failed;
            self.failure = Some((detail, error));
        }
    }

    pub fn abort(&mut self, at: usize) {
        if self.is_running() {
            self.phase = ExecutionPhase::Aborted;
            self.aborted_at = Some(at);
        }
    }

    pub fn note_reporter_error(&mut self) {
        self.reporter_errors += 1;
    }

    pub fn into_report(mut self, pipeline: &str, total_steps: usize) -> ExecutionReport {
        self.active.release_all();

        let status = match self.phase {
            ExecutionPhase::Failed => RunStatus::Failed,
            ExecutionPhase::Aborted => RunStatus::Aborted,
            _ => RunStatus::Completed,
        };
        let summary = build_summary(&self.outcomes, total_steps, status);
        let (failure, cause) = match self.failure {
            Some((detail, error)) => (Some(detail), Some(error)),
            None => (None, None),
        };

        ExecutionReport {
            run_id: self.run_id,
            pipeline: pipeline.to_string(),
            status,
            outcomes: self.outcomes,
            started_at: self.started_at,
            elapsed_ms: elapsed_ms(self.started),
            failure,
            aborted_at: self.aborted_at,
            peak_active: self.active.peak(),
            max_active: self.active.bound(),
            reporter_errors: self.reporter_errors,
            summary,
            cause,
        }
    }
}

pub(crate) fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::StepStatus;

    fn outcome(index: usize, status: StepStatus) -> StepOutcome {
        StepOutcome {
            index,
            step: format!("step-{}", index),
            capability: format!("cap-{}", index),
            status,
            error: None,
            hints: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn starts_idle_and_runs_to_completion() {
        let mut state = ExecutionState::new(3);
        assert_eq!(state.phase(), ExecutionPhase::Idle);

        state.start();
        state.record(outcome(0, StepStatus::Skipped));
        state.record(outcome(1, StepStatus::Completed));
        assert_eq!(state.index(), 2);
        state.complete();

        let report = state.into_report("build", 2);
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.summary.not_run, 0);
    }

    #[test]
    fn terminal_phase_is_sticky() {
        let mut state = ExecutionState::new(3);
        state.start();
        state.abort(0);
        state.complete();
        state.fail(
            FailureDetail {
                index: 0,
                step: "x".to_string(),
                capability: "x".to_string(),
                error: crate::error::CauseDetails::from(&Error::other("late")),
            },
            Error::other("late"),
        );

        assert_eq!(state.phase(), ExecutionPhase::Aborted);
        assert!(state.phase().is_terminal());

        let report = state.into_report("build", 3);
        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.aborted_at, Some(0));
        assert_eq!(report.summary.not_run, 3);
        assert!(report.failure.is_none());
    }
}
