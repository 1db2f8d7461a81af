use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::context::{ExecutionContext, StepContext};
use crate::error::{CauseDetails, Error, Result};
use crate::pipeline::{PipelineSpec, StepSpec};
use crate::probe::{EnvironmentProbe, NeverSkip};
use crate::registry::CapabilityRegistry;
use crate::reporter::{NoopReporter, ProgressReporter, StepEvent};

use super::report::{ExecutionReport, FailureDetail, StepOutcome, StepStatus};
use super::state::{elapsed_ms, ExecutionState};

pub const DEFAULT_MAX_ACTIVE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound on capability handles held at once.
    pub max_active: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_active: DEFAULT_MAX_ACTIVE,
        }
    }
}

/// Cooperative cancellation flag, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum StepFlow {
    Continue,
    Halt,
}

/// Drives validated pipelines one step at a time.
pub struct PipelineExecutor {
    registry: Arc<CapabilityRegistry>,
    config: ExecutorConfig,
    probe: Arc<dyn EnvironmentProbe>,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<CapabilityRegistry>, config: ExecutorConfig) -> Result<Self> {
        if config.max_active == 0 {
            return Err(Error::config_invalid_value(
                "max_active",
                Some("0".to_string()),
                "At least one capability must be allowed to be active",
            ));
        }

        Ok(Self {
            registry,
            config,
            probe: Arc::new(NeverSkip),
            reporter: Arc::new(NoopReporter),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_probe<P: EnvironmentProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn with_reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run `pipeline` to a terminal state.
    ///
    /// `Err` only for a pipeline that does not resolve against this
    /// executor's registry; nothing has run in that case. Step failures and
    /// cancellation come back as a `Failed` / `Aborted` report.
    pub fn execute(
        &self,
        pipeline: &PipelineSpec,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionReport> {
        pipeline.ensure_resolvable(&self.registry)?;

        let total = pipeline.len();
        let mut state = ExecutionState::new(self.config.max_active);
        state.start();
        log_status!(
            "flow",
            "Running pipeline '{}' ({} steps, max {} active)",
            pipeline.name(),
            total,
            self.config.max_active
        );

        let steps = pipeline.steps();
        for (position, step) in steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log_status!(
                    "flow",
                    "Cancelled before step {} '{}'",
                    step.index,
                    step.name()
                );
                state.abort(step.index);
                break;
            }

            let next = steps.get(position + 1).map(|s| s.capability.as_str());
            match self.run_step(pipeline, step, next, ctx, &mut state) {
                StepFlow::Continue => {}
                StepFlow::Halt => break,
            }
        }
        state.complete();

        let report = state.into_report(pipeline.name(), total);
        log_status!(
            "flow",
            "Pipeline '{}' finished: {:?} ({} completed, {} skipped, {} failed) in {}ms",
            report.pipeline,
            report.status,
            report.summary.completed,
            report.summary.skipped,
            report.summary.failed,
            report.elapsed_ms
        );
        Ok(report)
    }

    fn run_step(
        &self,
        pipeline: &PipelineSpec,
        step: &StepSpec,
        next: Option<&str>,
        ctx: &ExecutionContext,
        state: &mut ExecutionState,
    ) -> StepFlow {
        let started = Instant::now();
        let timestamp = chrono::Utc::now().to_rfc3339();
        let event = StepEvent {
            pipeline: pipeline.name().to_string(),
            step: step.name().to_string(),
            index: step.index,
            total: pipeline.len(),
        };
        let step_ctx = StepContext::new(pipeline.name(), step, pipeline.len(), ctx);

        // Probed fresh every step: earlier steps may have produced the goal state.
        match self.probe.check(&step.capability, &step_ctx) {
            Ok(true) => {
                state.record(outcome(step, StepStatus::Skipped, None, timestamp, started));
                state.active.release_except(next);
                self.emit(state, |r| r.on_step_skipped(&event));
                return StepFlow::Continue;
            }
            Ok(false) => {}
            Err(err) => {
                return self.fail(pipeline, step, &event, "probe", err, timestamp, started, state)
            }
        }

        let handle = match self.registry.resolve(&step.capability) {
            Ok(descriptor) => Arc::clone(descriptor.handle()),
            Err(err) => {
                return self.fail(pipeline, step, &event, "resolve", err, timestamp, started, state)
            }
        };

        state.active.acquire(&step.capability);
        self.emit(state, |r| r.on_step_started(&event));

        let step_ctx = StepContext {
            active: state.active.len(),
            ..step_ctx
        };
        let result = handle.execute(&step_ctx);

        match result {
            Ok(()) => {
                state.record(outcome(step, StepStatus::Completed, None, timestamp, started));
                state.active.release_except(next);
                self.emit(state, |r| r.on_step_completed(&event));
                StepFlow::Continue
            }
            Err(err) => self.fail(pipeline, step, &event, "execute", err, timestamp, started, state),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &self,
        pipeline: &PipelineSpec,
        step: &StepSpec,
        event: &StepEvent,
        phase: &str,
        cause: Error,
        timestamp: String,
        started: Instant,
        state: &mut ExecutionState,
    ) -> StepFlow {
        state.record(outcome(
            step,
            StepStatus::Failed,
            Some(&cause),
            timestamp,
            started,
        ));
        state.active.release_all();
        self.emit(state, |r| r.on_step_failed(event, &cause));

        let wrapped =
            Error::step_execution_failed(pipeline.name(), step.name(), step.index, phase, &cause);
        state.fail(
            FailureDetail {
                index: step.index,
                step: step.name().to_string(),
                capability: step.capability.clone(),
                error: CauseDetails::from(&cause),
            },
            wrapped,
        );
        StepFlow::Halt
    }

    /// Reporter errors are counted and dropped.
    fn emit<F>(&self, state: &mut ExecutionState, call: F)
    where
        F: FnOnce(&dyn ProgressReporter) -> Result<()>,
    {
        if let Err(err) = call(self.reporter.as_ref()) {
            log_status!("flow", "Ignoring reporter error: {}", err);
            state.note_reporter_error();
        }
    }
}

fn outcome(
    step: &StepSpec,
    status: StepStatus,
    error: Option<&Error>,
    timestamp: String,
    started: Instant,
) -> StepOutcome {
    StepOutcome {
        index: step.index,
        step: step.name().to_string(),
        capability: step.capability.clone(),
        status,
        error: error.map(|e| e.message.clone()),
        hints: error.map(|e| e.hints.clone()).unwrap_or_default(),
        timestamp,
        elapsed_ms: elapsed_ms(started),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityDescriptor;
    use crate::error::ErrorCode;

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(CapabilityDescriptor::from_fn("ok", |_ctx| Ok(())))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn zero_bound_is_rejected() {
        let err = PipelineExecutor::new(registry(), ExecutorConfig { max_active: 0 })
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn default_bound_is_three() {
        let executor = PipelineExecutor::new(registry(), ExecutorConfig::default()).unwrap();
        assert_eq!(executor.config().max_active, 3);
    }

    #[test]
    fn cancelled_token_aborts_before_first_step() {
        let token = CancellationToken::new();
        token.cancel();
        let executor = PipelineExecutor::new(registry(), ExecutorConfig::default())
            .unwrap()
            .with_cancellation(token);
        let spec = PipelineSpec::validate("p", ["ok", "ok"], executor.registry()).unwrap();

        let report = executor
            .execute(&spec, &ExecutionContext::default())
            .unwrap();

        assert_eq!(report.status, crate::engine::RunStatus::Aborted);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.aborted_at, Some(0));
    }
}
