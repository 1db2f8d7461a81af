use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pipeline::StepSpec;

/// Caller-supplied context for one execution request.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub working_dir: PathBuf,
    pub vars: HashMap<String, String>,
    pub dry_run: bool,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            vars: HashMap::new(),
            dry_run: false,
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a probe or capability sees for a single step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub pipeline: &'a str,
    pub step: &'a StepSpec,
    pub total: usize,
    pub execution: &'a ExecutionContext,
    pub(crate) active: usize,
}

impl<'a> StepContext<'a> {
    pub fn new(
        pipeline: &'a str,
        step: &'a StepSpec,
        total: usize,
        execution: &'a ExecutionContext,
    ) -> Self {
        Self {
            pipeline,
            step,
            total,
            execution,
            active: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.step.index
    }

    pub fn capability(&self) -> &'a str {
        &self.step.capability
    }

    pub fn step_name(&self) -> &'a str {
        self.step.name()
    }

    pub fn config(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.step.config.get(key)
    }

    pub fn working_dir(&self) -> &'a Path {
        &self.execution.working_dir
    }

    pub fn var(&self, key: &str) -> Option<&'a str> {
        self.execution.vars.get(key).map(String::as_str)
    }

    pub fn is_dry_run(&self) -> bool {
        self.execution.dry_run
    }

    /// Capability handles held by the executor while this step runs,
    /// including this step's own. Zero while probing.
    pub fn active_capabilities(&self) -> usize {
        self.active
    }
}
