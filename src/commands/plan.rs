use clap::Args;
use serde::Serialize;

use skillflow::{EnvironmentProbe, ExecutionContext, FileProbe, StepContext};

use super::{parse_var, working_dir, CmdResult, GlobalArgs, Workspace};

#[derive(Args)]
pub struct PlanArgs {
    /// Pipeline name
    pipeline: String,
    /// Project directory probes and commands run in
    #[arg(long)]
    dir: Option<String>,
    /// Template variable (KEY=VALUE), repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

#[derive(Serialize)]
pub struct PlannedStep {
    pub index: usize,
    pub step: String,
    pub capability: String,
    pub would_skip: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum PlanOutput {
    #[serde(rename = "plan")]
    Plan {
        pipeline: String,
        working_dir: String,
        max_active: usize,
        steps: Vec<PlannedStep>,
    },
}

/// Validate the pipeline and probe each step without running anything.
pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let dir = working_dir(args.dir.as_deref())?;
    let workspace = Workspace::load(global, &dir)?;
    let spec = workspace.catalog.load(&args.pipeline, &workspace.registry)?;

    let mut ctx = ExecutionContext::new(&dir);
    for raw in &args.vars {
        let (key, value) = parse_var(raw)?;
        ctx = ctx.with_var(key, value);
    }

    let probe = FileProbe::new();
    let steps = spec
        .steps()
        .iter()
        .map(|step| {
            let step_ctx = StepContext::new(spec.name(), step, spec.len(), &ctx);
            Ok(PlannedStep {
                index: step.index,
                step: step.name().to_string(),
                capability: step.capability.clone(),
                would_skip: probe.check(&step.capability, &step_ctx)?,
            })
        })
        .collect::<skillflow::Result<Vec<_>>>()?;

    Ok((
        PlanOutput::Plan {
            pipeline: spec.name().to_string(),
            working_dir: dir.display().to_string(),
            max_active: workspace.config.defaults.max_active,
            steps,
        },
        0,
    ))
}
