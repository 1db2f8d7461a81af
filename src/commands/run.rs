use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use skillflow::reporter::{MultiReporter, RecordedEvent};
use skillflow::{
    ExecutionContext, ExecutionReport, FileProbe, LogReporter, PipelineExecutor,
    ProgressReporter, RecordingReporter, RunStatus,
};

use super::{parse_var, working_dir, CmdResult, GlobalArgs, Workspace};

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline name
    pipeline: String,
    /// Project directory probes and commands run in
    #[arg(long)]
    dir: Option<String>,
    /// Template variable (KEY=VALUE), repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
    /// Override defaults.max_active
    #[arg(long)]
    max_active: Option<usize>,
    /// Print commands instead of running them
    #[arg(long)]
    dry_run: bool,
    /// Include the step event log in the output
    #[arg(long)]
    events: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RunOutput {
    #[serde(rename = "run")]
    Run {
        report: ExecutionReport,
        #[serde(skip_serializing_if = "Option::is_none")]
        events: Option<Vec<RecordedEvent>>,
    },
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let dir = working_dir(args.dir.as_deref())?;
    let workspace = Workspace::load(global, &dir)?;
    let spec = workspace.catalog.load(&args.pipeline, &workspace.registry)?;

    let mut ctx = ExecutionContext::new(&dir).with_dry_run(args.dry_run);
    for raw in &args.vars {
        let (key, value) = parse_var(raw)?;
        ctx = ctx.with_var(key, value);
    }

    let mut config = workspace.config.executor_config();
    if let Some(max_active) = args.max_active {
        config.max_active = max_active;
    }

    let recorder = Arc::new(RecordingReporter::new());
    let mut reporters: Vec<Arc<dyn ProgressReporter>> = vec![Arc::new(LogReporter::new())];
    if args.events {
        reporters.push(recorder.clone());
    }

    let executor = PipelineExecutor::new(Arc::new(workspace.registry), config)?
        .with_probe(FileProbe::new())
        .with_reporter(MultiReporter::new(reporters));
    let report = executor.execute(&spec, &ctx)?;

    let exit_code = match report.status {
        RunStatus::Completed => 0,
        RunStatus::Failed => 20,
        RunStatus::Aborted => 130,
    };

    Ok((
        RunOutput::Run {
            report,
            events: args.events.then(|| recorder.events()),
        },
        exit_code,
    ))
}
