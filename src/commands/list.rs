use clap::Args;
use serde::Serialize;

use skillflow::catalog::PipelineEntry;

use super::{working_dir, CmdResult, GlobalArgs, Workspace};

#[derive(Args)]
pub struct ListArgs {
    /// Directory to look for skillflow.json in
    #[arg(long)]
    dir: Option<String>,
}

#[derive(Serialize)]
pub struct CapabilitySummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ListOutput {
    #[serde(rename = "list")]
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        config: Option<String>,
        max_active: usize,
        pipelines: Vec<PipelineEntry>,
        capabilities: Vec<CapabilitySummary>,
    },
}

pub fn run(args: ListArgs, global: &GlobalArgs) -> CmdResult<ListOutput> {
    let dir = working_dir(args.dir.as_deref())?;
    let workspace = Workspace::load(global, &dir)?;

    let capabilities = workspace
        .registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let descriptor = workspace.registry.resolve(&name).ok()?;
            Some(CapabilitySummary {
                description: descriptor.description().map(str::to_string),
                name,
            })
        })
        .collect();

    Ok((
        ListOutput::List {
            config: workspace
                .config
                .source
                .as_ref()
                .map(|p| p.display().to_string()),
            max_active: workspace.config.defaults.max_active,
            pipelines: workspace.catalog.entries().cloned().collect(),
            capabilities,
        },
        0,
    ))
}
