use std::path::{Path, PathBuf};

use skillflow::defaults::{self, SkillflowConfig};
use skillflow::{CapabilityRegistry, PipelineCatalog};

pub type CmdResult<T> = skillflow::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
}

/// Config plus everything built from it.
pub(crate) struct Workspace {
    pub config: SkillflowConfig,
    pub registry: CapabilityRegistry,
    pub catalog: PipelineCatalog,
}

impl Workspace {
    pub fn load(global: &GlobalArgs, working_dir: &Path) -> skillflow::Result<Self> {
        let config = defaults::load_config(global.config.as_deref(), working_dir)?;
        let registry = config.build_registry()?;
        let catalog = PipelineCatalog::from_config(&config)?;
        Ok(Self {
            config,
            registry,
            catalog,
        })
    }
}

/// Resolve `--dir`, defaulting to the process working directory.
pub(crate) fn working_dir(dir: Option<&str>) -> skillflow::Result<PathBuf> {
    match dir {
        Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).into_owned())),
        None => std::env::current_dir().map_err(|e| {
            skillflow::Error::internal_io(e.to_string(), Some("resolve current dir".to_string()))
        }),
    }
}

/// Parse a `KEY=VALUE` pair from `--var`.
pub(crate) fn parse_var(raw: &str) -> skillflow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(skillflow::Error::validation_invalid_argument(
            "var",
            format!("Expected KEY=VALUE, got '{}'", raw),
            None,
            None,
        )),
    }
}

pub mod list;
pub mod plan;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (skillflow::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::List(args) => dispatch!(args, global, list),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Run(args) => dispatch!(args, global, run),
    }
}
