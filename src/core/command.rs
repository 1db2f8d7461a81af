use std::collections::{BTreeMap, HashMap};
use std::process::Command;

use crate::capability::Capability;
use crate::context::StepContext;
use crate::error::{CommandFailedDetails, Error, Result};
use crate::utils::template::{self, TemplateVars};

/// Capability that runs a shell command in the execution working directory.
///
/// `{{var}}` placeholders are filled from the execution variables plus
/// `pipeline`, `step`, `stepIndex`, `capability` and `workingDir`; every
/// substituted value is shell-quoted.
#[derive(Debug, Clone)]
pub struct CommandCapability {
    command: String,
    env: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandCapability {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command line after placeholder substitution.
    pub fn render(&self, ctx: &StepContext<'_>) -> String {
        let mut vars: HashMap<String, String> = ctx.execution.vars.clone();
        vars.insert(TemplateVars::PIPELINE.to_string(), ctx.pipeline.to_string());
        vars.insert(TemplateVars::STEP.to_string(), ctx.step_name().to_string());
        vars.insert(TemplateVars::STEP_INDEX.to_string(), ctx.index().to_string());
        vars.insert(
            TemplateVars::CAPABILITY.to_string(),
            ctx.capability().to_string(),
        );
        vars.insert(
            TemplateVars::WORKING_DIR.to_string(),
            ctx.working_dir().display().to_string(),
        );
        template::render_shell(&self.command, &vars)
    }

    fn step_env(&self, ctx: &StepContext<'_>) -> Vec<(String, String)> {
        let mut env = vec![
            ("SKILLFLOW_PIPELINE".to_string(), ctx.pipeline.to_string()),
            ("SKILLFLOW_STEP".to_string(), ctx.step_name().to_string()),
            ("SKILLFLOW_STEP_INDEX".to_string(), ctx.index().to_string()),
            (
                "SKILLFLOW_CAPABILITY".to_string(),
                ctx.capability().to_string(),
            ),
        ];
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

impl Capability for CommandCapability {
    fn execute(&self, ctx: &StepContext<'_>) -> Result<()> {
        let command = self.render(ctx);

        if ctx.is_dry_run() {
            log_status!("command", "Would run: {}", command);
            return Ok(());
        }

        log_status!("command", "{}", command);
        let working_dir = ctx.working_dir();
        let dir = if working_dir.as_os_str().is_empty() {
            None
        } else {
            Some(working_dir)
        };

        let output = execute_local_command(&command, dir, &self.step_env(ctx))?;
        if output.success {
            return Ok(());
        }

        Err(Error::command_failed(CommandFailedDetails {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            working_dir: dir.map(|d| d.display().to_string()),
        }))
    }
}

pub fn execute_local_command(
    command: &str,
    current_dir: Option<&std::path::Path>,
    env: &[(String, String)],
) -> Result<CommandOutput> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let out = cmd
        .output()
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("spawn '{}'", command))))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::error::ErrorCode;
    use crate::pipeline::StepSpec;

    fn step(capability: &str) -> StepSpec {
        StepSpec {
            index: 1,
            capability: capability.to_string(),
            label: None,
            config: HashMap::new(),
        }
    }

    #[test]
    fn render_fills_and_quotes_placeholders() {
        let step = step("scaffold");
        let ctx = ExecutionContext::new("/tmp/my app").with_var("name", "web app");
        let step_ctx = StepContext::new("build", &step, 3, &ctx);

        let cap = CommandCapability::new("init {{name}} in {{workingDir}} ({{stepIndex}})");
        assert_eq!(
            cap.render(&step_ctx),
            "init 'web app' in '/tmp/my app' (1)"
        );
    }

    #[test]
    fn dry_run_does_not_spawn() {
        let step = step("scaffold");
        let ctx = ExecutionContext::new("/definitely/not/a/dir").with_dry_run(true);
        let step_ctx = StepContext::new("build", &step, 1, &ctx);

        assert!(CommandCapability::new("exit 7").execute(&step_ctx).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_failed() {
        let dir = tempfile::tempdir().unwrap();
        let step = step("prisma");
        let ctx = ExecutionContext::new(dir.path());
        let step_ctx = StepContext::new("build", &step, 1, &ctx);

        let err = CommandCapability::new("echo broken >&2; exit 3")
            .execute(&step_ctx)
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert_eq!(err.details["exitCode"], 3);
        assert!(err.details["stderr"].as_str().unwrap().contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn step_env_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let step = step("scaffold");
        let ctx = ExecutionContext::new(dir.path());
        let step_ctx = StepContext::new("build", &step, 2, &ctx);

        CommandCapability::new("echo \"$SKILLFLOW_PIPELINE:$SKILLFLOW_STEP_INDEX\" > out.txt")
            .execute(&step_ctx)
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "build:1");
    }
}
