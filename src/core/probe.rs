//! Skip predicates.
//!
//! The executor asks an [`EnvironmentProbe`] before every step whether the
//! step's goal state already exists. The answer is opaque to the executor.
//! [`FileProbe`] is the filesystem-backed probe used by the CLI; it reads a
//! [`SkipRule`] from the step's `skip_if` config entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::StepContext;
use crate::error::{Error, Result};

/// Step config key holding a [`SkipRule`].
pub const SKIP_RULE_KEY: &str = "skip_if";

pub trait EnvironmentProbe: Send + Sync {
    /// `true` means the goal state is already present and the step is skipped.
    fn check(&self, capability: &str, step: &StepContext<'_>) -> Result<bool>;
}

impl<T: EnvironmentProbe + ?Sized> EnvironmentProbe for Arc<T> {
    fn check(&self, capability: &str, step: &StepContext<'_>) -> Result<bool> {
        (**self).check(capability, step)
    }
}

/// Probe backed by a closure. See [`from_fn`].
pub struct FnProbe<F>(F);

/// Wrap a closure `(capability, step) -> Result<bool>` as a probe.
pub fn from_fn<F>(f: F) -> FnProbe<F>
where
    F: Fn(&str, &StepContext<'_>) -> Result<bool> + Send + Sync,
{
    FnProbe(f)
}

impl<F> EnvironmentProbe for FnProbe<F>
where
    F: Fn(&str, &StepContext<'_>) -> Result<bool> + Send + Sync,
{
    fn check(&self, capability: &str, step: &StepContext<'_>) -> Result<bool> {
        (self.0)(capability, step)
    }
}

/// Probe that never skips.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverSkip;

impl EnvironmentProbe for NeverSkip {
    fn check(&self, _capability: &str, _step: &StepContext<'_>) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkipRule {
    /// Glob pattern, relative to the working directory, that must match at
    /// least one path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<ContainsRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsRule {
    pub file: String,
    pub pattern: String,
}

impl SkipRule {
    pub fn is_empty(&self) -> bool {
        self.exists.is_none() && self.contains.is_none()
    }

    /// All configured conditions must hold. An empty rule never skips.
    pub fn evaluate(&self, working_dir: &Path) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }

        if let Some(pattern) = &self.exists {
            if !any_path_matches(working_dir, pattern)? {
                return Ok(false);
            }
        }

        if let Some(rule) = &self.contains {
            if !file_contains(working_dir, rule)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Filesystem probe driven by per-step [`SkipRule`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileProbe;

impl FileProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn rule_for(step: &StepContext<'_>) -> Result<Option<SkipRule>> {
        let Some(value) = step.config(SKIP_RULE_KEY) else {
            return Ok(None);
        };

        serde_json::from_value(value.clone()).map(Some).map_err(|e| {
            Error::config_invalid_value(
                SKIP_RULE_KEY,
                Some(value.to_string()),
                format!("Step '{}': {}", step.step_name(), e),
            )
        })
    }
}

impl EnvironmentProbe for FileProbe {
    fn check(&self, _capability: &str, step: &StepContext<'_>) -> Result<bool> {
        match Self::rule_for(step)? {
            Some(rule) => rule.evaluate(step.working_dir()),
            None => Ok(false),
        }
    }
}

fn resolve_path(working_dir: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Only the user's pattern is glob syntax; the working directory is matched literally.
fn any_path_matches(working_dir: &Path, pattern: &str) -> Result<bool> {
    let expanded = shellexpand::tilde(pattern);
    let full = if Path::new(expanded.as_ref()).is_absolute() {
        expanded.into_owned()
    } else {
        let base = glob::Pattern::escape(&working_dir.to_string_lossy());
        Path::new(&base)
            .join(expanded.as_ref())
            .to_string_lossy()
            .into_owned()
    };
    let mut paths = glob::glob(&full).map_err(|e| {
        Error::config_invalid_value(
            "skip_if.exists",
            Some(pattern.to_string()),
            e.to_string(),
        )
    })?;
    Ok(paths.any(|entry| entry.is_ok()))
}

fn file_contains(working_dir: &Path, rule: &ContainsRule) -> Result<bool> {
    let regex = Regex::new(&rule.pattern).map_err(|e| {
        Error::config_invalid_value(
            "skip_if.contains.pattern",
            Some(rule.pattern.clone()),
            e.to_string(),
        )
    })?;

    let path = resolve_path(working_dir, &rule.file);
    if !path.is_file() {
        return Ok(false);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    Ok(regex.is_match(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::error::ErrorCode;
    use crate::pipeline::StepSpec;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;

    fn step_with_rule(rule: Option<serde_json::Value>) -> StepSpec {
        let mut config = HashMap::new();
        if let Some(rule) = rule {
            config.insert(SKIP_RULE_KEY.to_string(), rule);
        }
        StepSpec {
            index: 0,
            capability: "scaffold".to_string(),
            label: None,
            config,
        }
    }

    fn check(dir: &Path, rule: Option<serde_json::Value>) -> Result<bool> {
        let step = step_with_rule(rule);
        let ctx = ExecutionContext::new(dir);
        let step_ctx = StepContext::new("build", &step, 1, &ctx);
        FileProbe::new().check("scaffold", &step_ctx)
    }

    #[test]
    fn no_rule_never_skips() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!check(dir.path(), None).unwrap());
        assert!(!check(dir.path(), Some(json!({}))).unwrap());
    }

    #[test]
    fn exists_matches_glob() {
        let dir = tempfile::tempdir().unwrap();
        let rule = json!({ "exists": ".env*" });
        assert!(!check(dir.path(), Some(rule.clone())).unwrap());

        fs::write(dir.path().join(".env.local"), "DATABASE_URL=x").unwrap();
        assert!(check(dir.path(), Some(rule)).unwrap());
    }

    #[test]
    fn exists_treats_working_dir_literally() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("app[1]");
        fs::create_dir(&dir).unwrap();
        let rule = json!({ "exists": "package.json" });
        assert!(!check(&dir, Some(rule.clone())).unwrap());

        fs::write(dir.join("package.json"), "{}").unwrap();
        assert!(check(&dir, Some(rule)).unwrap());
        assert!(check(&dir, Some(json!({ "exists": "*.json" }))).unwrap());
    }

    #[test]
    fn contains_requires_file_and_match() {
        let dir = tempfile::tempdir().unwrap();
        let rule = json!({ "contains": { "file": "package.json", "pattern": "\"next\"\\s*:" } });
        assert!(!check(dir.path(), Some(rule.clone())).unwrap());

        fs::write(dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
        assert!(!check(dir.path(), Some(rule.clone())).unwrap());

        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"next": "15.0.0"}}"#,
        )
        .unwrap();
        assert!(check(dir.path(), Some(rule)).unwrap());
    }

    #[test]
    fn all_conditions_must_hold() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("prisma")).unwrap();
        fs::write(dir.path().join("prisma/schema.prisma"), "model User {}").unwrap();

        let rule = json!({
            "exists": "prisma/schema.prisma",
            "contains": { "file": "prisma/schema.prisma", "pattern": "model Post" }
        });
        assert!(!check(dir.path(), Some(rule)).unwrap());
    }

    #[test]
    fn malformed_rule_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = check(dir.path(), Some(json!({ "exists": 42 }))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = check(
            dir.path(),
            Some(json!({ "contains": { "file": "a", "pattern": "(" } })),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
