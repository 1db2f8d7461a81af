use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::CapabilityDescriptor;
use crate::command::CommandCapability;
use crate::engine::{ExecutorConfig, DEFAULT_MAX_ACTIVE};
use crate::error::{Error, Result};
use crate::core::paths;
use crate::pipeline::StepDefinition;
use crate::probe::{SkipRule, SKIP_RULE_KEY};
use crate::registry::CapabilityRegistry;

/// Root configuration structure for skillflow.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillflowConfig {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityConfig>,

    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineConfig>,

    /// File the config was read from; not serialized.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// All configurable defaults that can be overridden via skillflow.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_max_active")]
    pub max_active: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_active: default_max_active(),
        }
    }
}

fn default_max_active() -> usize {
    DEFAULT_MAX_ACTIVE
}

/// A shell-command capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<SkipRule>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
}

impl StepConfig {
    /// The skip rule travels to the probe inside the step config.
    pub fn to_definition(&self) -> Result<StepDefinition> {
        let mut definition = StepDefinition::new(&self.capability);
        definition.label = self.label.clone();
        definition.config = self.config.clone();

        if let Some(rule) = &self.skip_if {
            let value = serde_json::to_value(rule).map_err(|e| {
                Error::internal_json(e.to_string(), Some("serialize skip_if".to_string()))
            })?;
            definition.config.insert(SKIP_RULE_KEY.to_string(), value);
        }

        Ok(definition)
    }
}

impl SkillflowConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_active: self.defaults.max_active,
        }
    }

    /// One [`CommandCapability`] per configured capability.
    pub fn build_registry(&self) -> Result<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        for (name, capability) in &self.capabilities {
            let handle = CommandCapability::new(&capability.command).with_env(capability.env.clone());
            let mut descriptor = CapabilityDescriptor::new(name, Arc::new(handle));
            if let Some(description) = &capability.description {
                descriptor = descriptor.with_description(description);
            }
            registry.register(descriptor)?;
        }
        Ok(registry)
    }
}

/// Parse a skillflow.json document.
pub fn parse_config(content: &str, source: &str) -> Result<SkillflowConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))
}

/// Load config from an explicit path, or the first of `./skillflow.json`
/// and `~/.config/skillflow/skillflow.json` that exists. Built-in defaults
/// when none exists.
pub fn load_config(explicit: Option<&Path>, working_dir: &Path) -> Result<SkillflowConfig> {
    if let Some(path) = explicit {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        if !path.is_file() {
            return Err(Error::internal_io(
                format!("Config file not found: {}", path.display()),
                Some("load config".to_string()),
            ));
        }
        return load_config_from_file(&path);
    }

    match paths::config_candidates(working_dir)
        .into_iter()
        .find(|candidate| candidate.is_file())
    {
        Some(path) => load_config_from_file(&path),
        None => Ok(SkillflowConfig::default()),
    }
}

fn load_config_from_file(path: &Path) -> Result<SkillflowConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    let mut config = parse_config(&content, &path.display().to_string())?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}
