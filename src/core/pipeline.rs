use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::CapabilityRegistry;

/// Unvalidated step as written in a catalog or built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
}

impl StepDefinition {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            label: None,
            config: HashMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

impl From<&str> for StepDefinition {
    fn from(capability: &str) -> Self {
        Self::new(capability)
    }
}

impl From<String> for StepDefinition {
    fn from(capability: String) -> Self {
        Self::new(capability)
    }
}

/// A validated step with its fixed position in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSpec {
    pub index: usize,
    pub capability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
}

impl StepSpec {
    /// Display name: the label when set, otherwise the capability name.
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.capability)
    }
}

/// Named, non-empty, ordered list of steps whose capabilities all resolved
/// against a registry. Only obtainable through [`PipelineSpec::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSpec {
    name: String,
    steps: Vec<StepSpec>,
}

impl PipelineSpec {
    /// Validate a step list against the registry.
    ///
    /// Fails with `pipeline.empty` for an empty list and with
    /// `capability.unknown` naming the first unresolvable step. Nothing is
    /// executed either way.
    pub fn validate<I, S>(
        name: impl Into<String>,
        steps: I,
        registry: &CapabilityRegistry,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<StepDefinition>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                "pipeline",
                "Pipeline name cannot be empty",
                None,
                None,
            ));
        }

        let steps: Vec<StepSpec> = steps
            .into_iter()
            .map(Into::<StepDefinition>::into)
            .enumerate()
            .map(|(index, def)| StepSpec {
                index,
                capability: def.capability,
                label: def.label,
                config: def.config,
            })
            .collect();

        check_steps(&name, &steps, registry)?;

        Ok(Self { name, steps })
    }

    /// Re-check that every step still resolves against `registry`.
    pub fn ensure_resolvable(&self, registry: &CapabilityRegistry) -> Result<()> {
        check_steps(&self.name, &self.steps, registry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a validated pipeline.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn check_steps(name: &str, steps: &[StepSpec], registry: &CapabilityRegistry) -> Result<()> {
    if steps.is_empty() {
        return Err(Error::pipeline_empty(name));
    }

    if let Some(step) = steps
        .iter()
        .find(|step| !registry.contains(&step.capability))
    {
        return Err(Error::step_capability_unknown(
            name,
            step.index,
            &step.capability,
            registry.names(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityDescriptor;
    use crate::error::ErrorCode;

    fn registry(names: &[&str]) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        for name in names {
            registry
                .register(CapabilityDescriptor::from_fn(*name, |_ctx| Ok(())))
                .unwrap();
        }
        registry
    }

    #[test]
    fn validate_assigns_indices_in_order() {
        let registry = registry(&["env-validation", "scaffold", "prisma"]);
        let spec =
            PipelineSpec::validate("build", ["env-validation", "scaffold", "prisma"], &registry)
                .unwrap();

        assert_eq!(spec.name(), "build");
        assert_eq!(spec.len(), 3);
        let indices: Vec<usize> = spec.steps().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(spec.steps()[1].capability, "scaffold");
    }

    #[test]
    fn empty_step_list_fails() {
        let registry = registry(&["scaffold"]);
        let err = PipelineSpec::validate("build", Vec::<StepDefinition>::new(), &registry)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineEmpty);
    }

    #[test]
    fn unknown_capability_names_first_offending_step() {
        let registry = registry(&["scaffold"]);
        let err = PipelineSpec::validate("build", ["scaffold", "prisma", "auth"], &registry)
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CapabilityUnknown);
        assert_eq!(err.details["stepIndex"], 1);
        assert_eq!(err.details["capability"], "prisma");
    }

    #[test]
    fn label_overrides_step_name() {
        let registry = registry(&["scaffold"]);
        let spec = PipelineSpec::validate(
            "build",
            [StepDefinition::new("scaffold").with_label("Create app")],
            &registry,
        )
        .unwrap();

        assert_eq!(spec.steps()[0].name(), "Create app");
    }

    #[test]
    fn ensure_resolvable_detects_foreign_registry() {
        let spec =
            PipelineSpec::validate("build", ["scaffold"], &registry(&["scaffold"])).unwrap();
        let err = spec.ensure_resolvable(&registry(&["prisma"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::CapabilityUnknown);
    }
}
