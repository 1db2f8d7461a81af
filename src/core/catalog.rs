//! Named pipeline lookup table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::defaults::SkillflowConfig;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineSpec, StepDefinition};
use crate::registry::CapabilityRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineCatalog {
    pipelines: BTreeMap<String, PipelineEntry>,
}

impl PipelineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SkillflowConfig) -> Result<Self> {
        let mut catalog = Self::new();
        for (name, pipeline) in &config.pipelines {
            let steps = pipeline
                .steps
                .iter()
                .map(|step| step.to_definition())
                .collect::<Result<Vec<_>>>()?;
            catalog.insert(PipelineEntry {
                name: name.clone(),
                description: pipeline.description.clone(),
                steps,
            })?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, entry: PipelineEntry) -> Result<()> {
        if self.pipelines.contains_key(&entry.name) {
            return Err(Error::validation_invalid_argument(
                "pipeline",
                format!("Pipeline '{}' is already defined", entry.name),
                Some(entry.name),
                None,
            ));
        }
        self.pipelines.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Shorthand for [`insert`](Self::insert) with bare capability names.
    pub fn define<I, S>(&mut self, name: impl Into<String>, steps: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<StepDefinition>,
    {
        self.insert(PipelineEntry {
            name: name.into(),
            description: None,
            steps: steps.into_iter().map(Into::<StepDefinition>::into).collect(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.pipelines.values()
    }

    pub fn resolve(&self, name: &str) -> Result<&PipelineEntry> {
        self.pipelines
            .get(name)
            .ok_or_else(|| Error::pipeline_not_found(name, self.names()))
    }

    /// Resolve `name` and validate it against `registry`.
    pub fn load(&self, name: &str, registry: &CapabilityRegistry) -> Result<PipelineSpec> {
        let entry = self.resolve(name)?;
        PipelineSpec::validate(&entry.name, entry.steps.iter().cloned(), registry)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityDescriptor;
    use crate::error::ErrorCode;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        for name in ["scaffold", "prisma"] {
            registry
                .register(CapabilityDescriptor::from_fn(name, |_ctx| Ok(())))
                .unwrap();
        }
        registry
    }

    #[test]
    fn load_validates_named_pipeline() {
        let mut catalog = PipelineCatalog::new();
        catalog.define("build", ["scaffold", "prisma"]).unwrap();

        let spec = catalog.load("build", &registry()).unwrap();
        assert_eq!(spec.name(), "build");
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn unknown_pipeline_lists_available() {
        let mut catalog = PipelineCatalog::new();
        catalog.define("build", ["scaffold"]).unwrap();
        catalog.define("audit", ["prisma"]).unwrap();

        let err = catalog.load("ship", &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineNotFound);
        assert_eq!(err.details["available"][0], "audit");
    }

    #[test]
    fn empty_pipeline_fails_on_load() {
        let mut catalog = PipelineCatalog::new();
        catalog
            .define("harden", Vec::<StepDefinition>::new())
            .unwrap();

        let err = catalog.load("harden", &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineEmpty);
    }

    #[test]
    fn duplicate_pipeline_name_rejected() {
        let mut catalog = PipelineCatalog::new();
        catalog.define("build", ["scaffold"]).unwrap();
        assert!(catalog.define("build", ["prisma"]).is_err());
        assert_eq!(catalog.resolve("build").unwrap().steps[0].capability, "scaffold");
    }
}
