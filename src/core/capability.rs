use std::fmt;
use std::sync::Arc;

use crate::context::StepContext;
use crate::error::Result;

/// A named unit of work the executor can invoke.
///
/// Implementations are opaque to the executor: a call either returns `Ok(())`
/// or an error that fails the current step.
pub trait Capability: Send + Sync {
    fn execute(&self, ctx: &StepContext<'_>) -> Result<()>;
}

impl<F> Capability for F
where
    F: Fn(&StepContext<'_>) -> Result<()> + Send + Sync,
{
    fn execute(&self, ctx: &StepContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Identity plus execution handle for a registered capability.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    name: String,
    description: Option<String>,
    handle: Arc<dyn Capability>,
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, handle: Arc<dyn Capability>) -> Self {
        Self {
            name: name.into(),
            description: None,
            handle,
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(f))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn handle(&self) -> &Arc<dyn Capability> {
        &self.handle
    }
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
