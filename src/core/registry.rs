use std::collections::HashMap;

use crate::capability::CapabilityDescriptor;
use crate::error::{Error, Result};

/// Name → descriptor lookup for every capability a pipeline may reference.
///
/// Built once, then shared read-only (usually behind an `Arc`) with the
/// executor. There is no ambient global registry.
#[derive(Debug, Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, CapabilityDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its name.
    ///
    /// Fails with `capability.duplicate` if the name is taken; the registry
    /// is left untouched in that case.
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Result<()> {
        let name = descriptor.name();
        if name.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                "capability",
                "Capability name cannot be empty",
                None,
                None,
            ));
        }
        if self.capabilities.contains_key(name) {
            return Err(Error::capability_duplicate(name));
        }
        self.capabilities.insert(name.to_string(), descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&CapabilityDescriptor> {
        self.capabilities
            .get(name)
            .ok_or_else(|| Error::capability_unknown(name, self.names()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn noop(name: &str) -> CapabilityDescriptor {
        CapabilityDescriptor::from_fn(name, |_ctx| Ok(()))
    }

    #[test]
    fn resolve_returns_registered_descriptor() {
        let mut registry = CapabilityRegistry::new();
        registry.register(noop("scaffold")).unwrap();

        let descriptor = registry.resolve("scaffold").unwrap();
        assert_eq!(descriptor.name(), "scaffold");
    }

    #[test]
    fn resolve_unknown_fails() {
        let mut registry = CapabilityRegistry::new();
        registry.register(noop("scaffold")).unwrap();

        let err = registry.resolve("prisma").unwrap_err();
        assert_eq!(err.code, ErrorCode::CapabilityUnknown);
        assert_eq!(err.details["registered"][0], "scaffold");
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(noop("scaffold").with_description("first"))
            .unwrap();

        let err = registry
            .register(noop("scaffold").with_description("second"))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CapabilityDuplicate);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resolve("scaffold").unwrap().description(),
            Some("first")
        );
    }

    #[test]
    fn empty_name_rejected() {
        let mut registry = CapabilityRegistry::new();
        let err = registry.register(noop("  ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        assert!(registry.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = CapabilityRegistry::new();
        for name in ["prisma", "auth", "scaffold"] {
            registry.register(noop(name)).unwrap();
        }
        assert_eq!(registry.names(), vec!["auth", "prisma", "scaffold"]);
    }
}
