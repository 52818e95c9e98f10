//! Unit registry with lazy, cached construction.
//!
//! The registry is an ordinary value handed to the controller; there is no
//! process-wide singleton. Factories run at most once per name and the
//! constructed instance is shared by every later resolve.

use crate::errors::ConfigurationError;
use crate::units::{
    names, CoverageValidationUnit, DesignSkeletonUnit, NotImplementedUnit,
    RepositoryInventoryUnit, Unit,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function type for creating units.
pub type UnitFactory = Box<dyn Fn() -> Arc<dyn Unit> + Send + Sync>;

/// Registry of unit factories and constructed instances.
#[derive(Default)]
pub struct UnitRegistry {
    factories: RwLock<HashMap<String, UnitFactory>>,
    instances: DashMap<String, Arc<dyn Unit>>,
}

impl UnitRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the six code-to-design units.
    ///
    /// `documentation_synthesizer`, `test_analyst` and `devops_designer` are
    /// registered as [`NotImplementedUnit`] placeholders.
    #[must_use]
    pub fn with_builtin_units() -> Self {
        let registry = Self::new();
        registry.register_fn(names::REPOSITORY_ANALYZER, || {
            Arc::new(RepositoryInventoryUnit::new())
        });
        for placeholder in [
            names::DOCUMENTATION_SYNTHESIZER,
            names::TEST_ANALYST,
            names::DEVOPS_DESIGNER,
        ] {
            registry.register_fn(placeholder, move || {
                Arc::new(NotImplementedUnit::new(placeholder))
            });
        }
        registry.register_fn(names::DESIGN_ARCHITECT, || Arc::new(DesignSkeletonUnit::new()));
        registry.register_fn(names::QA_VALIDATOR, || Arc::new(CoverageValidationUnit::new()));
        registry
    }

    /// Registers a factory, replacing any previous registration of the name.
    pub fn register(&self, name: impl Into<String>, factory: UnitFactory) {
        self.install(name.into(), factory, None);
    }

    /// Registers a factory closure.
    pub fn register_fn<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Unit> + Send + Sync + 'static,
    {
        self.register(name, Box::new(factory));
    }

    /// Registers an already-built unit under its own name.
    pub fn register_instance(&self, unit: Arc<dyn Unit>) {
        let name = unit.name().to_string();
        let shared = unit.clone();
        self.install(name, Box::new(move || shared.clone()), Some(unit));
    }

    // The write guard is held across the cache update so a `resolve` that
    // read the old factory cannot cache its instance after the swap.
    fn install(&self, name: String, factory: UnitFactory, instance: Option<Arc<dyn Unit>>) {
        let mut factories = self.factories.write();
        match instance {
            Some(unit) => {
                self.instances.insert(name.clone(), unit);
            }
            None => {
                self.instances.remove(&name);
            }
        }
        factories.insert(name, factory);
    }

    /// Resolves a unit, constructing and caching it on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Unit>, ConfigurationError> {
        if let Some(unit) = self.instances.get(name) {
            return Ok(unit.value().clone());
        }
        let factories = self.factories.read();
        let factory = factories
            .get(name)
            .ok_or_else(|| ConfigurationError::unregistered(name))?;
        let unit = self
            .instances
            .entry(name.to_string())
            .or_insert_with(|| factory())
            .value()
            .clone();
        Ok(unit)
    }

    /// Returns true if a factory is registered under the name.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Returns true if the unit has already been constructed.
    #[must_use]
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.names())
            .field("instantiated", &self.instances.len())
            .finish()
    }
}
