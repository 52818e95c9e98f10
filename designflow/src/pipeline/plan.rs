//! Which units run in which phase.

use crate::errors::ConfigurationError;
use crate::registry::UnitRegistry;
use crate::units::names;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Unit names for the three phases.
///
/// Phase 1 may hold any number of units (including none). Phases 2 and 3
/// each run exactly one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    /// Independent analysis units.
    pub analysis: Vec<String>,
    /// The synthesis unit.
    pub synthesis: String,
    /// The validation unit.
    pub validation: String,
}

impl PipelinePlan {
    /// Creates a plan.
    #[must_use]
    pub fn new(
        analysis: impl IntoIterator<Item = impl Into<String>>,
        synthesis: impl Into<String>,
        validation: impl Into<String>,
    ) -> Self {
        Self {
            analysis: analysis.into_iter().map(Into::into).collect(),
            synthesis: synthesis.into(),
            validation: validation.into(),
        }
    }

    /// The code-to-design plan served by the built-in units.
    #[must_use]
    pub fn code_to_design() -> Self {
        Self::new(
            [
                names::REPOSITORY_ANALYZER,
                names::DOCUMENTATION_SYNTHESIZER,
                names::TEST_ANALYST,
                names::DEVOPS_DESIGNER,
            ],
            names::DESIGN_ARCHITECT,
            names::QA_VALIDATOR,
        )
    }

    /// Checks the plan shape.
    ///
    /// Names must be non-empty and phase 1 names unique. Whether the names
    /// are registered is not checked here; unknown names surface as
    /// registration failures in their phase slot.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for name in &self.analysis {
            if name.trim().is_empty() {
                return Err(ConfigurationError::malformed("analysis unit name must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigurationError::malformed(format!(
                    "analysis unit '{name}' is listed twice"
                ))
                .with_context_entry("unit", name.as_str()));
            }
        }
        if self.synthesis.trim().is_empty() {
            return Err(ConfigurationError::malformed("synthesis unit name must not be empty"));
        }
        if self.validation.trim().is_empty() {
            return Err(ConfigurationError::malformed("validation unit name must not be empty"));
        }
        Ok(())
    }

    /// Planned names the registry does not know, in plan order.
    #[must_use]
    pub fn unregistered<'a>(&'a self, registry: &UnitRegistry) -> Vec<&'a str> {
        self.all_units()
            .filter(|name| !registry.is_registered(name))
            .collect()
    }

    /// Every planned name in phase order.
    pub fn all_units(&self) -> impl Iterator<Item = &str> {
        self.analysis
            .iter()
            .map(String::as_str)
            .chain([self.synthesis.as_str(), self.validation.as_str()])
    }
}

impl Default for PipelinePlan {
    fn default() -> Self {
        Self::code_to_design()
    }
}
