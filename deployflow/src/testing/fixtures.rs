//! Test fixtures.

use crate::config::{PipelineConfig, SourceRepository};
use crate::core::{ArtifactLocation, ParameterValue};
use crate::pipeline::PipelineComposer;
use crate::stacks::{ServiceDescriptor, StackDescriptor};
use std::collections::BTreeMap;

/// A configuration pointing at two placeholder repositories.
#[must_use]
pub fn sample_config() -> PipelineConfig {
    PipelineConfig::new(
        SourceRepository::new("octo-org", "pipeline-infra"),
        SourceRepository::new("octo-org", "pipeline-service"),
    )
}

/// A composer built from [`sample_config`].
///
/// # Panics
///
/// Panics if the sample configuration is rejected.
#[must_use]
pub fn sample_composer() -> PipelineComposer {
    PipelineComposer::construct(sample_config()).expect("sample config is valid")
}

/// A service descriptor with a fixed stack name that maps the artifact
/// location onto a single `CodeLocation` parameter plus fixed literals.
#[derive(Debug, Clone, Default)]
pub struct StaticService {
    stack_name: String,
    literals: BTreeMap<String, String>,
}

impl StaticService {
    /// Creates a service with the given stack name.
    #[must_use]
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            literals: BTreeMap::new(),
        }
    }

    /// Adds a literal parameter override.
    #[must_use]
    pub fn with_literal(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.literals.insert(name.into(), value.into());
        self
    }
}

impl StackDescriptor for StaticService {
    fn stack_name(&self) -> &str {
        &self.stack_name
    }
}

impl ServiceDescriptor for StaticService {
    fn parameter_overrides(&self, location: &ArtifactLocation) -> BTreeMap<String, ParameterValue> {
        let mut overrides: BTreeMap<String, ParameterValue> = self
            .literals
            .iter()
            .map(|(k, v)| (k.clone(), ParameterValue::literal(v)))
            .collect();
        overrides.insert("CodeLocation".to_string(), location.object_key());
        overrides
    }
}
