//! Inspectable snapshot of a composed pipeline.

use super::Stage;
use crate::core::{Action, ArtifactRecord};
use serde::{Deserialize, Serialize};

/// Pipeline-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// The pipeline name.
    pub name: String,
    /// Whether cross-account encryption keys are created.
    pub cross_account_keys: bool,
    /// Whether a pipeline update restarts the running execution.
    pub restart_execution_on_update: bool,
}

/// The whole pipeline: settings, ordered stages and the artifacts they pass.
///
/// This is what gets handed to a [`Synthesizer`](crate::render::Synthesizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGraph {
    /// Pipeline-wide settings.
    pub settings: PipelineSettings,
    /// Stages in pipeline order.
    pub stages: Vec<Stage>,
    /// Declared artifacts in declaration order.
    pub artifacts: Vec<ArtifactRecord>,
}

impl PipelineGraph {
    /// Stage names in pipeline order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Iterates over every action with its stage, in pipeline order.
    pub fn actions(&self) -> impl Iterator<Item = (&Stage, &Action)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.actions().iter().map(move |action| (stage, action)))
    }

    /// Total number of actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.stages.iter().map(|s| s.actions().len()).sum()
    }
}
