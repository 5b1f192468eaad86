//! Error types for deployflow.
//!
//! Three families are distinguished:
//! - configuration errors (bad names, duplicate names, invalid billing
//!   parameters, unknown credentials)
//! - topology errors (stage handles from another composer, artifacts produced
//!   twice or consumed before they are produced)
//! - collaborator errors raised by whatever turns the graph into a template

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for deployflow operations.
#[derive(Debug, Error)]
pub enum DeployflowError {
    /// The pipeline or one of its descriptors is misconfigured.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// An operation would produce an inconsistent graph.
    #[error("{0}")]
    Topology(#[from] TopologyError),

    /// An external collaborator (synthesizer, secret store) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployflowError {
    /// Returns the contract error info attached to the error, if any.
    #[must_use]
    pub fn error_info(&self) -> Option<&ContractErrorInfo> {
        match self {
            Self::Configuration(err) => Some(&err.error_info),
            Self::Topology(err) => Some(err.error_info()),
            _ => None,
        }
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info().map(|info| info.code.as_str())
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONFIG-001-DUPLICATE_STAGE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error codes used by [`ConfigurationError`] and [`TopologyError`].
pub mod codes {
    /// Two stages share a name.
    pub const DUPLICATE_STAGE: &str = "CONFIG-001-DUPLICATE_STAGE";
    /// Two actions in one stage share a name.
    pub const DUPLICATE_ACTION: &str = "CONFIG-002-DUPLICATE_ACTION";
    /// Two artifacts share a name.
    pub const DUPLICATE_ARTIFACT: &str = "CONFIG-003-DUPLICATE_ARTIFACT";
    /// A stage, action or artifact name has invalid characters or length.
    pub const INVALID_NAME: &str = "CONFIG-004-INVALID_NAME";
    /// Billing parameters are out of range.
    pub const INVALID_BILLING: &str = "CONFIG-005-INVALID_BILLING";
    /// A credential could not be found in the secret store.
    pub const MISSING_CREDENTIAL: &str = "CONFIG-006-MISSING_CREDENTIAL";
    /// A required configuration value is empty.
    pub const MISSING_VALUE: &str = "CONFIG-007-MISSING_VALUE";
    /// An action's run order is outside the accepted range.
    pub const INVALID_RUN_ORDER: &str = "CONFIG-008-INVALID_RUN_ORDER";
    /// Two build projects would share a template resource.
    pub const DUPLICATE_PROJECT: &str = "CONFIG-009-DUPLICATE_PROJECT";
    /// A stage handle came from another composer.
    pub const FOREIGN_HANDLE: &str = "TOPOLOGY-001-FOREIGN_HANDLE";
    /// An artifact was declared as output of two actions.
    pub const ARTIFACT_REPRODUCED: &str = "TOPOLOGY-002-ARTIFACT_REPRODUCED";
    /// An artifact was consumed before any action produced it.
    pub const ARTIFACT_NOT_PRODUCED: &str = "TOPOLOGY-003-ARTIFACT_NOT_PRODUCED";
    /// An artifact handle is not known to the registry.
    pub const UNKNOWN_ARTIFACT: &str = "TOPOLOGY-004-UNKNOWN_ARTIFACT";
}

/// Error raised when the pipeline configuration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl ConfigurationError {
    /// Creates a configuration error from a code and message.
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_info: ContractErrorInfo::new(code, message.clone()),
            message,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.error_info = self.error_info.with_fix_hint(hint);
        self
    }

    /// A stage with this name already exists.
    #[must_use]
    pub fn duplicate_stage(name: &str) -> Self {
        let mut err = Self::new(
            codes::DUPLICATE_STAGE,
            format!("Stage '{name}' already exists in this pipeline"),
        )
        .with_fix_hint("Stage names must be unique within a pipeline; pick another name.");
        err.error_info = err.error_info.with_context_entry("stage", name);
        err
    }

    /// An action with this name already exists in the stage.
    #[must_use]
    pub fn duplicate_action(stage: &str, action: &str) -> Self {
        let mut err = Self::new(
            codes::DUPLICATE_ACTION,
            format!("Stage '{stage}' already contains an action named '{action}'"),
        );
        err.error_info = err
            .error_info
            .with_context_entry("stage", stage)
            .with_context_entry("action", action);
        err
    }

    /// An artifact with this name was already declared.
    #[must_use]
    pub fn duplicate_artifact(name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_ARTIFACT,
            format!("Artifact '{name}' is already declared in this pipeline"),
        )
    }

    /// A name failed validation.
    #[must_use]
    pub fn invalid_name(kind: &str, name: &str, rule: &str) -> Self {
        Self::new(
            codes::INVALID_NAME,
            format!("Invalid {kind} name '{name}': {rule}"),
        )
    }

    /// An action's run order is outside `1..=max`.
    #[must_use]
    pub fn invalid_run_order(stage: &str, action: &str, run_order: u64, max: u32) -> Self {
        let mut err = Self::new(
            codes::INVALID_RUN_ORDER,
            format!("Action '{action}' in stage '{stage}' has run order {run_order}, expected 1..={max}"),
        );
        err.error_info = err
            .error_info
            .with_context_entry("stage", stage)
            .with_context_entry("action", action);
        err
    }

    /// A build project name is used by two different definitions.
    #[must_use]
    pub fn duplicate_project(name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_PROJECT,
            format!("Build project '{name}' is defined twice with different settings"),
        )
        .with_fix_hint("Give each build project its own name.")
    }

    /// A required value is empty.
    #[must_use]
    pub fn missing_value(field: &str) -> Self {
        Self::new(codes::MISSING_VALUE, format!("'{field}' must not be empty"))
    }
}

/// Error raised when an operation would leave the graph inconsistent.
#[derive(Debug, Clone, Error)]
pub enum TopologyError {
    /// The stage handle was issued by a different composer.
    #[error("Stage handle for '{stage}' belongs to another pipeline instance")]
    ForeignStageHandle {
        /// The stage the handle points to.
        stage: String,
        /// Contract error info.
        error_info: ContractErrorInfo,
    },

    /// The artifact already has a producer.
    #[error("Artifact '{artifact}' is already produced by '{producer}'")]
    ArtifactReproduced {
        /// The artifact name.
        artifact: String,
        /// The existing producer (`stage/action`).
        producer: String,
        /// Contract error info.
        error_info: ContractErrorInfo,
    },

    /// The artifact has no producer yet.
    #[error("Artifact '{artifact}' is consumed by '{consumer}' before it is produced")]
    ArtifactNotProduced {
        /// The artifact name.
        artifact: String,
        /// The consuming action (`stage/action`).
        consumer: String,
        /// Contract error info.
        error_info: ContractErrorInfo,
    },

    /// The artifact handle is not registered.
    #[error("Artifact '{artifact}' is not declared in this pipeline")]
    UnknownArtifact {
        /// The artifact name.
        artifact: String,
        /// Contract error info.
        error_info: ContractErrorInfo,
    },
}

impl TopologyError {
    /// Creates a foreign stage handle error.
    #[must_use]
    pub fn foreign_stage_handle(stage: impl Into<String>) -> Self {
        Self::ForeignStageHandle {
            stage: stage.into(),
            error_info: ContractErrorInfo::new(
                codes::FOREIGN_HANDLE,
                "Stage handles are only valid for the composer that issued them",
            )
            .with_fix_hint(
                "Attach billing stacks and integration tests to stages created by the same composer.",
            ),
        }
    }

    /// Creates an artifact-reproduced error.
    #[must_use]
    pub fn artifact_reproduced(artifact: impl Into<String>, producer: impl Into<String>) -> Self {
        Self::ArtifactReproduced {
            artifact: artifact.into(),
            producer: producer.into(),
            error_info: ContractErrorInfo::new(
                codes::ARTIFACT_REPRODUCED,
                "An artifact must be produced by exactly one action",
            ),
        }
    }

    /// Creates an artifact-not-produced error.
    #[must_use]
    pub fn artifact_not_produced(artifact: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self::ArtifactNotProduced {
            artifact: artifact.into(),
            consumer: consumer.into(),
            error_info: ContractErrorInfo::new(
                codes::ARTIFACT_NOT_PRODUCED,
                "An artifact must be produced before it is consumed",
            )
            .with_fix_hint("Add the producing action in an earlier stage."),
        }
    }

    /// Creates an unknown-artifact error.
    #[must_use]
    pub fn unknown_artifact(artifact: impl Into<String>) -> Self {
        Self::UnknownArtifact {
            artifact: artifact.into(),
            error_info: ContractErrorInfo::new(
                codes::UNKNOWN_ARTIFACT,
                "Artifact handles must come from this pipeline's registry",
            ),
        }
    }

    /// Returns the contract error info.
    #[must_use]
    pub const fn error_info(&self) -> &ContractErrorInfo {
        match self {
            Self::ForeignStageHandle { error_info, .. }
            | Self::ArtifactReproduced { error_info, .. }
            | Self::ArtifactNotProduced { error_info, .. }
            | Self::UnknownArtifact { error_info, .. } => error_info,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = DeployflowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_builder() {
        let info = ContractErrorInfo::new(codes::MISSING_VALUE, "Endpoint is blank")
            .with_fix_hint("Pass the service URL")
            .with_context_entry("stage", "Prod");

        assert_eq!(info.code, codes::MISSING_VALUE);
        assert_eq!(info.fix_hint.as_deref(), Some("Pass the service URL"));
        assert_eq!(info.context["stage"], "Prod");
    }

    #[test]
    fn test_duplicate_stage_error() {
        let err = ConfigurationError::duplicate_stage("Test");
        assert_eq!(err.error_info.code, codes::DUPLICATE_STAGE);
        assert!(err.to_string().contains("'Test'"));
        assert_eq!(err.error_info.context.get("stage"), Some(&"Test".to_string()));
    }

    #[test]
    fn test_wrapped_error_code() {
        let err: DeployflowError = TopologyError::foreign_stage_handle("Prod").into();
        assert_eq!(err.code(), Some(codes::FOREIGN_HANDLE));

        let err = DeployflowError::Collaborator("synth failed".to_string());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Collaborator error: synth failed");
    }

    #[test]
    fn test_topology_error_messages() {
        let err = TopologyError::artifact_not_produced("ServiceBuildOutput", "Test/Service_Update");
        assert_eq!(
            err.to_string(),
            "Artifact 'ServiceBuildOutput' is consumed by 'Test/Service_Update' before it is produced"
        );
        assert_eq!(err.error_info().code, codes::ARTIFACT_NOT_PRODUCED);
    }
}
