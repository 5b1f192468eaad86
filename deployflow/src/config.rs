//! Configuration for the fixed part of the pipeline.

use crate::errors::ConfigurationError;
use crate::utils::validation::{require_non_blank, validate_stage_name};
use serde::{Deserialize, Serialize};

/// A source repository tracked by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepository {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to track.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl SourceRepository {
    /// Creates a repository reference tracking `main`.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
        }
    }

    /// Sets the branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    fn validate(&self, field: &str) -> Result<(), ConfigurationError> {
        require_non_blank(&format!("{field}.owner"), &self.owner)?;
        require_non_blank(&format!("{field}.repo"), &self.repo)?;
        require_non_blank(&format!("{field}.branch"), &self.branch)
    }
}

/// Build specification files, relative to the respective source artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpecPaths {
    /// Builds the pipeline definition.
    #[serde(default = "default_pipeline_spec")]
    pub pipeline: String,
    /// Builds the service.
    #[serde(default = "default_service_spec")]
    pub service: String,
    /// Runs the service integration tests.
    #[serde(default = "default_integration_test_spec")]
    pub integration_test: String,
}

fn default_pipeline_spec() -> String {
    "build-specs/cdk-build-spec.yml".to_string()
}

fn default_service_spec() -> String {
    "build-specs/service-build-spec.yml".to_string()
}

fn default_integration_test_spec() -> String {
    "build-specs/integ-test-build-spec.yml".to_string()
}

impl Default for BuildSpecPaths {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline_spec(),
            service: default_service_spec(),
            integration_test: default_integration_test_spec(),
        }
    }
}

/// Configuration of a pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The pipeline name.
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
    /// The stack holding the pipeline itself, redeployed by the self-update stage.
    #[serde(default = "default_pipeline_stack_name")]
    pub pipeline_stack_name: String,
    /// Repository holding the pipeline definition.
    pub pipeline_source: SourceRepository,
    /// Repository holding the service code.
    pub service_source: SourceRepository,
    /// Name of the secret holding the repository access token.
    #[serde(default = "default_oauth_secret_name")]
    pub oauth_secret_name: String,
    /// Container image for build projects.
    #[serde(default = "default_build_image")]
    pub build_image: String,
    /// Build specification files.
    #[serde(default)]
    pub build_specs: BuildSpecPaths,
    /// Whether to create cross-account encryption keys.
    #[serde(default)]
    pub cross_account_keys: bool,
    /// Whether a pipeline update restarts the running execution.
    #[serde(default = "default_restart_execution_on_update")]
    pub restart_execution_on_update: bool,
}

fn default_pipeline_name() -> String {
    "Pipeline".to_string()
}

fn default_pipeline_stack_name() -> String {
    "PipelineStack".to_string()
}

fn default_oauth_secret_name() -> String {
    "github-pipeline-pat".to_string()
}

fn default_build_image() -> String {
    "aws/codebuild/standard:5.0".to_string()
}

const fn default_restart_execution_on_update() -> bool {
    true
}

impl PipelineConfig {
    /// Creates a configuration with defaults for everything but the sources.
    #[must_use]
    pub fn new(pipeline_source: SourceRepository, service_source: SourceRepository) -> Self {
        Self {
            pipeline_name: default_pipeline_name(),
            pipeline_stack_name: default_pipeline_stack_name(),
            pipeline_source,
            service_source,
            oauth_secret_name: default_oauth_secret_name(),
            build_image: default_build_image(),
            build_specs: BuildSpecPaths::default(),
            cross_account_keys: false,
            restart_execution_on_update: default_restart_execution_on_update(),
        }
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = name.into();
        self
    }

    /// Sets the stack name of the pipeline itself.
    #[must_use]
    pub fn with_pipeline_stack_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_stack_name = name.into();
        self
    }

    /// Sets the access token secret name.
    #[must_use]
    pub fn with_oauth_secret_name(mut self, name: impl Into<String>) -> Self {
        self.oauth_secret_name = name.into();
        self
    }

    /// Sets the build image.
    #[must_use]
    pub fn with_build_image(mut self, image: impl Into<String>) -> Self {
        self.build_image = image.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is blank or the pipeline name is invalid.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_stage_name(&self.pipeline_name)?;
        require_non_blank("pipeline_stack_name", &self.pipeline_stack_name)?;
        self.pipeline_source.validate("pipeline_source")?;
        self.service_source.validate("service_source")?;
        require_non_blank("oauth_secret_name", &self.oauth_secret_name)?;
        require_non_blank("build_image", &self.build_image)?;
        require_non_blank("build_specs.pipeline", &self.build_specs.pipeline)?;
        require_non_blank("build_specs.service", &self.build_specs.service)?;
        require_non_blank("build_specs.integration_test", &self.build_specs.integration_test)
    }
}
