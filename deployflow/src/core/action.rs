//! Actions: the units of work inside a stage.

use super::{ActionKind, ArtifactHandle, ArtifactPath, EnvironmentVariableType, ParameterValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Run order given to actions that do not set one.
pub const DEFAULT_RUN_ORDER: u32 = 1;

/// Highest run order the platform accepts.
pub const MAX_RUN_ORDER: u32 = 999;

/// A credential referenced by name; looked up by the platform at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    /// The secret name.
    pub name: String,
}

impl SecretRef {
    /// Creates a secret reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The dynamic reference string the platform resolves.
    #[must_use]
    pub fn dynamic_reference(&self) -> String {
        format!("{{{{resolve:secretsmanager:{}:SecretString:::}}}}", self.name)
    }
}

/// Configuration of a repository source fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSourceConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to track.
    pub branch: String,
    /// Access token reference.
    pub oauth_token: SecretRef,
}

/// An environment variable passed to a build project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// The value (or the name of the entry holding it).
    pub value: String,
    /// How the value is resolved.
    #[serde(rename = "type")]
    pub variable_type: EnvironmentVariableType,
}

impl EnvironmentVariable {
    /// Creates a plaintext variable.
    #[must_use]
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            variable_type: EnvironmentVariableType::Plaintext,
        }
    }
}

/// Configuration of a build project run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProjectConfig {
    /// The project name.
    pub project_name: String,
    /// Container image used for the build.
    pub build_image: String,
    /// Path of the build specification file inside the input artifact.
    pub build_spec: String,
    /// Environment variables for the run.
    #[serde(default)]
    pub environment_variables: BTreeMap<String, EnvironmentVariable>,
}

impl BuildProjectConfig {
    /// Creates a build project configuration.
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        build_image: impl Into<String>,
        build_spec: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            build_image: build_image.into(),
            build_spec: build_spec.into(),
            environment_variables: BTreeMap::new(),
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_environment_variable(
        mut self,
        name: impl Into<String>,
        variable: EnvironmentVariable,
    ) -> Self {
        self.environment_variables.insert(name.into(), variable);
        self
    }
}

/// Configuration of a stack create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDeployConfig {
    /// The stack to create or update.
    pub stack_name: String,
    /// The template file.
    pub template_path: ArtifactPath,
    /// Whether the deploy runs with administrator permissions.
    pub admin_permissions: bool,
    /// Parameter overrides passed to the stack.
    #[serde(default)]
    pub parameter_overrides: BTreeMap<String, ParameterValue>,
}

/// Kind-specific action parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Repository source fetch.
    GitHubSource(GitHubSourceConfig),
    /// Build project run (build or test).
    CodeBuild(BuildProjectConfig),
    /// Stack create/update.
    StackDeploy(StackDeployConfig),
}

/// A unit of work within a stage.
///
/// Actions are immutable once they are added to a stage; the builder methods
/// consume `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The action name, unique within its stage.
    pub name: String,
    /// The kind of work.
    pub kind: ActionKind,
    /// Relative ordering within the stage.
    pub run_order: u32,
    /// The primary input artifact.
    pub input: Option<ArtifactHandle>,
    /// Additional input artifacts.
    #[serde(default)]
    pub extra_inputs: Vec<ArtifactHandle>,
    /// Artifacts this action produces.
    #[serde(default)]
    pub outputs: Vec<ArtifactHandle>,
    /// Kind-specific parameters.
    pub config: ActionConfig,
}

impl Action {
    fn new(name: impl Into<String>, kind: ActionKind, config: ActionConfig) -> Self {
        Self {
            name: name.into(),
            kind,
            run_order: DEFAULT_RUN_ORDER,
            input: None,
            extra_inputs: Vec::new(),
            outputs: Vec::new(),
            config,
        }
    }

    /// Creates a source fetch producing `output`.
    #[must_use]
    pub fn github_source(
        name: impl Into<String>,
        config: GitHubSourceConfig,
        output: ArtifactHandle,
    ) -> Self {
        let mut action = Self::new(name, ActionKind::Source, ActionConfig::GitHubSource(config));
        action.outputs.push(output);
        action
    }

    /// Creates a build consuming `input`.
    #[must_use]
    pub fn build(name: impl Into<String>, project: BuildProjectConfig, input: ArtifactHandle) -> Self {
        let mut action = Self::new(name, ActionKind::Build, ActionConfig::CodeBuild(project));
        action.input = Some(input);
        action
    }

    /// Creates a test run consuming `input`.
    #[must_use]
    pub fn test(name: impl Into<String>, project: BuildProjectConfig, input: ArtifactHandle) -> Self {
        let mut action = Self::new(name, ActionKind::Test, ActionConfig::CodeBuild(project));
        action.input = Some(input);
        action
    }

    /// Creates a stack deploy. The artifact holding the template is the input.
    #[must_use]
    pub fn deploy(name: impl Into<String>, config: StackDeployConfig, template: ArtifactHandle) -> Self {
        let mut action = Self::new(name, ActionKind::Deploy, ActionConfig::StackDeploy(config));
        action.input = Some(template);
        action
    }

    /// Sets the run order.
    #[must_use]
    pub const fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = run_order;
        self
    }

    /// Adds an output artifact.
    #[must_use]
    pub fn with_output(mut self, output: ArtifactHandle) -> Self {
        self.outputs.push(output);
        self
    }

    /// Adds an extra input artifact.
    #[must_use]
    pub fn with_extra_input(mut self, input: ArtifactHandle) -> Self {
        self.extra_inputs.push(input);
        self
    }

    /// All artifacts consumed by this action, primary input first.
    pub fn inputs(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.input.iter().chain(self.extra_inputs.iter())
    }

    /// Returns true if the action consumes the artifact.
    #[must_use]
    pub fn consumes(&self, artifact: &ArtifactHandle) -> bool {
        self.inputs().any(|input| input == artifact)
    }

    /// Returns the deploy configuration, if this is a deploy action.
    #[must_use]
    pub const fn deploy_config(&self) -> Option<&StackDeployConfig> {
        match &self.config {
            ActionConfig::StackDeploy(config) => Some(config),
            _ => None,
        }
    }

    /// Returns the build project configuration, if this runs a build project.
    #[must_use]
    pub const fn build_config(&self) -> Option<&BuildProjectConfig> {
        match &self.config {
            ActionConfig::CodeBuild(config) => Some(config),
            _ => None,
        }
    }
}
