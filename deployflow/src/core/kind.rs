//! Action kinds and small enums shared by action configurations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Fetches a source repository.
    Source,
    /// Runs a build project.
    Build,
    /// Runs a build project as a test.
    Test,
    /// Creates or updates a stack.
    Deploy,
}

impl ActionKind {
    /// The category name the platform uses for this kind.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Build => "Build",
            Self::Test => "Test",
            Self::Deploy => "Deploy",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
            Self::Deploy => write!(f, "deploy"),
        }
    }
}

/// How a build environment variable is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentVariableType {
    /// The value is used as is.
    #[default]
    Plaintext,
    /// The value names a parameter store entry.
    ParameterStore,
    /// The value names a secrets manager entry.
    SecretsManager,
}

impl fmt::Display for EnvironmentVariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => write!(f, "PLAINTEXT"),
            Self::ParameterStore => write!(f, "PARAMETER_STORE"),
            Self::SecretsManager => write!(f, "SECRETS_MANAGER"),
        }
    }
}
