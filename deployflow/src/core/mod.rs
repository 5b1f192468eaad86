//! Core domain model types for deployflow.
//!
//! This module contains the fundamental types of a pipeline graph:
//! - Artifact handles, paths and storage locations
//! - Actions and their kind-specific configuration
//! - Action kinds

mod action;
mod artifact;
mod kind;

pub use action::{
    Action, ActionConfig, BuildProjectConfig, EnvironmentVariable, GitHubSourceConfig, SecretRef,
    StackDeployConfig, DEFAULT_RUN_ORDER, MAX_RUN_ORDER,
};
pub use artifact::{
    ArtifactAttribute, ArtifactHandle, ArtifactLocation, ArtifactPath, ArtifactRecord,
    ParameterValue, ProducerRef,
};
pub use kind::{ActionKind, EnvironmentVariableType};
