//! Artifact handles and the references derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A handle to a named bundle of files passed between actions.
///
/// Handles are issued by an [`ArtifactRegistry`](crate::pipeline::ArtifactRegistry)
/// and remember which registry issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle {
    name: String,
    registry: Uuid,
}

impl ArtifactHandle {
    pub(crate) fn new(name: impl Into<String>, registry: Uuid) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }

    /// Returns the artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn registry(&self) -> Uuid {
        self.registry
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A file inside an artifact, e.g. `CdkBuildOutput::PipelineStack.template.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPath {
    /// The artifact name.
    pub artifact: String,
    /// The path relative to the artifact root.
    pub file_name: String,
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.artifact, self.file_name)
    }
}

/// An attribute of a stored artifact that the platform resolves at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactAttribute {
    /// The bucket holding the artifact.
    BucketName,
    /// The object key of the artifact inside the bucket.
    ObjectKey,
    /// A URL to the artifact.
    Url,
}

impl fmt::Display for ArtifactAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BucketName => write!(f, "BucketName"),
            Self::ObjectKey => write!(f, "ObjectKey"),
            Self::Url => write!(f, "URL"),
        }
    }
}

/// The value of a deploy-time parameter override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterValue {
    /// A plain string.
    Literal {
        /// The value.
        value: String,
    },
    /// An attribute of an artifact, resolved by the platform.
    ArtifactAttribute {
        /// The artifact name.
        artifact: String,
        /// Which attribute to resolve.
        attribute: ArtifactAttribute,
    },
}

impl ParameterValue {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }
}

/// Storage location of an artifact, resolved later by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// The artifact name.
    pub artifact: String,
}

impl ArtifactLocation {
    /// Reference to the bucket holding the artifact.
    #[must_use]
    pub fn bucket_name(&self) -> ParameterValue {
        self.attribute(ArtifactAttribute::BucketName)
    }

    /// Reference to the object key of the artifact.
    #[must_use]
    pub fn object_key(&self) -> ParameterValue {
        self.attribute(ArtifactAttribute::ObjectKey)
    }

    fn attribute(&self, attribute: ArtifactAttribute) -> ParameterValue {
        ParameterValue::ArtifactAttribute {
            artifact: self.artifact.clone(),
            attribute,
        }
    }
}

/// The action that produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRef {
    /// The stage name.
    pub stage: String,
    /// The action name.
    pub action: String,
}

impl fmt::Display for ProducerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage, self.action)
    }
}

/// Registry entry for a declared artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// The artifact name.
    pub name: String,
    /// The producing action, once one has been added.
    pub producer: Option<ProducerRef>,
}
