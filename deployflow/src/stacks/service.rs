//! Placeholder service stack.

use super::{ServiceDescriptor, StackDescriptor};
use crate::core::{ArtifactLocation, ParameterValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service code supplied through stack parameters at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersCode {
    /// Parameter receiving the bucket name.
    pub bucket_name_parameter: String,
    /// Parameter receiving the object key.
    pub object_key_parameter: String,
}

impl Default for ParametersCode {
    fn default() -> Self {
        Self {
            bucket_name_parameter: "ServiceCodeBucketName".to_string(),
            object_key_parameter: "ServiceCodeObjectKey".to_string(),
        }
    }
}

impl ParametersCode {
    /// Binds both parameters to the given artifact location.
    #[must_use]
    pub fn assign(&self, location: &ArtifactLocation) -> BTreeMap<String, ParameterValue> {
        BTreeMap::from([
            (self.bucket_name_parameter.clone(), location.bucket_name()),
            (self.object_key_parameter.clone(), location.object_key()),
        ])
    }
}

/// A service deployed once per environment stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStack {
    stack_name: String,
    /// The environment this instance serves (e.g. "Test", "Prod").
    pub stage_name: String,
    /// Where the service code comes from.
    #[serde(default)]
    pub service_code: ParametersCode,
}

impl ServiceStack {
    /// Creates a service stack.
    #[must_use]
    pub fn new(stack_name: impl Into<String>, stage_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            stage_name: stage_name.into(),
            service_code: ParametersCode::default(),
        }
    }

    /// Overrides the code parameters.
    #[must_use]
    pub fn with_service_code(mut self, service_code: ParametersCode) -> Self {
        self.service_code = service_code;
        self
    }
}

impl StackDescriptor for ServiceStack {
    fn stack_name(&self) -> &str {
        &self.stack_name
    }
}

impl ServiceDescriptor for ServiceStack {
    fn parameter_overrides(&self, location: &ArtifactLocation) -> BTreeMap<String, ParameterValue> {
        self.service_code.assign(location)
    }
}
