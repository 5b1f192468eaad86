//! Descriptors of the stacks a pipeline deploys.
//!
//! The composer only needs a stable stack name from every descriptor, and
//! from services additionally the parameters that point the stack at the
//! freshly built service bundle.

mod billing;
mod service;

pub use billing::{
    BillingStack, BudgetDefinition, BudgetLimit, BudgetNotification, ComparisonOperator,
    NotificationType, ThresholdType, TimeUnit,
};
pub use service::{ParametersCode, ServiceStack};

use crate::core::{ArtifactLocation, ParameterValue};
use std::collections::BTreeMap;

/// Anything deployable as a stack.
pub trait StackDescriptor {
    /// The stable stack identifier.
    fn stack_name(&self) -> &str;
}

/// A service stack fed by the service build output.
pub trait ServiceDescriptor: StackDescriptor {
    /// Maps parameter names to values, given where the built service bundle lives.
    fn parameter_overrides(&self, location: &ArtifactLocation) -> BTreeMap<String, ParameterValue>;
}
