//! # Deployflow
//!
//! Declarative, inspectable graphs of continuous-delivery pipelines.
//!
//! Deployflow builds the fixed part of a self-updating delivery pipeline and
//! lets callers extend it with environment stages:
//!
//! - **Fixed topology**: Source, Build and Pipeline_Update stages wired
//!   through named artifacts
//! - **Service stages**: deploy a service stack with the freshly built bundle
//! - **Billing and integration tests**: attach extra actions to a stage
//!   through the handle it was created with
//! - **Rendering**: hand the finished graph to a [`render::Synthesizer`]
//!
//! ## Quick Start
//!
//! ```rust
//! use deployflow::prelude::*;
//!
//! let config = PipelineConfig::new(
//!     SourceRepository::new("octo-org", "pipeline-infra"),
//!     SourceRepository::new("octo-org", "pipeline-service"),
//! );
//! let mut composer = PipelineComposer::construct(config)?;
//!
//! let test = composer.add_service_stage(&ServiceStack::new("ServiceStackTest", "Test"), "Test")?;
//! let billing = BillingStack::create(5.0, "ops@example.com")?;
//! composer.add_billing_stack_to_stage(&billing, &test)?;
//!
//! let graph = composer.graph();
//! assert_eq!(graph.stage_names(), vec!["Source", "Build", "Pipeline_Update", "Test"]);
//! # Ok::<(), deployflow::errors::DeployflowError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod render;
pub mod stacks;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BuildSpecPaths, PipelineConfig, SourceRepository};
    pub use crate::core::{
        Action, ActionConfig, ActionKind, ArtifactHandle, ArtifactLocation, ParameterValue,
    };
    pub use crate::errors::{
        ConfigurationError, ContractErrorInfo, DeployflowError, Result, TopologyError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{PipelineComposer, PipelineGraph, Stage, StageHandle};
    pub use crate::render::{JsonSynthesizer, RenderedTemplate, Synthesizer};
    pub use crate::stacks::{BillingStack, ServiceDescriptor, ServiceStack, StackDescriptor};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
