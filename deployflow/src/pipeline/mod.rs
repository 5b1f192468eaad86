//! Pipeline graph construction.
//!
//! This module provides:
//! - The per-pipeline artifact registry
//! - Stages, stage handles and the append-only stage builder
//! - The composer that builds the fixed topology and extends it
//! - The inspectable graph snapshot handed to synthesizers

mod builder;
mod composer;
#[cfg(test)]
mod composer_tests;
mod graph;
mod registry;
mod stage;

pub use builder::StageBuilder;
pub use composer::{names, PipelineComposer};
pub use graph::{PipelineGraph, PipelineSettings};
pub use registry::ArtifactRegistry;
pub use stage::{Stage, StageHandle};
