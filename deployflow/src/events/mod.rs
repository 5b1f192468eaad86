//! Composition events.
//!
//! The composer reports every graph mutation to an [`EventSink`]; the
//! synthesizer reports render outcomes the same way.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event types emitted by deployflow.
pub mod event_types {
    /// The fixed topology was built.
    pub const PIPELINE_CONSTRUCTED: &str = "pipeline.constructed";
    /// A stage was appended.
    pub const STAGE_ADDED: &str = "pipeline.stage_added";
    /// An action was appended to an existing stage.
    pub const ACTION_ADDED: &str = "pipeline.action_added";
    /// A template was rendered.
    pub const TEMPLATE_RENDERED: &str = "render.completed";
    /// Rendering failed.
    pub const TEMPLATE_FAILED: &str = "render.failed";
}
