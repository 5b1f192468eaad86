//! Handing a composed graph to the collaborator that turns it into a template.
//!
//! [`Synthesizer`] is the seam; [`JsonSynthesizer`] is the built-in
//! implementation producing a pipeline resource document.

mod secrets;
mod synthesizer;
mod template;

pub use secrets::{InMemorySecretStore, SecretStore};
pub use synthesizer::{validate_graph, JsonSynthesizer, Synthesizer};
pub use template::RenderedTemplate;

#[cfg(test)]
pub use secrets::MockSecretStore;
