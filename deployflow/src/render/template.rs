//! Rendered template document.

use crate::errors::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// The output of a synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTemplate {
    /// The template document.
    pub body: serde_json::Value,
    /// When the template was rendered (ISO 8601).
    pub rendered_at: String,
}

impl RenderedTemplate {
    /// Hex SHA-256 of the compact template body.
    ///
    /// Two renders of the same graph share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.body.to_string().as_bytes());
        hex::encode(digest)
    }

    /// Pretty-printed template body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    /// Writes the pretty-printed template to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_pretty_string()?).await?;
        info!(path = %path.display(), fingerprint = %self.fingerprint(), "Wrote template");
        Ok(())
    }
}
