//! Per-pipeline registry of declared artifacts.

use crate::core::{ArtifactHandle, ArtifactLocation, ArtifactPath, ArtifactRecord, ProducerRef};
use crate::errors::{ConfigurationError, TopologyError};
use crate::utils::validation::validate_artifact_name;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Tracks named intermediate outputs and which action produced each one.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    id: Uuid,
    records: HashMap<String, ArtifactRecord>,
    /// Declaration order.
    order: Vec<String>,
}

impl ArtifactRegistry {
    /// Creates an empty registry owned by the pipeline instance `id`.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Declares a new artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already declared.
    pub fn declare(&mut self, name: impl Into<String>) -> Result<ArtifactHandle, ConfigurationError> {
        let name = name.into();
        validate_artifact_name(&name)?;
        if self.records.contains_key(&name) {
            return Err(ConfigurationError::duplicate_artifact(&name));
        }

        debug!(artifact = %name, "Declared artifact");
        self.order.push(name.clone());
        self.records.insert(
            name.clone(),
            ArtifactRecord {
                name: name.clone(),
                producer: None,
            },
        );
        Ok(ArtifactHandle::new(name, self.id))
    }

    /// Returns a reference to a file inside the artifact.
    #[must_use]
    pub fn resolve_path(&self, handle: &ArtifactHandle, relative_path: impl Into<String>) -> ArtifactPath {
        ArtifactPath {
            artifact: handle.name().to_string(),
            file_name: relative_path.into(),
        }
    }

    /// Returns the storage location of the artifact.
    #[must_use]
    pub fn location(&self, handle: &ArtifactHandle) -> ArtifactLocation {
        ArtifactLocation {
            artifact: handle.name().to_string(),
        }
    }

    /// Returns true if the handle was issued by this registry.
    #[must_use]
    pub fn contains(&self, handle: &ArtifactHandle) -> bool {
        handle.registry() == self.id && self.records.contains_key(handle.name())
    }

    /// Records `producer` as the action producing the artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or the artifact already has a producer.
    pub fn record_producer(
        &mut self,
        handle: &ArtifactHandle,
        producer: ProducerRef,
    ) -> Result<(), TopologyError> {
        let record = self.record_mut(handle)?;
        if let Some(existing) = &record.producer {
            return Err(TopologyError::artifact_reproduced(
                handle.name(),
                existing.to_string(),
            ));
        }
        debug!(artifact = %handle, producer = %producer, "Recorded artifact producer");
        record.producer = Some(producer);
        Ok(())
    }

    /// Checks that the artifact is produced in a stage before the one where
    /// `consumer` reads it.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown, has no producer yet, or is
    /// produced in the consumer's own stage.
    pub fn ensure_produced(&self, handle: &ArtifactHandle, consumer: &ProducerRef) -> Result<(), TopologyError> {
        let record = self.record(handle)?;
        match &record.producer {
            Some(producer) if producer.stage != consumer.stage => Ok(()),
            _ => Err(TopologyError::artifact_not_produced(
                handle.name(),
                consumer.to_string(),
            )),
        }
    }

    /// Returns the record for a handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was not issued by this registry.
    pub fn record(&self, handle: &ArtifactHandle) -> Result<&ArtifactRecord, TopologyError> {
        if handle.registry() != self.id {
            return Err(TopologyError::unknown_artifact(handle.name()));
        }
        self.records
            .get(handle.name())
            .ok_or_else(|| TopologyError::unknown_artifact(handle.name()))
    }

    fn record_mut(&mut self, handle: &ArtifactHandle) -> Result<&mut ArtifactRecord, TopologyError> {
        if handle.registry() != self.id {
            return Err(TopologyError::unknown_artifact(handle.name()));
        }
        self.records
            .get_mut(handle.name())
            .ok_or_else(|| TopologyError::unknown_artifact(handle.name()))
    }

    /// Returns all records in declaration order.
    #[must_use]
    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name).cloned())
            .collect()
    }

    /// Returns the number of declared artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
