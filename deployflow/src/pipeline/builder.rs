//! Append-only stage list with per-pipeline name tracking.

use super::{Stage, StageHandle};
use crate::core::{Action, MAX_RUN_ORDER};
use crate::errors::{ConfigurationError, DeployflowError, TopologyError};
use crate::utils::validation::{validate_action_name, validate_stage_name};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Builds the ordered stage list of one pipeline instance.
#[derive(Debug, Clone)]
pub struct StageBuilder {
    /// The pipeline instance that owns the stages.
    owner: Uuid,
    /// Stages in pipeline order.
    stages: Vec<Stage>,
    /// Stage name to position.
    index: HashMap<String, usize>,
}

impl StageBuilder {
    /// Creates an empty builder for the pipeline instance `owner`.
    #[must_use]
    pub fn new(owner: Uuid) -> Self {
        Self {
            owner,
            stages: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Checks that a stage could be added without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid or duplicate stage name, for invalid
    /// or duplicate action names, or for a run order outside `1..=999`.
    pub fn check_stage(&self, name: &str, actions: &[Action]) -> Result<(), ConfigurationError> {
        validate_stage_name(name)?;
        if self.index.contains_key(name) {
            return Err(ConfigurationError::duplicate_stage(name));
        }

        let mut seen = HashSet::new();
        for action in actions {
            validate_action_name(&action.name)?;
            check_run_order(name, action)?;
            if !seen.insert(action.name.as_str()) {
                return Err(ConfigurationError::duplicate_action(name, &action.name));
            }
        }
        Ok(())
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// See [`check_stage`](Self::check_stage).
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        actions: Vec<Action>,
    ) -> Result<StageHandle, ConfigurationError> {
        let name = name.into();
        self.check_stage(&name, &actions)?;

        let position = self.stages.len();
        debug!(stage = %name, position, actions = actions.len(), "Added stage");
        self.stages.push(Stage::new(name.clone(), actions));
        self.index.insert(name.clone(), position);
        Ok(StageHandle::new(self.owner, position, name))
    }

    /// Checks that an action could be appended to the stage behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error for a foreign handle, an invalid or duplicate action
    /// name, or a run order outside `1..=999`.
    pub fn check_action(&self, handle: &StageHandle, action: &Action) -> Result<(), DeployflowError> {
        let stage = self.stage(handle)?;
        validate_action_name(&action.name)?;
        check_run_order(stage.name(), action)?;
        if stage.has_action(&action.name) {
            return Err(ConfigurationError::duplicate_action(stage.name(), &action.name).into());
        }
        Ok(())
    }

    /// Appends an action to an existing stage.
    ///
    /// # Errors
    ///
    /// See [`check_action`](Self::check_action).
    pub fn add_action(&mut self, handle: &StageHandle, action: Action) -> Result<(), DeployflowError> {
        self.check_action(handle, &action)?;
        debug!(stage = %handle.name(), action = %action.name, run_order = action.run_order, "Added action");
        self.stages[handle.index].push(action);
        Ok(())
    }

    /// Resolves a handle to its stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was issued by another pipeline instance.
    pub fn stage(&self, handle: &StageHandle) -> Result<&Stage, TopologyError> {
        if handle.owner != self.owner {
            return Err(TopologyError::foreign_stage_handle(handle.name()));
        }
        self.stages
            .get(handle.index)
            .filter(|stage| stage.name() == handle.name())
            .ok_or_else(|| TopologyError::foreign_stage_handle(handle.name()))
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Returns a handle for an existing stage name.
    #[must_use]
    pub fn handle_for(&self, name: &str) -> Option<StageHandle> {
        self.index
            .get(name)
            .map(|&i| StageHandle::new(self.owner, i, name))
    }

    /// Returns all stages in pipeline order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the stage names in pipeline order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

fn check_run_order(stage: &str, action: &Action) -> Result<(), ConfigurationError> {
    if (1..=MAX_RUN_ORDER).contains(&action.run_order) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_run_order(
            stage,
            &action.name,
            u64::from(action.run_order),
            MAX_RUN_ORDER,
        ))
    }
}
