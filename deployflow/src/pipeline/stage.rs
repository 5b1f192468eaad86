//! Stages and the handles callers use to refer to them.

use crate::core::{Action, ActionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A capability token referring to one stage of one pipeline instance.
///
/// Handles are only honoured by the composer that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageHandle {
    pub(crate) owner: Uuid,
    pub(crate) index: usize,
    name: String,
}

impl StageHandle {
    pub(crate) fn new(owner: Uuid, index: usize, name: impl Into<String>) -> Self {
        Self {
            owner,
            index,
            name: name.into(),
        }
    }

    /// The name of the stage this handle points to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the stage in the pipeline.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// An ordered, named collection of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    name: String,
    actions: Vec<Action>,
}

impl Stage {
    pub(crate) fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions in append order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Looks up an action by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Returns true if an action with this name exists.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.action(name).is_some()
    }

    /// Highest run order among actions of `kind`, if any.
    #[must_use]
    pub fn max_run_order_of(&self, kind: ActionKind) -> Option<u32> {
        self.actions
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.run_order)
            .max()
    }

    /// Groups actions into the waves the platform will run.
    ///
    /// Actions sharing a run order run concurrently; a wave starts only after
    /// every lower wave has finished.
    #[must_use]
    pub fn execution_waves(&self) -> Vec<(u32, Vec<&Action>)> {
        let mut waves: BTreeMap<u32, Vec<&Action>> = BTreeMap::new();
        for action in &self.actions {
            waves.entry(action.run_order).or_default().push(action);
        }
        waves.into_iter().collect()
    }
}
