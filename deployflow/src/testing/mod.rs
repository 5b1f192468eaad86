//! Testing utilities for pipeline graphs.
//!
//! This module provides:
//! - Sample configurations and service descriptors
//! - Assertions over stage order and stage contents

mod assertions;
mod fixtures;

pub use assertions::{assert_action_names, assert_run_orders, assert_stage_order};
pub use fixtures::{sample_config, sample_composer, StaticService};
