//! Assertions over composed pipelines.

use crate::pipeline::{PipelineGraph, Stage};

/// Asserts the graph's stages are exactly `expected`, in order.
pub fn assert_stage_order(graph: &PipelineGraph, expected: &[&str]) {
    let actual = graph.stage_names();
    assert_eq!(
        actual, expected,
        "Expected stage order {:?}, got {:?}",
        expected, actual
    );
}

/// Asserts the stage's actions are exactly `expected`, in append order.
pub fn assert_action_names(stage: &Stage, expected: &[&str]) {
    let actual: Vec<&str> = stage.actions().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        actual,
        expected,
        "Expected actions {:?} in stage '{}', got {:?}",
        expected,
        stage.name(),
        actual
    );
}

/// Asserts the run order of each action, in append order.
pub fn assert_run_orders(stage: &Stage, expected: &[u32]) {
    let actual: Vec<u32> = stage.actions().iter().map(|a| a.run_order).collect();
    assert_eq!(
        actual,
        expected,
        "Expected run orders {:?} in stage '{}', got {:?}",
        expected,
        stage.name(),
        actual
    );
}
