//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use pipeflow::pipeline::{Graph, PortId, Value};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Read a port as a number, panicking with the port id if it is not one
pub fn number_at(graph: &Graph, port: PortId) -> f64 {
    match graph.value(port) {
        Some(Value::Number(n)) => *n,
        other => panic!("Expected a number on {}, found {:?}", port, other),
    }
}
