//! # pipeflow: dataflow graph engine for visual pipeline editors
//!
//! Nodes expose typed inlets and outlets. Linking an outlet to an inlet makes
//! the inlet follow the outlet; changing any input recomputes the node and
//! propagates the result through everything downstream.
//!
//! ## Architecture
//!
//! - **Pipeline**: the graph arena, ports, casting rules and update propagation
//! - **Nodes**: built-in math, utility and image nodes behind one async trait
//! - **Scripting**: Rhai expressions for the Expression node
//! - **Events**: crossbeam channel notifications for renderers and inspectors
//!
//! ## Configuration
//!
//! Engine settings (logging, event channel size, script limits) are read from
//! `config.toml` under the platform config directory in `dev.pipeflow`, or from
//! the path in `$PIPEFLOW_CONFIG`.
//!
//! ## Example
//!
//! ```no_run
//! use pipeflow::pipeline::{nodes::AddNode, Graph, PortId, Value};
//!
//! # async fn demo() -> pipeflow::pipeline::PipelineResult<()> {
//! let mut graph = Graph::new();
//! let add = graph.add_node(AddNode::new()).await?;
//!
//! graph.set_value(PortId::inlet(add, 0), 3.0, false, None).await?;
//! graph.set_value(PortId::inlet(add, 1), 4.0, true, None).await?;
//! assert_eq!(graph.value(PortId::outlet(add, 0)), Some(&Value::Number(7.0)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scripting;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{PipeflowError, Result, ResultExt};
pub use pipeline::{Graph, NodeFactory, NodeKind, PortId, SharedGraph, Value};
pub use scripting::ScriptEngine;
