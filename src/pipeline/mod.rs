//! Dataflow graph engine.
//!
//! Typed values flow from node outlets to node inlets along links. Writing a
//! value to a port recomputes the owning node and pushes results downstream.
//!
//! # Architecture
//!
//! ```text
//! [Image] ──► [Channels] ──► [Invert] ──► [Image Info]
//!                       ├──► [Grayscale]
//!                       └──► [Threshold]
//! ```
//!
//! # Design
//!
//! - **Arena graph**: nodes live in a `Vec` inside [`Graph`]; [`NodeId`] is the
//!   slot index and [`PortId`] packs node, side and port index.
//! - **One link per port**: links are stored on both ends and kept symmetric.
//! - **Acyclic by construction**: `connect` rejects any link closing a cycle.
//! - **Async apply**: a node's recomputation may suspend (image work runs on
//!   the blocking pool); one propagation pass completes before the next starts.

pub mod data_type;
pub mod error;
pub mod events;
pub mod graph;
pub mod id;
pub mod node;
pub mod nodes;
pub mod port;
pub mod registry;
pub mod shared;
pub mod value;

pub use data_type::{Colour, DataType, TypeKind};
pub use error::{ApplyError, CastError, ConnectError, PipelineError, PipelineResult};
pub use events::{
    EventSink, GraphEvent, LinkSnapshot, NodeSnapshot, PortSnapshot, TopologySnapshot,
    DEFAULT_EVENT_CAPACITY,
};
pub use graph::{Graph, GraphStats};
pub use id::{NodeId, PortId};
pub use node::{
    NodeContext, NodeDefinition, NodeOperation, NodeState, PreviewSource, UpdateOutcome,
};
pub use port::{Port, PortDirection, PortSpec};
pub use registry::{NodeFactory, NodeKind};
pub use shared::SharedGraph;
pub use value::{ImageHandle, Value};
