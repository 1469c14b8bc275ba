//! Notifications from the graph to its collaborators (renderers, inspectors).
//!
//! The graph never blocks on a listener: events go through a bounded
//! crossbeam channel with `try_send`, and are dropped when the channel is
//! full or nobody is listening.

use crate::pipeline::data_type::Colour;
use crate::pipeline::error::ApplyError;
use crate::pipeline::id::{NodeId, PortId};
use crate::pipeline::node::PreviewSource;
use crate::pipeline::value::Value;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something observable happened to the graph.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    NodeAdded { node: NodeId, name: String },
    NodeRemoved { node: NodeId },
    Linked { outlet: PortId, inlet: PortId },
    Unlinked { outlet: PortId, inlet: PortId },
    /// A node's `apply` succeeded; its preview should be re-rendered.
    NodeUpdated { node: NodeId },
    /// A node's `apply` failed; its outputs keep their last-good values.
    NodeFailed { node: NodeId, error: ApplyError },
    /// A port's displayed value should be refreshed. `read_only` is set for
    /// outlets and for inlets driven by a link.
    PortRefreshed {
        port: PortId,
        value: Value,
        read_only: bool,
    },
}

/// Sending half, held by the graph.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<GraphEvent>>,
}

impl EventSink {
    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a connected sink and receiver pair.
    pub fn channel(capacity: usize) -> (Self, Receiver<GraphEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn emit(&self, event: GraphEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("Event receiver dropped");
            }
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Snapshot of a single port.
#[derive(Debug, Clone)]
pub struct PortSnapshot {
    pub id: PortId,
    pub name: String,
    pub description: String,
    /// User-facing type label (`Any` shows its carried type).
    pub type_name: &'static str,
    pub colour: Colour,
    pub wire_colour: Colour,
    pub value: Value,
    pub link: Option<PortId>,
}

/// Snapshot of a single node.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub path: Vec<String>,
    pub preview: Option<PreviewSource>,
    pub inlets: Vec<PortSnapshot>,
    pub outlets: Vec<PortSnapshot>,
}

/// Snapshot of a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub outlet: PortId,
    pub inlet: PortId,
}

/// Complete topology snapshot of the graph, for renderers.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

impl TopologySnapshot {
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
