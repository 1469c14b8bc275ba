//! The dataflow graph: node arena, link management and update propagation.
//!
//! Nodes live in a `Vec<NodeSlot>` indexed by `NodeId`; removed nodes are
//! tombstoned so ids stay stable. Links are stored on both ports. Every
//! mutation that changes values runs one propagation pass:
//!
//! 1. Order every node reachable downstream of the root so each runs once,
//!    after all of its in-pass feeders.
//! 2. Run `apply` on each node that received a value this pass.
//! 3. On success, push every outlet's value into its linked inlet.
//! 4. On failure, log and stop that branch. Nothing escapes to the caller.

use crate::pipeline::data_type::{DataType, TypeKind};
use crate::pipeline::error::{ConnectError, PipelineError, PipelineResult};
use crate::pipeline::events::{
    EventSink, GraphEvent, LinkSnapshot, NodeSnapshot, PortSnapshot, TopologySnapshot,
};
use crate::pipeline::id::{NodeId, PortId};
use crate::pipeline::node::{
    NodeContext, NodeDefinition, NodeOperation, NodeState, UpdateOutcome,
};
use crate::pipeline::port::{Port, PortDirection};
use crate::pipeline::value::Value;
use crossbeam_channel::Receiver;
use std::collections::HashSet;

/// A slot holding a node's operation and its live ports.
pub struct NodeSlot {
    operation: Box<dyn NodeOperation>,
    definition: NodeDefinition,
    inlets: Vec<Port>,
    outlets: Vec<Port>,
    state: NodeState,
    last_outcome: Option<UpdateOutcome>,
    /// Whether this node has been removed (slot is empty).
    deleted: bool,
}

impl NodeSlot {
    fn ports(&self, direction: PortDirection) -> &[Port] {
        match direction {
            PortDirection::Input => &self.inlets,
            PortDirection::Output => &self.outlets,
        }
    }

    fn ports_mut(&mut self, direction: PortDirection) -> &mut [Port] {
        match direction {
            PortDirection::Input => &mut self.inlets,
            PortDirection::Output => &mut self.outlets,
        }
    }
}

/// Counters across the graph's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Propagation passes started.
    pub passes: u64,
    /// `apply` invocations.
    pub updates: u64,
    /// `apply` invocations that failed.
    pub failures: u64,
}

/// The dataflow graph.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<NodeSlot>,
    events: EventSink,
    stats: GraphStats,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: EventSink) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Replace the event sink with a fresh channel and return its receiver.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<GraphEvent> {
        let (sink, rx) = EventSink::channel(capacity);
        self.events = sink;
        rx
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    // ==================== Nodes ====================

    /// Add a node, build its ports and run an initial update.
    pub async fn add_node(
        &mut self,
        operation: impl NodeOperation + 'static,
    ) -> PipelineResult<NodeId> {
        self.add_boxed_node(Box::new(operation)).await
    }

    pub async fn add_boxed_node(
        &mut self,
        operation: Box<dyn NodeOperation>,
    ) -> PipelineResult<NodeId> {
        let definition = operation.definition();
        definition.validate()?;

        // Slots are never reused, so this bounds additions over the graph's lifetime.
        let id = NodeId::from_index(self.nodes.len())
            .ok_or(PipelineError::CapacityExceeded(PortId::MAX_NODES))?;
        let inlets = definition
            .inlets
            .iter()
            .enumerate()
            .map(|(i, spec)| Port::from_spec(PortId::inlet(id, i as u16), spec))
            .collect::<Result<Vec<_>, _>>()?;
        let outlets = definition
            .outlets
            .iter()
            .enumerate()
            .map(|(i, spec)| Port::from_spec(PortId::outlet(id, i as u16), spec))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Added node {} ({})", id, definition.name);
        self.events.emit(GraphEvent::NodeAdded {
            node: id,
            name: definition.name.clone(),
        });
        self.nodes.push(NodeSlot {
            operation,
            definition,
            inlets,
            outlets,
            state: NodeState::Idle,
            last_outcome: None,
            deleted: false,
        });

        self.update(id, true).await;
        Ok(id)
    }

    /// Remove a node. Upstream outlets simply lose their link; downstream
    /// inlets are reset to their default and their nodes updated.
    pub async fn remove_node(&mut self, id: NodeId) -> PipelineResult<()> {
        let slot = self.live_slot_mut(id).ok_or(PipelineError::UnknownNode(id))?;
        slot.operation.on_before_remove();

        let upstream: Vec<(PortId, PortId)> = slot
            .inlets
            .iter()
            .filter_map(|p| p.link.map(|peer| (peer, p.id)))
            .collect();
        let downstream: Vec<(PortId, PortId)> = slot
            .outlets
            .iter()
            .filter_map(|p| p.link.map(|peer| (p.id, peer)))
            .collect();

        for (outlet, inlet) in upstream {
            self.unlink(outlet, inlet);
        }
        for (outlet, inlet) in downstream {
            self.unlink(outlet, inlet);
            if let Some(port) = self.port_mut(inlet) {
                port.data_type.reset();
            }
            self.update(inlet.node(), true).await;
        }

        if let Some(slot) = self.live_slot_mut(id) {
            slot.deleted = true;
            slot.inlets.clear();
            slot.outlets.clear();
        }
        tracing::info!("Removed node {}", id);
        self.events.emit(GraphEvent::NodeRemoved { node: id });
        Ok(())
    }

    fn live_slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.index()).filter(|slot| !slot.deleted)
    }

    fn live_slot_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(id.index()).filter(|slot| !slot.deleted)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.live_slot(id).is_some()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| !slot.deleted).count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn definition(&self, id: NodeId) -> Option<&NodeDefinition> {
        self.live_slot(id).map(|slot| &slot.definition)
    }

    pub fn node_state(&self, id: NodeId) -> Option<NodeState> {
        self.live_slot(id).map(|slot| slot.state)
    }

    /// Outcome of the node's most recent `apply`, if it ran at all.
    pub fn last_outcome(&self, id: NodeId) -> Option<&UpdateOutcome> {
        self.live_slot(id).and_then(|slot| slot.last_outcome.as_ref())
    }

    // ==================== Ports ====================

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.live_slot(id.node())?
            .ports(id.direction())
            .get(id.index() as usize)
    }

    fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.live_slot_mut(id.node())?
            .ports_mut(id.direction())
            .get_mut(id.index() as usize)
    }

    /// Look a port up by its declared name.
    pub fn find_port(&self, node: NodeId, direction: PortDirection, name: &str) -> Option<PortId> {
        self.live_slot(node)?
            .ports(direction)
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
    }

    pub fn value(&self, id: PortId) -> Option<&Value> {
        self.port(id).map(Port::value)
    }

    pub fn data_type(&self, id: PortId) -> Option<&DataType> {
        self.port(id).map(|p| &p.data_type)
    }

    pub fn linked_port(&self, id: PortId) -> Option<PortId> {
        self.port(id).and_then(Port::linked_port)
    }

    pub fn has_link(&self, id: PortId) -> bool {
        self.linked_port(id).is_some()
    }

    /// The type a value arriving at `id` came from: the linked outlet's type
    /// for a driven inlet, `Unknown` otherwise.
    fn origin_of(&self, id: PortId) -> TypeKind {
        if id.direction() != PortDirection::Input {
            return TypeKind::Unknown;
        }
        self.linked_port(id)
            .and_then(|peer| self.data_type(peer))
            .map(DataType::resolved_kind)
            .unwrap_or(TypeKind::Unknown)
    }

    /// Cast and store `value` on a port, then optionally update its node.
    ///
    /// `origin` overrides the value's recorded source type. A failed cast
    /// leaves the previous value in place.
    pub async fn set_value(
        &mut self,
        id: PortId,
        value: impl Into<Value>,
        propagate: bool,
        origin: Option<TypeKind>,
    ) -> PipelineResult<()> {
        let origin = origin.unwrap_or_else(|| self.origin_of(id));
        let port = self.port_mut(id).ok_or(PipelineError::UnknownPort(id))?;
        port.data_type.set_value(value.into(), origin)?;
        tracing::trace!("Set {} = {}", id, port.value());

        if propagate {
            self.update(id.node(), false).await;
        }
        Ok(())
    }

    // ==================== Links ====================

    /// Link an outlet to an inlet (in either argument order) and push the
    /// outlet's current value downstream.
    pub async fn connect(&mut self, a: PortId, b: PortId) -> Result<(), ConnectError> {
        let (outlet, inlet) = self.check_connect(a, b)?;

        if let Some(port) = self.port_mut(outlet) {
            port.set_linked_port(Some(inlet));
        }
        if let Some(port) = self.port_mut(inlet) {
            port.set_linked_port(Some(outlet));
        }
        tracing::info!("Linked {} -> {}", outlet, inlet);
        self.events.emit(GraphEvent::Linked { outlet, inlet });

        if self.deliver(outlet, inlet) {
            self.update(inlet.node(), true).await;
        }
        Ok(())
    }

    /// Run every connect check in order and classify the two ports.
    fn check_connect(&self, a: PortId, b: PortId) -> Result<(PortId, PortId), ConnectError> {
        let port_a = self.port(a).ok_or(ConnectError::UnknownPort(a))?;
        let port_b = self.port(b).ok_or(ConnectError::UnknownPort(b))?;

        if port_a.has_link() {
            return Err(ConnectError::AlreadyLinked(a));
        }
        if port_b.has_link() {
            return Err(ConnectError::AlreadyLinked(b));
        }
        if a.node() == b.node() {
            return Err(ConnectError::SameOwner(a.node()));
        }

        let (outlet, inlet) = match (a.direction(), b.direction()) {
            (PortDirection::Output, PortDirection::Input) => (port_a, port_b),
            (PortDirection::Input, PortDirection::Output) => (port_b, port_a),
            _ => return Err(ConnectError::SideMismatch),
        };

        if self.would_create_cycle(outlet.owner(), inlet.owner()) {
            return Err(ConnectError::CyclicDependency {
                outlet: outlet.id,
                inlet: inlet.id,
            });
        }

        let forward = inlet.data_type.cast(outlet.value());
        let backward = outlet.data_type.cast(inlet.value());
        if forward.is_err() || backward.is_err() {
            return Err(ConnectError::TypeMismatch {
                outlet_type: outlet.data_type.resolved_kind(),
                inlet_type: inlet.data_type.resolved_kind(),
            });
        }

        Ok((outlet.id, inlet.id))
    }

    /// Would linking an outlet of `outlet_owner` into `inlet_owner` close a cycle?
    ///
    /// Walks backward from `outlet_owner` through linked inlets; reaching
    /// `inlet_owner` means it already feeds `outlet_owner`.
    fn would_create_cycle(&self, outlet_owner: NodeId, inlet_owner: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![outlet_owner];

        while let Some(current) = stack.pop() {
            if current == inlet_owner {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for inlet in &self.nodes[idx].inlets {
                if let Some(peer) = inlet.link {
                    stack.push(peer.node());
                }
            }
        }
        false
    }

    /// Break the link on `id`. The inlet end is reset to its default and its
    /// node updated. Unlinked ports are left alone.
    pub async fn disconnect(&mut self, id: PortId) -> PipelineResult<()> {
        let port = self.port(id).ok_or(PipelineError::UnknownPort(id))?;
        let Some(peer) = port.link else {
            return Ok(());
        };
        let (outlet, inlet) = match id.direction() {
            PortDirection::Output => (id, peer),
            PortDirection::Input => (peer, id),
        };

        self.unlink(outlet, inlet);
        if let Some(port) = self.port_mut(inlet) {
            port.data_type.reset();
        }
        self.update(inlet.node(), true).await;
        Ok(())
    }

    fn unlink(&mut self, outlet: PortId, inlet: PortId) {
        if let Some(port) = self.port_mut(outlet) {
            port.set_linked_port(None);
        }
        if let Some(port) = self.port_mut(inlet) {
            port.set_linked_port(None);
        }
        tracing::info!("Unlinked {} -> {}", outlet, inlet);
        self.events.emit(GraphEvent::Unlinked { outlet, inlet });
    }

    /// Copy an outlet's value into its linked inlet. A cast failure is
    /// logged and reported as `false`; the inlet keeps its old value.
    fn deliver(&mut self, outlet: PortId, inlet: PortId) -> bool {
        let Some(source) = self.port(outlet) else {
            return false;
        };
        let value = source.value().clone();
        let origin = source.data_type.resolved_kind();

        let Some(target) = self.port_mut(inlet) else {
            return false;
        };
        match target.data_type.set_value(value, origin) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropped value on {} -> {}: {}", outlet, inlet, e);
                false
            }
        }
    }

    // ==================== Propagation ====================

    /// Re-run `node` and everything downstream of it.
    ///
    /// Failures are swallowed here; see `last_outcome` and `GraphEvent::NodeFailed`.
    pub async fn update(&mut self, node: NodeId, push_to_inputs: bool) {
        if !self.contains_node(node) {
            tracing::warn!("Update requested for unknown node {}", node);
            return;
        }
        self.stats.passes += 1;

        let order = self.downstream_order(node);
        let mut delivered: HashSet<NodeId> = HashSet::with_capacity(order.len());
        delivered.insert(node);
        let mut ran = 0usize;

        for current in order {
            if !delivered.contains(&current) {
                continue;
            }
            // Nodes reached through a link always re-present their inputs.
            let push = push_to_inputs || current != node;
            ran += 1;
            if !self.apply_node(current, push).await {
                continue;
            }

            let links: Vec<(PortId, PortId)> = self
                .live_slot(current)
                .map(|slot| {
                    slot.outlets
                        .iter()
                        .filter_map(|p| p.link.map(|peer| (p.id, peer)))
                        .collect()
                })
                .unwrap_or_default();
            for (outlet, inlet) in links {
                if self.deliver(outlet, inlet) {
                    delivered.insert(inlet.node());
                }
            }
        }
        tracing::debug!("Propagation from {} ran {} node(s)", node, ran);
    }

    /// Every node reachable downstream of `root` (root included), ordered so
    /// each node follows all of its feeders within the set. On a tree this is
    /// depth-first in outlet declaration order.
    fn downstream_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut postorder = Vec::new();
        visited[root.index()] = true;
        let mut stack = vec![(root, self.downstream_of(root))];

        while let Some((current, children)) = stack.last_mut() {
            // `children` is in declaration order; popping visits it in reverse,
            // which the final reversal turns back into declaration order.
            match children.pop() {
                Some(child) => {
                    if !visited[child.index()] {
                        visited[child.index()] = true;
                        let grandchildren = self.downstream_of(child);
                        stack.push((child, grandchildren));
                    }
                }
                None => {
                    postorder.push(*current);
                    stack.pop();
                }
            }
        }

        postorder.reverse();
        postorder
    }

    fn downstream_of(&self, node: NodeId) -> Vec<NodeId> {
        self.live_slot(node)
            .map(|slot| {
                slot.outlets
                    .iter()
                    .filter_map(|p| p.link.map(PortId::node))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run one node's `apply`. Returns whether it succeeded.
    async fn apply_node(&mut self, id: NodeId, push_to_inputs: bool) -> bool {
        let Some(slot) = self.nodes.get_mut(id.index()).filter(|s| !s.deleted) else {
            return false;
        };

        slot.state = NodeState::Applying;
        let result = {
            let NodeSlot {
                operation,
                inlets,
                outlets,
                ..
            } = &mut *slot;
            let mut ctx = NodeContext::new(inlets, outlets);
            operation.apply(&mut ctx).await
        };
        slot.state = NodeState::Idle;
        self.stats.updates += 1;

        match result {
            Ok(()) => {
                slot.last_outcome = Some(UpdateOutcome::Succeeded);
                self.events.emit(GraphEvent::NodeUpdated { node: id });
                if push_to_inputs {
                    for inlet in &slot.inlets {
                        self.events.emit(GraphEvent::PortRefreshed {
                            port: inlet.id,
                            value: inlet.value().clone(),
                            read_only: inlet.has_link(),
                        });
                    }
                }
                for outlet in &slot.outlets {
                    self.events.emit(GraphEvent::PortRefreshed {
                        port: outlet.id,
                        value: outlet.value().clone(),
                        read_only: true,
                    });
                }
                true
            }
            Err(error) => {
                tracing::warn!(
                    "Node {} ({}) failed to update: {}",
                    id,
                    slot.definition.name,
                    error
                );
                self.stats.failures += 1;
                slot.last_outcome = Some(UpdateOutcome::Failed(error.clone()));
                self.events.emit(GraphEvent::NodeFailed { node: id, error });
                false
            }
        }
    }

    // ==================== Inspection ====================

    /// Snapshot of every live node, port and link.
    pub fn topology(&self) -> TopologySnapshot {
        let mut snapshot = TopologySnapshot::default();
        for (i, slot) in self.nodes.iter().enumerate() {
            if slot.deleted {
                continue;
            }
            let port_snapshot = |p: &Port| PortSnapshot {
                id: p.id,
                name: p.name.clone(),
                description: p.description.clone(),
                type_name: p.data_type.name(),
                colour: p.data_type.display_colour(),
                wire_colour: p.data_type.wire_colour(),
                value: p.value().clone(),
                link: p.link,
            };
            snapshot.nodes.push(NodeSnapshot {
                id: NodeId(i as u32),
                name: slot.definition.name.clone(),
                path: slot.definition.path.clone(),
                preview: slot.definition.preview,
                inlets: slot.inlets.iter().map(port_snapshot).collect(),
                outlets: slot.outlets.iter().map(port_snapshot).collect(),
            });
            for outlet in &slot.outlets {
                if let Some(inlet) = outlet.link {
                    snapshot.links.push(LinkSnapshot {
                        outlet: outlet.id,
                        inlet,
                    });
                }
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::ApplyError;
    use crate::pipeline::port::PortSpec;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Copies inlet 0 to every outlet, recording the order it ran in.
    struct Relay {
        label: &'static str,
        outlets: usize,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl NodeOperation for Relay {
        fn definition(&self) -> NodeDefinition {
            let mut def = NodeDefinition::new(self.label);
            def.add_inlet(PortSpec::new(TypeKind::Number, "In"));
            for i in 0..self.outlets {
                def.add_outlet(PortSpec::new(TypeKind::Number, format!("Out{}", i)));
            }
            def
        }

        async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
            self.log.lock().unwrap().push(self.label);
            let v = ctx.input_number(0)?;
            for i in 0..ctx.outlet_count() {
                ctx.set_output(i, v)?;
            }
            Ok(())
        }
    }

    /// Fails whenever its input is negative.
    struct RejectNegative {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NodeOperation for RejectNegative {
        fn definition(&self) -> NodeDefinition {
            let mut def = NodeDefinition::new("RejectNegative");
            def.add_inlet(PortSpec::new(TypeKind::Number, "In"));
            def.add_outlet(PortSpec::new(TypeKind::Number, "Out"));
            def
        }

        async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let v = ctx.input_number(0)?;
            if v < 0.0 {
                return Err(ApplyError::InvalidInput {
                    name: "In".to_string(),
                    message: "negative".to_string(),
                });
            }
            ctx.set_output(0, v)
        }
    }

    async fn relay(
        graph: &mut Graph,
        label: &'static str,
        outlets: usize,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> NodeId {
        graph
            .add_node(Relay {
                label,
                outlets,
                log: log.clone(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_is_symmetric() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let a = relay(&mut graph, "A", 1, &log).await;
        let b = relay(&mut graph, "B", 1, &log).await;

        // Argument order does not matter.
        graph
            .connect(PortId::inlet(b, 0), PortId::outlet(a, 0))
            .await
            .unwrap();
        assert_eq!(graph.linked_port(PortId::outlet(a, 0)), Some(PortId::inlet(b, 0)));
        assert_eq!(graph.linked_port(PortId::inlet(b, 0)), Some(PortId::outlet(a, 0)));

        graph.disconnect(PortId::outlet(a, 0)).await.unwrap();
        assert!(!graph.has_link(PortId::outlet(a, 0)));
        assert!(!graph.has_link(PortId::inlet(b, 0)));
    }

    #[tokio::test]
    async fn test_connect_rejections_leave_state_untouched() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let a = relay(&mut graph, "A", 1, &log).await;
        let b = relay(&mut graph, "B", 1, &log).await;

        assert_eq!(
            graph.connect(PortId::outlet(a, 0), PortId::outlet(b, 0)).await,
            Err(ConnectError::SideMismatch)
        );
        assert_eq!(
            graph.connect(PortId::inlet(a, 0), PortId::inlet(b, 0)).await,
            Err(ConnectError::SideMismatch)
        );
        assert_eq!(
            graph.connect(PortId::outlet(a, 0), PortId::inlet(a, 0)).await,
            Err(ConnectError::SameOwner(a))
        );
        assert_eq!(
            graph.connect(PortId::outlet(a, 3), PortId::inlet(b, 0)).await,
            Err(ConnectError::UnknownPort(PortId::outlet(a, 3)))
        );
        assert!(graph.topology().links.is_empty());

        graph
            .connect(PortId::outlet(a, 0), PortId::inlet(b, 0))
            .await
            .unwrap();
        let c = relay(&mut graph, "C", 1, &log).await;
        assert_eq!(
            graph.connect(PortId::outlet(c, 0), PortId::inlet(b, 0)).await,
            Err(ConnectError::AlreadyLinked(PortId::inlet(b, 0)))
        );
    }

    #[tokio::test]
    async fn test_cycle_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let a = relay(&mut graph, "A", 1, &log).await;
        let b = relay(&mut graph, "B", 1, &log).await;
        let c = relay(&mut graph, "C", 1, &log).await;
        graph
            .connect(PortId::outlet(a, 0), PortId::inlet(b, 0))
            .await
            .unwrap();
        graph
            .connect(PortId::outlet(b, 0), PortId::inlet(c, 0))
            .await
            .unwrap();

        let result = graph.connect(PortId::outlet(c, 0), PortId::inlet(a, 0)).await;
        assert!(matches!(result, Err(ConnectError::CyclicDependency { .. })));
        assert_eq!(graph.topology().links.len(), 2);
        assert!(!graph.has_link(PortId::inlet(a, 0)));
        assert!(!graph.has_link(PortId::outlet(c, 0)));
    }

    #[tokio::test]
    async fn test_propagation_is_depth_first_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let root = relay(&mut graph, "Root", 2, &log).await;
        let left = relay(&mut graph, "Left", 1, &log).await;
        let leaf = relay(&mut graph, "Leaf", 0, &log).await;
        let right = relay(&mut graph, "Right", 0, &log).await;

        graph
            .connect(PortId::outlet(root, 1), PortId::inlet(right, 0))
            .await
            .unwrap();
        graph
            .connect(PortId::outlet(root, 0), PortId::inlet(left, 0))
            .await
            .unwrap();
        graph
            .connect(PortId::outlet(left, 0), PortId::inlet(leaf, 0))
            .await
            .unwrap();

        log.lock().unwrap().clear();
        graph
            .set_value(PortId::inlet(root, 0), 5.0, true, None)
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["Root", "Left", "Leaf", "Right"]);
        assert_eq!(graph.value(PortId::inlet(right, 0)), Some(&Value::Number(5.0)));
        assert_eq!(graph.value(PortId::inlet(leaf, 0)), Some(&Value::Number(5.0)));
    }

    #[tokio::test]
    async fn test_failure_stops_only_its_branch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let root = relay(&mut graph, "Root", 2, &log).await;
        let guard = graph
            .add_node(RejectNegative {
                calls: calls.clone(),
            })
            .await
            .unwrap();
        let after_guard = relay(&mut graph, "AfterGuard", 0, &log).await;
        let sibling = relay(&mut graph, "Sibling", 0, &log).await;

        graph
            .connect(PortId::outlet(root, 0), PortId::inlet(guard, 0))
            .await
            .unwrap();
        graph
            .connect(PortId::outlet(guard, 0), PortId::inlet(after_guard, 0))
            .await
            .unwrap();
        graph
            .connect(PortId::outlet(root, 1), PortId::inlet(sibling, 0))
            .await
            .unwrap();
        graph
            .set_value(PortId::inlet(root, 0), 2.0, true, None)
            .await
            .unwrap();

        log.lock().unwrap().clear();
        let failures = graph.stats().failures;
        graph
            .set_value(PortId::inlet(root, 0), -1.0, true, None)
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["Root", "Sibling"]);
        assert_eq!(graph.stats().failures, failures + 1);
        // Last-good value is retained past the failed node.
        assert_eq!(graph.value(PortId::outlet(guard, 0)), Some(&Value::Number(2.0)));
        assert_eq!(graph.value(PortId::inlet(after_guard, 0)), Some(&Value::Number(2.0)));
        assert_eq!(graph.value(PortId::inlet(sibling, 0)), Some(&Value::Number(-1.0)));
        assert!(matches!(
            graph.last_outcome(guard),
            Some(UpdateOutcome::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_diamond_runs_join_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let root = relay(&mut graph, "Root", 2, &log).await;
        let a = relay(&mut graph, "A", 1, &log).await;
        let b = relay(&mut graph, "B", 1, &log).await;
        let join = graph
            .add_node(JoinTwo { log: log.clone() })
            .await
            .unwrap();

        graph.connect(PortId::outlet(root, 0), PortId::inlet(a, 0)).await.unwrap();
        graph.connect(PortId::outlet(root, 1), PortId::inlet(b, 0)).await.unwrap();
        graph.connect(PortId::outlet(a, 0), PortId::inlet(join, 0)).await.unwrap();
        graph.connect(PortId::outlet(b, 0), PortId::inlet(join, 1)).await.unwrap();

        log.lock().unwrap().clear();
        let before = graph.stats().updates;
        graph
            .set_value(PortId::inlet(root, 0), 3.0, true, None)
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["Root", "A", "B", "Join"]);
        assert_eq!(graph.stats().updates - before, 4);
        assert_eq!(graph.value(PortId::outlet(join, 0)), Some(&Value::Number(6.0)));
    }

    struct JoinTwo {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl NodeOperation for JoinTwo {
        fn definition(&self) -> NodeDefinition {
            let mut def = NodeDefinition::new("Join");
            def.add_inlet(PortSpec::new(TypeKind::Number, "X"));
            def.add_inlet(PortSpec::new(TypeKind::Number, "Y"));
            def.add_outlet(PortSpec::new(TypeKind::Number, "Sum"));
            def
        }

        async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
            self.log.lock().unwrap().push("Join");
            let sum = ctx.input_number(0)? + ctx.input_number(1)?;
            ctx.set_output(0, sum)
        }
    }

    #[tokio::test]
    async fn test_set_value_cast_failure_keeps_old_value() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let a = relay(&mut graph, "A", 1, &log).await;
        graph
            .set_value(PortId::inlet(a, 0), 8.0, true, None)
            .await
            .unwrap();

        let result = graph
            .set_value(PortId::inlet(a, 0), "eight", true, None)
            .await;
        assert!(matches!(result, Err(PipelineError::Cast(_))));
        assert_eq!(graph.value(PortId::inlet(a, 0)), Some(&Value::Number(8.0)));
        assert_eq!(graph.value(PortId::outlet(a, 0)), Some(&Value::Number(8.0)));
    }

    #[tokio::test]
    async fn test_remove_node_resets_downstream() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let up = relay(&mut graph, "Up", 1, &log).await;
        let mid = relay(&mut graph, "Mid", 1, &log).await;
        let down = relay(&mut graph, "Down", 1, &log).await;
        graph.connect(PortId::outlet(up, 0), PortId::inlet(mid, 0)).await.unwrap();
        graph.connect(PortId::outlet(mid, 0), PortId::inlet(down, 0)).await.unwrap();
        graph
            .set_value(PortId::inlet(up, 0), 4.0, true, None)
            .await
            .unwrap();
        assert_eq!(graph.value(PortId::outlet(down, 0)), Some(&Value::Number(4.0)));

        graph.remove_node(mid).await.unwrap();
        assert!(!graph.contains_node(mid));
        assert_eq!(graph.node_count(), 2);
        assert!(!graph.has_link(PortId::outlet(up, 0)));
        assert_eq!(graph.value(PortId::inlet(down, 0)), Some(&Value::Number(0.0)));
        assert_eq!(graph.value(PortId::outlet(down, 0)), Some(&Value::Number(0.0)));
        assert!(graph.port(PortId::inlet(mid, 0)).is_none());
        assert!(matches!(
            graph.remove_node(mid).await,
            Err(PipelineError::UnknownNode(_))
        ));
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let rx = graph.subscribe(64);
        let a = relay(&mut graph, "A", 1, &log).await;
        let b = relay(&mut graph, "B", 0, &log).await;
        graph.connect(PortId::outlet(a, 0), PortId::inlet(b, 0)).await.unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, GraphEvent::NodeAdded { node, .. } if *node == a)));
        assert!(events.iter().any(|e| matches!(e, GraphEvent::Linked { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            GraphEvent::PortRefreshed { port, read_only: true, .. } if *port == PortId::inlet(b, 0)
        )));
    }

    #[tokio::test]
    async fn test_find_port_and_topology() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let a = relay(&mut graph, "A", 2, &log).await;
        assert_eq!(
            graph.find_port(a, PortDirection::Output, "Out1"),
            Some(PortId::outlet(a, 1))
        );
        assert_eq!(graph.find_port(a, PortDirection::Input, "Nope"), None);

        let topo = graph.topology();
        let node = topo.node(a).unwrap();
        assert_eq!(node.name, "A");
        assert_eq!(node.outlets.len(), 2);
        assert_eq!(node.inlets[0].type_name, "Number");
    }

    #[tokio::test]
    async fn test_set_value_origin_rules() {
        use crate::pipeline::nodes::{AddNode, SplitNode};

        let mut graph = Graph::new();
        let add = graph.add_node(AddNode::new()).await.unwrap();
        let split = graph.add_node(SplitNode::new()).await.unwrap();
        let input = PortId::inlet(split, 0);

        // Unlinked, no origin given: the carried type is unknown.
        graph.set_value(input, 2.0, false, None).await.unwrap();
        assert_eq!(graph.data_type(input).unwrap().resolved_kind(), TypeKind::Unknown);

        // An explicit origin is recorded as given, and flows through the node.
        graph
            .set_value(input, 3.0, true, Some(TypeKind::Number))
            .await
            .unwrap();
        assert_eq!(graph.data_type(input).unwrap().name(), "Number");
        assert_eq!(
            graph.data_type(PortId::outlet(split, 0)).unwrap().resolved_kind(),
            TypeKind::Number
        );

        // Linked, no origin given: the linked outlet's type is used.
        graph
            .connect(PortId::outlet(add, 0), input)
            .await
            .unwrap();
        graph.set_value(input, 5.0, false, None).await.unwrap();
        let data_type = graph.data_type(input).unwrap();
        assert_eq!(data_type.resolved_kind(), TypeKind::Number);
        assert_eq!(data_type.name(), "Number");
        assert_eq!(graph.value(input), Some(&Value::Number(5.0)));

        // An explicit origin wins over the link.
        graph
            .set_value(input, 6.0, false, Some(TypeKind::Image))
            .await
            .unwrap();
        assert_eq!(graph.data_type(input).unwrap().resolved_kind(), TypeKind::Image);
    }

    struct Noop;

    #[async_trait]
    impl NodeOperation for Noop {
        fn definition(&self) -> NodeDefinition {
            let mut def = NodeDefinition::new("Noop");
            def.add_inlet(PortSpec::new(TypeKind::Number, "In"));
            def
        }

        async fn apply(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
            Ok(())
        }
    }

    fn removed_slot() -> NodeSlot {
        NodeSlot {
            operation: Box::new(Noop),
            definition: NodeDefinition {
                name: String::new(),
                description: String::new(),
                help: String::new(),
                path: Vec::new(),
                addable: false,
                preview: None,
                inlets: Vec::new(),
                outlets: Vec::new(),
            },
            inlets: Vec::new(),
            outlets: Vec::new(),
            state: NodeState::Idle,
            last_outcome: None,
            deleted: true,
        }
    }

    #[tokio::test]
    async fn test_node_ids_never_alias_past_capacity() {
        let mut graph = Graph::new();
        let first = graph.add_node(Noop).await.unwrap();
        graph.nodes.reserve(PortId::MAX_NODES);
        while graph.nodes.len() < PortId::MAX_NODES - 1 {
            graph.nodes.push(removed_slot());
        }

        // The last addressable slot still resolves to itself.
        let last = graph.add_node(Noop).await.unwrap();
        assert_eq!(last.index(), PortId::MAX_NODES - 1);
        assert_eq!(PortId::inlet(last, 0).node(), last);

        // One more would wrap onto `first`.
        let result = graph.add_node(Noop).await;
        assert!(matches!(
            result,
            Err(PipelineError::CapacityExceeded(n)) if n == PortId::MAX_NODES
        ));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains_node(first));
        assert_eq!(graph.stats().updates, 2);
    }
}
