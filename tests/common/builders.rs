//! Graph builders for common topologies

use super::mock_helpers::{RecordingNode, RunLog};
use pipeflow::pipeline::{Graph, NodeId, PortId};

/// Build a linear chain of `len` single-in single-out recording nodes,
/// labelled "N0", "N1", ...
pub async fn chain(graph: &mut Graph, len: usize, log: &RunLog) -> Vec<NodeId> {
    let mut nodes = Vec::with_capacity(len);
    for i in 0..len {
        let node = graph
            .add_node(RecordingNode::new(&format!("N{}", i), 1, 1, log))
            .await
            .unwrap();
        if let Some(prev) = nodes.last() {
            graph
                .connect(PortId::outlet(*prev, 0), PortId::inlet(node, 0))
                .await
                .unwrap();
        }
        nodes.push(node);
    }
    nodes
}

/// Builder for a root recording node fanning out to `width` leaves
pub struct FanOutBuilder {
    width: usize,
}

impl FanOutBuilder {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Returns the root followed by the leaves
    pub async fn build(self, graph: &mut Graph, log: &RunLog) -> (NodeId, Vec<NodeId>) {
        let root = graph
            .add_node(RecordingNode::new("Root", 1, self.width, log))
            .await
            .unwrap();
        let mut leaves = Vec::with_capacity(self.width);
        for i in 0..self.width {
            let leaf = graph
                .add_node(RecordingNode::new(&format!("Leaf{}", i), 1, 1, log))
                .await
                .unwrap();
            graph
                .connect(PortId::outlet(root, i as u16), PortId::inlet(leaf, 0))
                .await
                .unwrap();
            leaves.push(leaf);
        }
        (root, leaves)
    }
}
