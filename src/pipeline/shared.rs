//! One-pass-at-a-time access to a graph from several tasks.
//!
//! Every call takes the graph lock for its whole propagation pass, so a
//! mutation never observes another pass half-way through.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::{ConnectError, PipelineResult};
use crate::pipeline::events::TopologySnapshot;
use crate::pipeline::graph::{Graph, GraphStats};
use crate::pipeline::id::{NodeId, PortId};
use crate::pipeline::node::NodeOperation;
use crate::pipeline::value::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle to a graph shared between tasks.
#[derive(Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<Graph>>,
}

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Hold the graph for several operations in a row.
    pub async fn lock(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock().await
    }

    pub async fn add_node(
        &self,
        operation: impl NodeOperation + 'static,
    ) -> PipelineResult<NodeId> {
        self.inner.lock().await.add_node(operation).await
    }

    pub async fn remove_node(&self, id: NodeId) -> PipelineResult<()> {
        self.inner.lock().await.remove_node(id).await
    }

    pub async fn connect(&self, a: PortId, b: PortId) -> Result<(), ConnectError> {
        self.inner.lock().await.connect(a, b).await
    }

    pub async fn disconnect(&self, port: PortId) -> PipelineResult<()> {
        self.inner.lock().await.disconnect(port).await
    }

    pub async fn set_value(
        &self,
        port: PortId,
        value: impl Into<Value>,
        propagate: bool,
        origin: Option<TypeKind>,
    ) -> PipelineResult<()> {
        self.inner
            .lock()
            .await
            .set_value(port, value, propagate, origin)
            .await
    }

    /// Clone of a port's current value.
    pub async fn value(&self, port: PortId) -> Option<Value> {
        self.inner.lock().await.value(port).cloned()
    }

    pub async fn update(&self, node: NodeId, push_to_inputs: bool) {
        self.inner.lock().await.update(node, push_to_inputs).await
    }

    pub async fn topology(&self) -> TopologySnapshot {
        self.inner.lock().await.topology()
    }

    pub async fn stats(&self) -> GraphStats {
        self.inner.lock().await.stats()
    }
}
