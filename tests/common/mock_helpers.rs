//! Hand-written node operations for driving the graph in tests

use async_trait::async_trait;
use pipeflow::pipeline::{
    ApplyError, NodeContext, NodeDefinition, NodeOperation, PortSpec, TypeKind,
};
use std::sync::{Arc, Mutex};

/// Shared log of node labels in the order their `apply` ran
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Sums its Number inlets into every outlet and records each run
pub struct RecordingNode {
    label: String,
    inlets: usize,
    outlets: usize,
    log: RunLog,
}

impl RecordingNode {
    pub fn new(label: &str, inlets: usize, outlets: usize, log: &RunLog) -> Self {
        Self {
            label: label.to_string(),
            inlets,
            outlets,
            log: log.clone(),
        }
    }
}

#[async_trait]
impl NodeOperation for RecordingNode {
    fn definition(&self) -> NodeDefinition {
        let mut def = NodeDefinition::new(self.label.clone());
        for i in 0..self.inlets {
            def.add_inlet(PortSpec::new(TypeKind::Number, format!("In {}", i)));
        }
        for i in 0..self.outlets {
            def.add_outlet(PortSpec::new(TypeKind::Number, format!("Out {}", i)));
        }
        def
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        self.log.lock().unwrap().push(self.label.clone());
        let mut sum = 0.0;
        for i in 0..ctx.inlet_count() {
            sum += ctx.input_number(i)?;
        }
        for i in 0..ctx.outlet_count() {
            ctx.set_output(i, sum)?;
        }
        Ok(())
    }
}

/// Fails whenever its input is negative, otherwise passes it through
pub struct GuardNode;

#[async_trait]
impl NodeOperation for GuardNode {
    fn definition(&self) -> NodeDefinition {
        let mut def = NodeDefinition::new("Guard");
        def.add_inlet(PortSpec::new(TypeKind::Number, "In"));
        def.add_outlet(PortSpec::new(TypeKind::Number, "Out"));
        def
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let v = ctx.input_number(0)?;
        if v < 0.0 {
            return Err(ApplyError::InvalidInput {
                name: "In".to_string(),
                message: format!("{} is negative", v),
            });
        }
        ctx.set_output(0, v)
    }
}

/// One Any inlet and one Any outlet; forwards the value and its type
pub struct AnyRelay;

#[async_trait]
impl NodeOperation for AnyRelay {
    fn definition(&self) -> NodeDefinition {
        let mut def = NodeDefinition::new("Any Relay");
        def.add_inlet(PortSpec::new(TypeKind::Any, "In"));
        def.add_outlet(PortSpec::new(TypeKind::Any, "Out"));
        def
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let value = ctx.input(0)?.clone();
        let origin = ctx.input_type(0)?;
        ctx.set_output_with_origin(0, value, origin)
    }
}
