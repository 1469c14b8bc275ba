//! Rhai expression over two numbers.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use crate::pipeline::value::Value;
use crate::scripting::ScriptEngine;
use async_trait::async_trait;
use std::sync::Arc;

const SOURCE_INLET: usize = 2;

/// Evaluates the expression held in its "Expression" inlet with `x` and `y`
/// bound to the first two inlets.
///
/// The source lives in an inlet so it can be edited with `set_value` like any
/// other input. A compile or evaluation error fails the update.
pub struct ExpressionNode {
    engine: Arc<ScriptEngine>,
    source: String,
}

impl ExpressionNode {
    pub fn new(engine: Arc<ScriptEngine>, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
        }
    }
}

impl std::fmt::Debug for ExpressionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionNode")
            .field("source", &self.source)
            .finish()
    }
}

#[async_trait]
impl NodeOperation for ExpressionNode {
    fn definition(&self) -> NodeDefinition {
        NodeDefinition {
            name: "Expression".to_string(),
            description: "Evaluate an expression of x and y".to_string(),
            help: "Any Rhai expression over the numbers x and y, e.g. sqrt(x * x + y * y)."
                .to_string(),
            path: NodeDefinition::parse_path("Math"),
            preview: Some(PreviewSource::Outlet(0)),
            inlets: vec![
                PortSpec::new(TypeKind::Number, "x"),
                PortSpec::new(TypeKind::Number, "y"),
                PortSpec::new(TypeKind::Any, "Expression")
                    .with_description("Rhai source")
                    .with_initial(self.source.as_str()),
            ],
            outlets: vec![PortSpec::new(TypeKind::Number, "Result")],
            ..NodeDefinition::default()
        }
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let Value::Text(source) = ctx.input(SOURCE_INLET)? else {
            return Err(ApplyError::InvalidInput {
                name: "Expression".to_string(),
                message: "expected expression text".to_string(),
            });
        };
        if *source != self.source {
            let previous = std::mem::replace(&mut self.source, source.clone());
            if let Err(e) = self.engine.forget(&previous) {
                tracing::debug!("Could not evict expression '{}': {}", previous, e);
            }
        }

        let x = ctx.input_number(0)?;
        let y = ctx.input_number(1)?;
        let result = self
            .engine
            .compile(&self.source)
            .and_then(|expression| self.engine.evaluate(&expression, x, y))
            .map_err(|e| ApplyError::Script(e.to_string()))?;
        ctx.set_output(0, result)
    }
}
