//! Basic arithmetic nodes.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use async_trait::async_trait;

fn binary_definition(name: &str, description: &str, result: &str) -> NodeDefinition {
    NodeDefinition {
        name: name.to_string(),
        description: description.to_string(),
        path: NodeDefinition::parse_path("Math/Basic/"),
        preview: Some(PreviewSource::Outlet(0)),
        inlets: vec![
            PortSpec::new(TypeKind::Number, "X").with_description("The first number"),
            PortSpec::new(TypeKind::Number, "Y").with_description("The second number"),
        ],
        outlets: vec![PortSpec::new(TypeKind::Number, "Result").with_description(result)],
        ..NodeDefinition::default()
    }
}

/// `Result = X + Y`
#[derive(Debug, Default)]
pub struct AddNode;

impl AddNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeOperation for AddNode {
    fn definition(&self) -> NodeDefinition {
        binary_definition("Add", "Add two numbers together", "The result of X + Y")
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let sum = ctx.input_number(0)? + ctx.input_number(1)?;
        ctx.set_output(0, sum)
    }
}

/// `Result = X * Y`
#[derive(Debug, Default)]
pub struct MultiplyNode;

impl MultiplyNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeOperation for MultiplyNode {
    fn definition(&self) -> NodeDefinition {
        binary_definition("Multiply", "Multiply two numbers", "The result of X * Y")
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let product = ctx.input_number(0)? * ctx.input_number(1)?;
        ctx.set_output(0, product)
    }
}
