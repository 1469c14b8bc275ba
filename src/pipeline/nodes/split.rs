//! Type-transparent duplication of one value into two outlets.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use async_trait::async_trait;

/// Copies its input to both outlets, carrying the input's concrete type.
#[derive(Debug, Default)]
pub struct SplitNode;

impl SplitNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeOperation for SplitNode {
    fn definition(&self) -> NodeDefinition {
        NodeDefinition {
            name: "Split".to_string(),
            description: "Splits one input into two identical outputs".to_string(),
            path: NodeDefinition::parse_path("Utility"),
            preview: Some(PreviewSource::Inlet(0)),
            inlets: vec![
                PortSpec::new(TypeKind::Any, "Input").with_description("Something to clone"),
            ],
            outlets: vec![
                PortSpec::new(TypeKind::Any, "Clone 1").with_description("A clone of Input"),
                PortSpec::new(TypeKind::Any, "Clone 2").with_description("A clone of Input"),
            ],
            ..NodeDefinition::default()
        }
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let origin = ctx.input_type(0)?;
        let value = ctx.input(0)?.clone();
        ctx.set_output_with_origin(0, value.clone(), origin)?;
        ctx.set_output_with_origin(1, value, origin)
    }
}
