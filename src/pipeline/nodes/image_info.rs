//! Image dimensions as numbers.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use async_trait::async_trait;

/// Outputs the width and height of its image, or zeros with no image.
#[derive(Debug, Default)]
pub struct ImageInfoNode;

impl ImageInfoNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeOperation for ImageInfoNode {
    fn definition(&self) -> NodeDefinition {
        NodeDefinition {
            name: "Image Info".to_string(),
            description: "Get information about an image (e.g. width and height)".to_string(),
            path: NodeDefinition::parse_path("Image"),
            preview: Some(PreviewSource::Inlet(0)),
            inlets: vec![PortSpec::new(TypeKind::Image, "Image").with_description("The image")],
            outlets: vec![
                PortSpec::new(TypeKind::Number, "Width")
                    .with_description("The width of the image (in pixels)"),
                PortSpec::new(TypeKind::Number, "Height")
                    .with_description("The height of the image (in pixels)"),
            ],
            ..NodeDefinition::default()
        }
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let (width, height) = ctx
            .input_image(0)?
            .map(|img| img.dimensions())
            .unwrap_or((0, 0));
        ctx.set_output(0, width as f64)?;
        ctx.set_output(1, height as f64)
    }
}
