//! Cut a rectangle out of an image.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use crate::pipeline::value::Value;
use async_trait::async_trait;
use image::imageops;

const TOP_LEFT_X: usize = 1;
const TOP_LEFT_Y: usize = 2;
const BOTTOM_RIGHT_X: usize = 3;
const BOTTOM_RIGHT_Y: usize = 4;

/// Crops to `[top-left, bottom-right)`.
///
/// A bottom-right corner of (0, 0) means "the whole image"; the node writes
/// the image size back into those inlets the first time it sees an image.
#[derive(Debug, Default)]
pub struct CropNode;

impl CropNode {
    pub fn new() -> Self {
        Self
    }
}

fn corner(ctx: &NodeContext<'_>, index: usize, name: &str) -> Result<u32, ApplyError> {
    let v = ctx.input_number(index)?;
    if v < 0.0 || !v.is_finite() {
        return Err(ApplyError::InvalidInput {
            name: name.to_string(),
            message: format!("{} is not a pixel position", v),
        });
    }
    Ok(v.round() as u32)
}

#[async_trait]
impl NodeOperation for CropNode {
    fn definition(&self) -> NodeDefinition {
        let number = |name: &str, description: &str| {
            PortSpec::new(TypeKind::Number, name).with_description(description)
        };
        NodeDefinition {
            name: "Crop".to_string(),
            description: "Crop an image to a rectangle".to_string(),
            path: NodeDefinition::parse_path("Image"),
            preview: Some(PreviewSource::Outlet(0)),
            inlets: vec![
                PortSpec::new(TypeKind::Image, "Image").with_description("The initial image"),
                number(
                    "Top-Left X",
                    "The X (horizontal) position of the crop rectangle's top-left corner",
                ),
                number(
                    "Top-Left Y",
                    "The Y (vertical) position of the crop rectangle's top-left corner",
                ),
                number(
                    "Bottom-Right X",
                    "The X (horizontal) position of the crop rectangle's bottom-right corner",
                ),
                number(
                    "Bottom-Right Y",
                    "The Y (vertical) position of the crop rectangle's bottom-right corner",
                ),
            ],
            outlets: vec![
                PortSpec::new(TypeKind::Image, "Output").with_description("The cropped image"),
            ],
            ..NodeDefinition::default()
        }
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let Some(img) = ctx.input_image(0)? else {
            return ctx.set_output(0, Value::Null);
        };

        if ctx.input_number(BOTTOM_RIGHT_X)? == 0.0 && ctx.input_number(BOTTOM_RIGHT_Y)? == 0.0 {
            ctx.set_input(BOTTOM_RIGHT_X, img.width() as f64)?;
            ctx.set_input(BOTTOM_RIGHT_Y, img.height() as f64)?;
        }

        let x0 = corner(ctx, TOP_LEFT_X, "Top-Left X")?;
        let y0 = corner(ctx, TOP_LEFT_Y, "Top-Left Y")?;
        let x1 = corner(ctx, BOTTOM_RIGHT_X, "Bottom-Right X")?.min(img.width());
        let y1 = corner(ctx, BOTTOM_RIGHT_Y, "Bottom-Right Y")?.min(img.height());
        if x1 <= x0 || y1 <= y0 {
            return Err(ApplyError::InvalidInput {
                name: "Crop".to_string(),
                message: format!("empty rectangle ({}, {}) - ({}, {})", x0, y0, x1, y1),
            });
        }

        let cropped = tokio::task::spawn_blocking(move || {
            imageops::crop_imm(&*img, x0, y0, x1 - x0, y1 - y0).to_image()
        })
        .await?;
        ctx.set_output(0, cropped)
    }
}
