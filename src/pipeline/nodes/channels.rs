//! Split an image into its red, green and blue channels.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::nodes::image_effects::map_rgb;
use crate::pipeline::port::PortSpec;
use crate::pipeline::value::Value;
use async_trait::async_trait;
use image::RgbaImage;

const CHANNEL_NAMES: [&str; 3] = ["Red", "Green", "Blue"];

/// Keep only `channel` (0 = red, 1 = green, 2 = blue), zeroing the others.
fn isolate_channel(img: &RgbaImage, channel: usize) -> RgbaImage {
    map_rgb(img, |rgb| {
        let mut out = [0u8; 3];
        out[channel] = rgb[channel];
        out
    })
}

#[derive(Debug, Default)]
pub struct ChannelsNode;

impl ChannelsNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeOperation for ChannelsNode {
    fn definition(&self) -> NodeDefinition {
        let mut def = NodeDefinition {
            name: "Channels".to_string(),
            description: "Split an image into its red, green and blue channels".to_string(),
            path: NodeDefinition::parse_path("Image"),
            preview: Some(PreviewSource::Inlet(0)),
            inlets: vec![
                PortSpec::new(TypeKind::Image, "Image").with_description("The initial image"),
            ],
            ..NodeDefinition::default()
        };
        for name in CHANNEL_NAMES {
            def.add_outlet(
                PortSpec::new(TypeKind::Image, name)
                    .with_description(format!("The {} channel", name.to_lowercase())),
            );
        }
        def
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let Some(img) = ctx.input_image(0)? else {
            for i in 0..CHANNEL_NAMES.len() {
                ctx.set_output(i, Value::Null)?;
            }
            return Ok(());
        };

        let channels = tokio::task::spawn_blocking(move || {
            [0, 1, 2].map(|channel| isolate_channel(&img, channel))
        })
        .await?;
        for (i, channel) in channels.into_iter().enumerate() {
            ctx.set_output(i, channel)?;
        }
        Ok(())
    }
}
