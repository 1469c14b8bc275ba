//! Single-image transformations: one `Image` inlet (plus an optional
//! parameter) in, one transformed `Output` image out.
//!
//! Pixel work runs on tokio's blocking pool and is awaited, so `apply`
//! suspends while it runs. No image in means no image out.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use crate::pipeline::value::Value;
use async_trait::async_trait;
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// The transformations an [`ImageEffectNode`] can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageEffect {
    Invert,
    Grayscale,
    Threshold,
    Brightness,
    HueRotate,
    FlipHorizontal,
    FlipVertical,
}

impl ImageEffect {
    pub fn name(self) -> &'static str {
        match self {
            ImageEffect::Invert => "Invert",
            ImageEffect::Grayscale => "Grayscale",
            ImageEffect::Threshold => "Threshold",
            ImageEffect::Brightness => "Brightness",
            ImageEffect::HueRotate => "Hue Rotate",
            ImageEffect::FlipHorizontal => "Flip Horizontal",
            ImageEffect::FlipVertical => "Flip Vertical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ImageEffect::Invert => "Invert the colours of an image",
            ImageEffect::Grayscale => "Convert an image to shades of gray",
            ImageEffect::Threshold => "Turn each pixel black or white depending on its brightness",
            ImageEffect::Brightness => "Brighten or darken an image",
            ImageEffect::HueRotate => "Rotate the hue of every pixel in an image",
            ImageEffect::FlipHorizontal => "Mirror an image from left to right",
            ImageEffect::FlipVertical => "Mirror an image from top to bottom",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            ImageEffect::FlipHorizontal | ImageEffect::FlipVertical => "Image",
            _ => "Image/Effects",
        }
    }

    /// The extra numeric inlet this effect reads, if any.
    fn parameter(self) -> Option<PortSpec> {
        match self {
            ImageEffect::Threshold => Some(
                PortSpec::new(TypeKind::Number, "Threshold")
                    .with_description("The threshold value")
                    .with_initial(128.0),
            ),
            ImageEffect::Brightness => Some(
                PortSpec::new(TypeKind::Number, "Amount").with_description(
                    "The amount to brighten (or, if negative, darken) the image by",
                ),
            ),
            ImageEffect::HueRotate => Some(
                PortSpec::new(TypeKind::Number, "Amount")
                    .with_description("The amount to rotate the colour space, in degrees"),
            ),
            _ => None,
        }
    }

    /// Produce a new image. `amount` is the parameter inlet's value.
    pub fn render(self, img: &RgbaImage, amount: f64) -> RgbaImage {
        match self {
            ImageEffect::FlipHorizontal => imageops::flip_horizontal(img),
            ImageEffect::FlipVertical => imageops::flip_vertical(img),
            ImageEffect::HueRotate => {
                let matrix = hue_rotation_matrix(amount % 360.0);
                map_rgb(img, |[r, g, b]| {
                    let (r, g, b) = (r as f64, g as f64, b as f64);
                    [
                        clamp_channel(r * matrix[0][0] + g * matrix[0][1] + b * matrix[0][2]),
                        clamp_channel(r * matrix[1][0] + g * matrix[1][1] + b * matrix[1][2]),
                        clamp_channel(r * matrix[2][0] + g * matrix[2][1] + b * matrix[2][2]),
                    ]
                })
            }
            ImageEffect::Invert => map_rgb(img, |[r, g, b]| [255 - r, 255 - g, 255 - b]),
            ImageEffect::Grayscale => map_rgb(img, |rgb| {
                let avg = average(rgb);
                [avg, avg, avg]
            }),
            ImageEffect::Threshold => map_rgb(img, |rgb| {
                let v = if (average(rgb) as f64) < amount { 0 } else { 255 };
                [v, v, v]
            }),
            ImageEffect::Brightness => map_rgb(img, |[r, g, b]| {
                [
                    clamp_channel(r as f64 + amount),
                    clamp_channel(g as f64 + amount),
                    clamp_channel(b as f64 + amount),
                ]
            }),
        }
    }

    pub fn all() -> &'static [ImageEffect] {
        &[
            ImageEffect::Invert,
            ImageEffect::Grayscale,
            ImageEffect::Threshold,
            ImageEffect::Brightness,
            ImageEffect::HueRotate,
            ImageEffect::FlipHorizontal,
            ImageEffect::FlipVertical,
        ]
    }
}

/// Apply `f` to the RGB channels of every pixel, keeping alpha.
pub(crate) fn map_rgb(img: &RgbaImage, f: impl Fn([u8; 3]) -> [u8; 3]) -> RgbaImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let [r, g, b, _] = px.0;
        let [r, g, b] = f([r, g, b]);
        px.0[0] = r;
        px.0[1] = g;
        px.0[2] = b;
    }
    out
}

fn average([r, g, b]: [u8; 3]) -> u8 {
    ((r as f64 + g as f64 + b as f64) / 3.0).round() as u8
}

fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// RGB rotation about the gray axis.
fn hue_rotation_matrix(degrees: f64) -> [[f64; 3]; 3] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let third = 1.0 / 3.0;
    let diag = cos + (1.0 - cos) * third;
    let plus = third * (1.0 - cos) + third.sqrt() * sin;
    let minus = third * (1.0 - cos) - third.sqrt() * sin;
    [[diag, minus, plus], [plus, diag, minus], [minus, plus, diag]]
}

/// A node wrapping one [`ImageEffect`].
#[derive(Debug)]
pub struct ImageEffectNode {
    effect: ImageEffect,
}

impl ImageEffectNode {
    pub fn new(effect: ImageEffect) -> Self {
        Self { effect }
    }

    pub fn effect(&self) -> ImageEffect {
        self.effect
    }
}

#[async_trait]
impl NodeOperation for ImageEffectNode {
    fn definition(&self) -> NodeDefinition {
        let mut def = NodeDefinition {
            name: self.effect.name().to_string(),
            description: self.effect.description().to_string(),
            path: NodeDefinition::parse_path(self.effect.path()),
            preview: Some(PreviewSource::Outlet(0)),
            inlets: vec![
                PortSpec::new(TypeKind::Image, "Image").with_description("The initial image"),
            ],
            outlets: vec![
                PortSpec::new(TypeKind::Image, "Output").with_description("The transformed image"),
            ],
            ..NodeDefinition::default()
        };
        if let Some(parameter) = self.effect.parameter() {
            def.add_inlet(parameter);
        }
        def
    }

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        let Some(img) = ctx.input_image(0)? else {
            return ctx.set_output(0, Value::Null);
        };
        let amount = if ctx.inlet_count() > 1 {
            ctx.input_number(1)?
        } else {
            0.0
        };

        let effect = self.effect;
        let output = tokio::task::spawn_blocking(move || effect.render(&img, amount)).await?;
        ctx.set_output(0, output)
    }
}
