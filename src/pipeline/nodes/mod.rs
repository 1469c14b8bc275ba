//! Built-in node implementations.

pub mod channels;
pub mod crop;
pub mod expression;
pub mod image_effects;
pub mod image_info;
pub mod image_source;
pub mod math;
pub mod split;

pub use channels::ChannelsNode;
pub use crop::CropNode;
pub use expression::ExpressionNode;
pub use image_effects::{ImageEffect, ImageEffectNode};
pub use image_info::ImageInfoNode;
pub use image_source::ImageSourceNode;
pub use math::{AddNode, MultiplyNode};
pub use split::SplitNode;
