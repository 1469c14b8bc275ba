//! Node catalogue for dynamic node creation.
//!
//! [`NodeKind`] lists every built-in node with the metadata an add-node menu
//! needs; [`NodeFactory`] turns a kind into a live operation.

use crate::config::ScriptingConfig;
use crate::pipeline::node::NodeOperation;
use crate::pipeline::nodes::{
    AddNode, ChannelsNode, CropNode, ExpressionNode, ImageEffect, ImageEffectNode, ImageInfoNode,
    ImageSourceNode, MultiplyNode, SplitNode,
};
use crate::scripting::{builtins, ScriptEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Types of nodes that can be instantiated dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Add,
    Multiply,
    Expression,
    Split,
    /// File-backed source; created when a file is opened, not from the menu.
    Image,
    ImageInfo,
    Channels,
    Crop,
    /// One of the single-image transformations (flips and colour effects).
    Effect(ImageEffect),
}

impl NodeKind {
    /// Get all available node kinds.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Add,
            NodeKind::Multiply,
            NodeKind::Expression,
            NodeKind::Split,
            NodeKind::Image,
            NodeKind::ImageInfo,
            NodeKind::Channels,
            NodeKind::Crop,
            NodeKind::Effect(ImageEffect::FlipHorizontal),
            NodeKind::Effect(ImageEffect::FlipVertical),
            NodeKind::Effect(ImageEffect::Invert),
            NodeKind::Effect(ImageEffect::Grayscale),
            NodeKind::Effect(ImageEffect::Threshold),
            NodeKind::Effect(ImageEffect::Brightness),
            NodeKind::Effect(ImageEffect::HueRotate),
        ]
    }

    /// Get the display name for this node kind. Matches the node's definition.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Add => "Add",
            NodeKind::Multiply => "Multiply",
            NodeKind::Expression => "Expression",
            NodeKind::Split => "Split",
            NodeKind::Image => "Image",
            NodeKind::ImageInfo => "Image Info",
            NodeKind::Channels => "Channels",
            NodeKind::Crop => "Crop",
            NodeKind::Effect(effect) => effect.name(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Add => "Add two numbers together",
            NodeKind::Multiply => "Multiply two numbers",
            NodeKind::Expression => "Evaluate an expression of x and y",
            NodeKind::Split => "Splits one input into two identical outputs",
            NodeKind::Image => "Loads an image from a file",
            NodeKind::ImageInfo => "Get information about an image (e.g. width and height)",
            NodeKind::Channels => "Split an image into its red, green and blue channels",
            NodeKind::Crop => "Crop an image to a rectangle",
            NodeKind::Effect(effect) => effect.description(),
        }
    }

    /// Category path in `"Math/Basic/"` form.
    pub fn path(&self) -> &'static str {
        match self {
            NodeKind::Add | NodeKind::Multiply => "Math/Basic/",
            NodeKind::Expression => "Math",
            NodeKind::Split => "Utility",
            NodeKind::Image | NodeKind::ImageInfo | NodeKind::Channels | NodeKind::Crop => "Image",
            NodeKind::Effect(effect) => effect.path(),
        }
    }

    /// Whether the add-node menu should offer this kind.
    pub fn addable(&self) -> bool {
        !matches!(self, NodeKind::Image)
    }

    /// Look a kind up by its display name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<NodeKind> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.display_name().eq_ignore_ascii_case(name))
    }

    /// Addable kinds grouped by top-level category, in catalogue order.
    pub fn by_category() -> BTreeMap<&'static str, Vec<NodeKind>> {
        let mut groups: BTreeMap<&'static str, Vec<NodeKind>> = BTreeMap::new();
        for kind in Self::all().iter().filter(|k| k.addable()) {
            let category = kind.path().split('/').next().unwrap_or("Misc");
            groups.entry(category).or_default().push(*kind);
        }
        groups
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Creates node operations, sharing one expression engine between them.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    engine: Arc<ScriptEngine>,
}

impl NodeFactory {
    pub fn new(scripting: &ScriptingConfig) -> Self {
        Self {
            engine: Arc::new(ScriptEngine::new(scripting)),
        }
    }

    pub fn engine(&self) -> &Arc<ScriptEngine> {
        &self.engine
    }

    /// Create a node of `kind` with its default settings.
    pub fn create(&self, kind: NodeKind) -> Box<dyn NodeOperation> {
        match kind {
            NodeKind::Add => Box::new(AddNode::new()),
            NodeKind::Multiply => Box::new(MultiplyNode::new()),
            NodeKind::Expression => self.create_expression(builtins::SUM),
            NodeKind::Split => Box::new(SplitNode::new()),
            NodeKind::Image => Box::new(ImageSourceNode::new()),
            NodeKind::ImageInfo => Box::new(ImageInfoNode::new()),
            NodeKind::Channels => Box::new(ChannelsNode::new()),
            NodeKind::Crop => Box::new(CropNode::new()),
            NodeKind::Effect(effect) => Box::new(ImageEffectNode::new(effect)),
        }
    }

    /// Create an Expression node evaluating `source`.
    pub fn create_expression(&self, source: &str) -> Box<dyn NodeOperation> {
        Box::new(ExpressionNode::new(self.engine.clone(), source))
    }
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new(&ScriptingConfig::default())
    }
}
