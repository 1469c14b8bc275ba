//! Node abstraction for the graph.
//!
//! A node is a [`NodeDefinition`] (metadata plus ordered inlet/outlet specs)
//! and a [`NodeOperation`] that recomputes outlets from inlets. The graph owns
//! the live ports; `apply` sees them through a [`NodeContext`].

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::{ApplyError, PipelineError};
use crate::pipeline::port::{Port, PortSpec};
use crate::pipeline::value::Value;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;

/// Which port a preview layer should render at the top of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSource {
    Inlet(u16),
    Outlet(u16),
}

/// Static description of a node: metadata and its ordered port specs.
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    /// Shown when searching and in the node's title. Must not be empty.
    pub name: String,
    pub description: String,
    pub help: String,
    /// Category path, e.g. `["Math", "Basic"]`.
    pub path: Vec<String>,
    /// Whether the add-node UI should list this node.
    pub addable: bool,
    pub preview: Option<PreviewSource>,
    pub inlets: Vec<PortSpec>,
    pub outlets: Vec<PortSpec>,
}

impl Default for NodeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: "No summary available.".to_string(),
            help: "No help available.".to_string(),
            path: vec!["Misc".to_string()],
            addable: true,
            preview: None,
            inlets: Vec::new(),
            outlets: Vec::new(),
        }
    }
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Split a `"Math/Basic/"` style category string. Empty means `Misc`.
    pub fn parse_path(path: &str) -> Vec<String> {
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        if trimmed.is_empty() {
            return vec!["Misc".to_string()];
        }
        trimmed.split('/').map(str::to_string).collect()
    }

    /// Append an inlet and return its index.
    pub fn add_inlet(&mut self, spec: PortSpec) -> u16 {
        self.inlets.push(spec);
        (self.inlets.len() - 1) as u16
    }

    /// Append an outlet and return its index.
    pub fn add_outlet(&mut self, spec: PortSpec) -> u16 {
        self.outlets.push(spec);
        (self.outlets.len() - 1) as u16
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::InvalidDefinition(
                "all nodes must declare a name".to_string(),
            ));
        }
        let limit = 1usize << 12;
        if self.inlets.len() > limit || self.outlets.len() > limit {
            return Err(PipelineError::InvalidDefinition(format!(
                "{} declares more than {} ports on one side",
                self.name, limit
            )));
        }
        let preview_in_range = match self.preview {
            Some(PreviewSource::Inlet(i)) => (i as usize) < self.inlets.len(),
            Some(PreviewSource::Outlet(i)) => (i as usize) < self.outlets.len(),
            None => true,
        };
        if !preview_in_range {
            return Err(PipelineError::InvalidDefinition(format!(
                "{}: preview port {:?} out of range",
                self.name, self.preview
            )));
        }
        Ok(())
    }
}

/// View of a node's live ports handed to `apply`.
pub struct NodeContext<'a> {
    pub(crate) inlets: &'a mut [Port],
    pub(crate) outlets: &'a mut [Port],
}

impl<'a> NodeContext<'a> {
    pub fn new(inlets: &'a mut [Port], outlets: &'a mut [Port]) -> Self {
        Self { inlets, outlets }
    }

    pub fn inlet_count(&self) -> usize {
        self.inlets.len()
    }

    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    fn inlet(&self, index: usize) -> Result<&Port, ApplyError> {
        self.inlets
            .get(index)
            .ok_or_else(|| ApplyError::MissingInput(format!("inlet #{}", index)))
    }

    fn outlet_mut(&mut self, index: usize) -> Result<&mut Port, ApplyError> {
        self.outlets
            .get_mut(index)
            .ok_or_else(|| ApplyError::MissingInput(format!("outlet #{}", index)))
    }

    /// Current value of an inlet.
    pub fn input(&self, index: usize) -> Result<&Value, ApplyError> {
        Ok(self.inlet(index)?.value())
    }

    /// An inlet's value cast to a number.
    pub fn input_number(&self, index: usize) -> Result<f64, ApplyError> {
        let value = TypeKind::Number.cast(self.input(index)?)?;
        Ok(value.as_number().unwrap_or_default())
    }

    /// Decoded pixels of an image inlet, `None` when it holds no image.
    pub fn input_image(&self, index: usize) -> Result<Option<Arc<RgbaImage>>, ApplyError> {
        Ok(self.input(index)?.as_pixels().cloned())
    }

    /// The concrete type currently flowing into an inlet.
    pub fn input_type(&self, index: usize) -> Result<TypeKind, ApplyError> {
        Ok(self.inlet(index)?.data_type.resolved_kind())
    }

    /// Overwrite one of this node's own inlets without propagating.
    pub fn set_input(&mut self, index: usize, value: impl Into<Value>) -> Result<(), ApplyError> {
        let port = self
            .inlets
            .get_mut(index)
            .ok_or_else(|| ApplyError::MissingInput(format!("inlet #{}", index)))?;
        port.data_type.set_value(value.into(), TypeKind::Unknown)?;
        Ok(())
    }

    pub fn set_output(&mut self, index: usize, value: impl Into<Value>) -> Result<(), ApplyError> {
        self.set_output_with_origin(index, value, TypeKind::Unknown)
    }

    /// Write an outlet, recording `origin` as the value's concrete type.
    pub fn set_output_with_origin(
        &mut self,
        index: usize,
        value: impl Into<Value>,
        origin: TypeKind,
    ) -> Result<(), ApplyError> {
        let port = self.outlet_mut(index)?;
        port.data_type.set_value(value.into(), origin)?;
        Ok(())
    }
}

/// The recomputation operation a concrete node supplies.
///
/// `apply` reads inlets and writes outlets. It may suspend, but must settle.
#[async_trait]
pub trait NodeOperation: Send {
    /// Metadata and port layout. Called once when the node is added.
    fn definition(&self) -> NodeDefinition;

    async fn apply(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ApplyError>;

    /// Called before the node is removed from the graph.
    fn on_before_remove(&mut self) {}
}

/// Per-node position in the update state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Idle,
    Applying,
}

/// Result of the most recent `apply` for a node.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Succeeded,
    Failed(ApplyError),
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::id::{NodeId, PortId};

    fn ports(kinds: &[TypeKind], outlet: bool) -> Vec<Port> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let id = if outlet {
                    PortId::outlet(NodeId(0), i as u16)
                } else {
                    PortId::inlet(NodeId(0), i as u16)
                };
                Port::from_spec(id, &PortSpec::new(*kind, format!("p{}", i))).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(NodeDefinition::parse_path("Math/Basic/"), vec!["Math", "Basic"]);
        assert_eq!(NodeDefinition::parse_path("Image"), vec!["Image"]);
        assert_eq!(NodeDefinition::parse_path(""), vec!["Misc"]);
    }

    #[test]
    fn test_definition_defaults() {
        let def = NodeDefinition::default();
        assert_eq!(def.description, "No summary available.");
        assert_eq!(def.help, "No help available.");
        assert_eq!(def.path, vec!["Misc"]);
        assert!(def.addable);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_add_ports_returns_indices() {
        let mut def = NodeDefinition::new("Add");
        assert_eq!(def.add_inlet(PortSpec::new(TypeKind::Number, "X")), 0);
        assert_eq!(def.add_inlet(PortSpec::new(TypeKind::Number, "Y")), 1);
        assert_eq!(def.add_outlet(PortSpec::new(TypeKind::Number, "Result")), 0);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_preview_out_of_range() {
        let mut def = NodeDefinition::new("Preview");
        def.preview = Some(PreviewSource::Outlet(0));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_context_reads_and_writes() {
        let mut inlets = ports(&[TypeKind::Number, TypeKind::Any], false);
        let mut outlets = ports(&[TypeKind::Number, TypeKind::Any], true);
        inlets[0].data_type.set_value(Value::from("4"), TypeKind::Unknown).unwrap();
        inlets[1].data_type.set_value(Value::Number(1.0), TypeKind::Number).unwrap();

        let mut ctx = NodeContext::new(&mut inlets, &mut outlets);
        assert_eq!(ctx.input_number(0).unwrap(), 4.0);
        assert_eq!(ctx.input_type(1).unwrap(), TypeKind::Number);
        assert!(ctx.input(5).is_err());

        ctx.set_output(0, 9.0).unwrap();
        ctx.set_output_with_origin(1, 2.0, TypeKind::Number).unwrap();
        assert!(ctx.set_output(0, "nope").is_err());

        assert_eq!(outlets[0].value(), &Value::Number(9.0));
        assert_eq!(outlets[1].data_type.name(), "Number");
    }
}
