//! Ports: named, typed attachment points on a node.
//!
//! Nodes declare their ports with [`PortSpec`]s; the graph turns each spec
//! into a live [`Port`] that owns a [`DataType`] and at most one link.

use crate::pipeline::data_type::{DataType, TypeKind};
use crate::pipeline::error::CastError;
use crate::pipeline::id::{NodeId, PortId};
use crate::pipeline::value::Value;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }
}

/// Declarative description of a port, as listed in a node definition.
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub name: String,
    pub description: String,
    pub kind: TypeKind,
    /// Starting value; `Value::Null` means the type's default.
    pub initial: Value,
}

impl PortSpec {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            initial: Value::Null,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_initial(mut self, initial: impl Into<Value>) -> Self {
        self.initial = initial.into();
        self
    }
}

/// A live port inside the graph arena.
#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    /// The peer port, always on the opposite side and on another node.
    pub link: Option<PortId>,
}

impl Port {
    pub(crate) fn from_spec(id: PortId, spec: &PortSpec) -> Result<Self, CastError> {
        Ok(Self {
            id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            data_type: DataType::with_value(spec.kind, spec.initial.clone())?,
            link: None,
        })
    }

    #[inline]
    pub fn owner(&self) -> NodeId {
        self.id.node()
    }

    #[inline]
    pub fn direction(&self) -> PortDirection {
        self.id.direction()
    }

    pub fn value(&self) -> &Value {
        self.data_type.value()
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn linked_port(&self) -> Option<PortId> {
        self.link
    }

    pub(crate) fn set_linked_port(&mut self, peer: Option<PortId>) {
        self.link = peer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec_casts_initial() {
        let spec = PortSpec::new(TypeKind::Number, "Threshold").with_initial(128.0);
        let port = Port::from_spec(PortId::inlet(NodeId(0), 1), &spec).unwrap();
        assert_eq!(port.value(), &Value::Number(128.0));
        assert_eq!(port.direction(), PortDirection::Input);
        assert_eq!(port.owner(), NodeId(0));
        assert!(!port.has_link());
    }

    #[test]
    fn test_from_spec_rejects_bad_initial() {
        let spec = PortSpec::new(TypeKind::Image, "Input").with_initial(3.0);
        assert!(Port::from_spec(PortId::inlet(NodeId(0), 0), &spec).is_err());
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(PortDirection::Input.opposite(), PortDirection::Output);
        assert_eq!(PortDirection::Output.opposite(), PortDirection::Input);
    }
}
