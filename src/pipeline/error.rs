//! Graph engine error types.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::id::{NodeId, PortId};
use crate::pipeline::value::Value;
use thiserror::Error;

/// A value is not representable in the target type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not convert {found} value to {target}")]
pub struct CastError {
    pub target: TypeKind,
    pub found: &'static str,
}

impl CastError {
    pub fn new(target: TypeKind, raw: &Value) -> Self {
        Self {
            target,
            found: raw.variant_name(),
        }
    }
}

/// Why a `connect` request was refused. No state changes on any of these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Port {0} is already linked")]
    AlreadyLinked(PortId),

    #[error("Cannot connect {0} to itself")]
    SameOwner(NodeId),

    #[error("Cannot connect two ports of the same side")]
    SideMismatch,

    #[error("Connecting {outlet} to {inlet} would create a cycle")]
    CyclicDependency { outlet: PortId, inlet: PortId },

    #[error("{outlet_type} and {inlet_type} are not compatible")]
    TypeMismatch {
        outlet_type: TypeKind,
        inlet_type: TypeKind,
    },

    #[error("Unknown port {0}")]
    UnknownPort(PortId),
}

/// A node's `apply` could not produce outputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid input {name}: {message}")]
    InvalidInput { name: String, message: String },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ApplyError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApplyError::Task(err.to_string())
    }
}

impl From<image::ImageError> for ApplyError {
    fn from(err: image::ImageError) -> Self {
        ApplyError::Decode(err.to_string())
    }
}

/// Errors from graph operations other than `connect`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Unknown port {0}")]
    UnknownPort(PortId),

    #[error("Invalid node definition: {0}")]
    InvalidDefinition(String),

    #[error("Graph is full: at most {0} nodes can ever be added")]
    CapacityExceeded(usize),

    #[error(transparent)]
    Cast(#[from] CastError),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
