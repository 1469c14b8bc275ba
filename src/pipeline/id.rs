//! Identity types for the graph arena.
//!
//! `NodeId` is a direct index into `Graph::nodes`. `PortId` packs the owning
//! node, the port side and the port's position within that side, so a port can
//! be resolved in O(1) without a separate port table.

use crate::pipeline::port::PortDirection;
use std::fmt;

/// Index into `Graph::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Id for arena slot `index`, or `None` when it does not fit in a `PortId`.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < PortId::MAX_NODES).then_some(NodeId(index as u32))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "NodeId(INVALID)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Compact port identifier.
///
/// Layout: high 19 bits = node index, bit 12 = side (1 for outlets),
/// low 12 bits = index within that side. Supports ~500k nodes with 4096
/// inlets and 4096 outlets each.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

impl PortId {
    const INDEX_BITS: u32 = 12;
    const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;
    const SIDE_BIT: u32 = 1 << Self::INDEX_BITS;
    const NODE_SHIFT: u32 = Self::INDEX_BITS + 1;

    /// Number of distinct node indices a port id can address.
    pub const MAX_NODES: usize = 1 << (u32::BITS - Self::NODE_SHIFT);

    pub fn new(node: NodeId, direction: PortDirection, index: u16) -> Self {
        debug_assert!((index as u32) <= Self::INDEX_MASK);
        let side = match direction {
            PortDirection::Input => 0,
            PortDirection::Output => Self::SIDE_BIT,
        };
        Self((node.0 << Self::NODE_SHIFT) | side | (index as u32 & Self::INDEX_MASK))
    }

    /// Shorthand for `PortId::new(node, PortDirection::Input, index)`.
    pub fn inlet(node: NodeId, index: u16) -> Self {
        Self::new(node, PortDirection::Input, index)
    }

    /// Shorthand for `PortId::new(node, PortDirection::Output, index)`.
    pub fn outlet(node: NodeId, index: u16) -> Self {
        Self::new(node, PortDirection::Output, index)
    }

    #[inline]
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> Self::NODE_SHIFT)
    }

    #[inline]
    pub fn direction(self) -> PortDirection {
        if self.0 & Self::SIDE_BIT == 0 {
            PortDirection::Input
        } else {
            PortDirection::Output
        }
    }

    #[inline]
    pub fn index(self) -> u16 {
        (self.0 & Self::INDEX_MASK) as u16
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PortId(node={}, {}={})",
            self.node().0,
            match self.direction() {
                PortDirection::Input => "in",
                PortDirection::Output => "out",
            },
            self.index()
        )
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
