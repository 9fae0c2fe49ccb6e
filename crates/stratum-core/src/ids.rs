#![forbid(unsafe_code)]

//! Stable identifiers for nodes and layers.

use std::fmt;

/// Identity of a node in the render tree.
///
/// Ids are supplied by whoever builds the tree and must be unique within it.
/// They tag every cell a node paints so later writes can be checked against
/// the cell's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Identity of a compositing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayerId(pub u32);

impl LayerId {
    /// The screen-sized base layer. Always present.
    pub const ROOT: LayerId = LayerId(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Layer id for the stacking context a node originates.
    ///
    /// Offset by one so no node can map onto [`LayerId::ROOT`].
    #[inline]
    pub const fn for_node(node: NodeId) -> Self {
        Self(node.0.saturating_add(1))
    }

    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("layer:root")
        } else {
            write!(f, "layer:{}", self.0)
        }
    }
}
