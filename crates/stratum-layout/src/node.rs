#![forbid(unsafe_code)]

//! The node tree consumed by layout and painting.
//!
//! A [`Node`] owns its children, so every node but the root has exactly one
//! parent by construction. Trees are built with consuming builders:
//!
//! ```
//! use stratum_core::ids::NodeId;
//! use stratum_layout::node::Node;
//! use stratum_layout::style::{BorderStyle, Style};
//!
//! let tree = Node::new(NodeId(1))
//!     .with_style(Style::new().border(BorderStyle::Rounded))
//!     .child(Node::text(NodeId(2), "hello"))
//!     .child(Node::text(NodeId(3), "world"));
//! assert_eq!(tree.children().len(), 2);
//! assert_eq!(tree.descendants().count(), 3);
//! ```
//!
//! What a node can do is fixed when it is built and reported through
//! [`Capabilities`]; the pipeline dispatches on [`NodeKind`] and that set.

use stratum_core::ids::{LayerId, NodeId};

use crate::style::{Display, Style};

bitflags::bitflags! {
    /// Capabilities a node was built with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Carries a [`Style`].
        const STYLED    = 0b0_0001;
        /// Takes part in layout.
        const LAYOUT    = 0b0_0010;
        /// Paints into a cell grid.
        const RENDER    = 0b0_0100;
        /// Has text content.
        const TEXT      = 0b0_1000;
        /// May have children.
        const CONTAINER = 0b1_0000;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A box that lays out its children.
    Box,
    /// A leaf holding text, which may contain SGR sequences.
    Text(String),
    /// Occupies space but paints nothing.
    Spacer,
}

impl NodeKind {
    fn capabilities(&self) -> Capabilities {
        match self {
            Self::Box => {
                Capabilities::STYLED
                    | Capabilities::LAYOUT
                    | Capabilities::RENDER
                    | Capabilities::CONTAINER
            }
            Self::Text(_) => {
                Capabilities::STYLED
                    | Capabilities::LAYOUT
                    | Capabilities::RENDER
                    | Capabilities::TEXT
            }
            Self::Spacer => Capabilities::STYLED | Capabilities::LAYOUT,
        }
    }
}

/// Read access to a node's style.
pub trait Styled {
    fn style(&self) -> &Style;
}

/// What the layout engine needs from a node.
pub trait LaidOut {
    fn display(&self) -> Display;

    /// Children that take part in layout, in document order.
    fn layout_children(&self) -> &[Node];

    /// Text to wrap and measure, for text leaves.
    fn intrinsic_text(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    style: Style,
    children: Vec<Node>,
    layer_id: Option<LayerId>,
    capabilities: Capabilities,
}

impl Node {
    /// An empty box.
    pub fn new(id: NodeId) -> Self {
        Self::with_kind(id, NodeKind::Box)
    }

    pub fn text(id: NodeId, text: impl Into<String>) -> Self {
        Self::with_kind(id, NodeKind::Text(text.into()))
    }

    pub fn spacer(id: NodeId) -> Self {
        Self::with_kind(id, NodeKind::Spacer)
    }

    fn with_kind(id: NodeId, kind: NodeKind) -> Self {
        let capabilities = kind.capabilities();
        Self {
            id,
            kind,
            style: Style::default(),
            children: Vec::new(),
            layer_id: None,
            capabilities,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Append a child. Only boxes hold children; for other kinds the child
    /// is dropped.
    #[must_use]
    pub fn child(mut self, child: Node) -> Self {
        if self.capabilities.contains(Capabilities::CONTAINER) {
            self.children.push(child);
        } else {
            stratum_core::debug!(node = %self.id, child = %child.id, "child ignored on leaf node");
        }
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        for child in children {
            self = self.child(child);
        }
        self
    }

    /// Give this node a stacking context of its own, composited as `layer`.
    #[must_use]
    pub fn layer(mut self, layer: LayerId) -> Self {
        self.layer_id = Some(layer);
        self
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn has(&self, caps: Capabilities) -> bool {
        self.capabilities.contains(caps)
    }

    #[inline]
    pub fn layer_id(&self) -> Option<LayerId> {
        self.layer_id
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Whether this node gets a layer of its own.
    pub fn creates_stacking_context(&self) -> bool {
        self.layer_id.is_some() || self.style.creates_stacking_context()
    }

    /// This node and all descendants, depth first in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Depth-first search by id.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.descendants().find(|n| n.id == id)
    }
}

impl Styled for Node {
    #[inline]
    fn style(&self) -> &Style {
        &self.style
    }
}

impl LaidOut for Node {
    #[inline]
    fn display(&self) -> Display {
        self.style.display
    }

    #[inline]
    fn layout_children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    fn intrinsic_text(&self) -> Option<&str> {
        self.text_content()
    }
}

/// Pre-order iterator returned by [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
