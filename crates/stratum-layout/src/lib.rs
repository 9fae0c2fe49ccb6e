#![forbid(unsafe_code)]

//! Node tree, style model, and layout for stratum.
//!
//! - [`node`] - the owned [`Node`] tree and its capability traits
//! - [`style`] - [`Style`] and its CSS-like declaration parser
//! - [`text`] - ANSI-aware wrapping and alignment helpers
//! - [`engine`] - [`LayoutEngine`], producing a [`Layout`] of computed boxes
//!
//! ```
//! use stratum_core::ids::NodeId;
//! use stratum_layout::{Constraints, LayoutEngine, Node, Style};
//!
//! let tree = Node::new(NodeId(1))
//!     .with_style(Style::from_inline("display: flex; gap: 1"))
//!     .child(Node::text(NodeId(2), "left"))
//!     .child(Node::text(NodeId(3), "right"));
//! let layout = LayoutEngine::new().compute_layout(&tree, Constraints::viewport(20, 5));
//! assert_eq!(layout.bounds(NodeId(3)).map(|r| r.x), Some(5));
//! ```

mod block;
pub mod engine;
mod flex;
mod grid;
pub mod node;
mod position;
pub mod style;
pub mod text;

pub use engine::{ComputedBox, Constraints, Layout, LayoutEngine, LayoutResult, LayoutStats};
pub use node::{Capabilities, LaidOut, Node, NodeKind, Styled};
pub use style::{
    AlignItems, Border, BorderSides, BorderStyle, Dimension, Display, FlexDirection, FlexWrap,
    GridPlacement, GridTrack, Insets, JustifyContent, Overflow, Position, Style, StyleError,
};
pub use text::{TextAlign, WrapMode, wrap_text};
