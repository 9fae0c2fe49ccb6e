#![forbid(unsafe_code)]

//! stratum: a terminal rendering engine.
//!
//! A tree of styled [`Node`]s is laid out (block, flex, grid, four
//! positioning modes), painted into one cell grid per stacking context,
//! composited by z-index, and diffed against the previous frame so only
//! changed cells reach the terminal.
//!
//! ```
//! use stratum::prelude::*;
//!
//! let root = Node::new(NodeId(1))
//!     .with_style(Style::new().border(BorderStyle::Rounded))
//!     .child(Node::text(NodeId(2), "hello"));
//!
//! let mut session = RenderSession::new(20, 3);
//! let mut out = Vec::new();
//! let stats = session.render(&root, &mut out)?;
//! assert!(stats.full_repaint);
//! assert_eq!(session.composite_grid().row_text(1).as_deref().map(str::trim_end), Some("│hello             │"));
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Features
//!
//! - `tracing`: spans and events across layout, compositing, and flushing.
//! - `tracing-json`: adds `stratum_core::logging::init_json_subscriber`.

pub mod config;
pub mod paint;
pub mod session;

pub use config::RenderConfig;
pub use paint::{BorderChars, Inherited, PaintContext, Renderable};
pub use session::{FrameStats, RenderSession};

// --- Re-exports ------------------------------------------------------------

pub use stratum_core::geometry::{Rect, Sides, Size};
pub use stratum_core::ids::{LayerId, NodeId};
pub use stratum_core::terminal_capabilities::{ColorDepth, TerminalCapabilities, terminal_size};
pub use stratum_layout::{
    AlignItems, BorderStyle, Constraints, Dimension, Display, FlexDirection, FlexWrap,
    GridPlacement, GridTrack, JustifyContent, Layout, LayoutEngine, Node, Overflow, Position,
    Style, TextAlign, WrapMode,
};
pub use stratum_render::{Cell, CellGrid, PackedRgba, StyleFlags};

pub mod prelude {
    pub use crate::{
        BorderStyle, Dimension, Display, FlexDirection, JustifyContent, Node, NodeId, Overflow,
        PackedRgba, Position, Rect, RenderConfig, RenderSession, Sides, Style, TextAlign,
    };

    pub use crate::{core, layout, render};
}

pub use stratum_core as core;
pub use stratum_layout as layout;
pub use stratum_render as render;
