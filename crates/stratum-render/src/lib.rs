#![forbid(unsafe_code)]

//! Render kernel: cells, grids, layers, compositing, diffs, and escape
//! sequence output.
//!
//! The pipeline through this crate is
//!
//! ```text
//! Layer grids ──composite──▶ result grid ──update──▶ DoubleBufferedDisplay
//!                                                     │ diff / full repaint
//!                                                     ▼
//!                                               Presenter ──▶ io::Write
//! ```

pub mod ansi;
pub mod cell;
pub mod color;
pub mod compositor;
pub mod counting_writer;
pub mod diff;
pub mod dirty;
pub mod display;
pub mod escape;
pub mod grid;
pub mod layer;
pub mod presenter;

pub use cell::{Cell, CellContent, CellPatch, StyleFlags};
pub use color::{PackedRgba, ParseColorError};
pub use compositor::Compositor;
pub use counting_writer::FlushStats;
pub use diff::{CellDiff, ChangeRun, FrameDiff};
pub use display::DoubleBufferedDisplay;
pub use escape::{
    EscapeGenerator, buffer_to_ansi, cell_to_ansi, line_to_ansi, strip_ansi, transition_codes,
    visible_length,
};
pub use grid::CellGrid;
pub use layer::{Layer, LayerManager};
