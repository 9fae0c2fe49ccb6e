#![forbid(unsafe_code)]

//! Core: geometry, identifiers, width measurement, and capability detection.

pub mod geometry;
pub mod ids;
pub mod logging;
pub mod terminal_capabilities;
pub mod text_width;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, info_span, trace, trace_span, warn};

pub use geometry::{Rect, Sides, Size};
pub use ids::{LayerId, NodeId};
pub use terminal_capabilities::{ColorDepth, TerminalCapabilities};
