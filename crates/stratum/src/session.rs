#![forbid(unsafe_code)]

//! The render session: one screen, rendered frame after frame.
//!
//! ```text
//! Node tree ─layout─▶ Layout ─paint─▶ layers ─composite─▶ grid ─diff─▶ bytes
//! ```
//!
//! Each [`RenderSession::render`] call runs the whole chain to completion on
//! the calling thread. Stacking contexts are painted one at a time into a
//! screen-sized scratch grid and copied into their layers with
//! [`CellGrid::sync_from`], so only cells that actually changed are marked
//! dirty and recomposited. Layers whose node is gone are removed.
//!
//! A resize resizes every layer, the compositor, and the display, and forces
//! the next frame to be a full repaint.

use std::collections::HashSet;
use std::io::{self, Write};

use stratum_core::geometry::Rect;
use stratum_core::ids::LayerId;
use stratum_layout::{Constraints, Layout, LayoutEngine, Node, Styled};
use stratum_render::compositor::Compositor;
use stratum_render::display::DoubleBufferedDisplay;
use stratum_render::escape::EscapeGenerator;
use stratum_render::grid::CellGrid;
use stratum_render::layer::LayerManager;

use crate::config::RenderConfig;
use crate::paint::{Painter, StackingContext};

/// What one frame cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub full_repaint: bool,
    pub cells_changed: usize,
    pub bytes_written: u64,
    /// Layers alive after the frame, root included.
    pub layers: usize,
}

#[derive(Debug)]
pub struct RenderSession {
    config: RenderConfig,
    engine: LayoutEngine,
    layers: LayerManager,
    compositor: Compositor,
    display: DoubleBufferedDisplay,
    scratch: CellGrid,
    last_layout: Option<Layout>,
    frame_count: u64,
}

impl RenderSession {
    /// A session with [`RenderConfig::default`].
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_config(RenderConfig::default(), width, height)
    }

    pub fn with_config(config: RenderConfig, width: u16, height: u16) -> Self {
        let mut display = DoubleBufferedDisplay::new(width, height)
            .with_generator(EscapeGenerator::new(config.color_depth))
            .with_sync_output(config.sync_output)
            .with_hide_cursor(config.hide_cursor)
            .with_full_redraw_ratio(config.full_redraw_ratio);
        display.set_final_cursor(config.final_cursor);

        stratum_core::debug!(
            width,
            height,
            color_depth = %config.color_depth,
            sync_output = config.sync_output,
            "render session created"
        );

        Self {
            config,
            engine: LayoutEngine::new(),
            layers: LayerManager::new(width, height),
            compositor: Compositor::new(width, height),
            display,
            scratch: CellGrid::new(width, height),
            last_layout: None,
            frame_count: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.layers.width()
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.layers.height()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `root` and write the frame to `out`.
    pub fn render<W: Write>(&mut self, root: &Node, out: &mut W) -> io::Result<FrameStats> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "render",
            frame = self.frame_count,
            root = %root.id(),
            width = self.width(),
            height = self.height()
        )
        .entered();

        let layout = self
            .engine
            .compute_layout(root, Constraints::viewport(self.width(), self.height()));
        self.paint_layers(root, &layout);

        self.compositor.composite_dirty(&mut self.layers);
        self.display.update_from_composite(self.compositor.result());
        let flush = self.display.present(out)?;

        self.frame_count += 1;
        self.last_layout = Some(layout);

        let stats = FrameStats {
            full_repaint: flush.full_repaint,
            cells_changed: flush.cells_changed,
            bytes_written: flush.bytes_emitted,
            layers: self.layers.len(),
        };
        stratum_core::debug!(
            frame = self.frame_count,
            full = stats.full_repaint,
            cells = stats.cells_changed,
            bytes = stats.bytes_written,
            layers = stats.layers,
            "frame rendered"
        );
        Ok(stats)
    }

    /// Render into a byte buffer and return it as text.
    pub fn render_to_string(&mut self, root: &Node) -> io::Result<String> {
        let mut out = Vec::new();
        self.render(root, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Paint every stacking context of `root` into its layer and drop the
    /// layers of contexts that no longer exist.
    fn paint_layers(&mut self, root: &Node, layout: &Layout) {
        let painter = Painter::new(layout);
        let screen = self.layers.screen();
        let mut seen: HashSet<LayerId> = HashSet::new();
        let mut queue = vec![StackingContext::root(root, screen)];

        while let Some(ctx) = queue.pop() {
            seen.insert(ctx.layer);
            if ctx.hidden {
                self.hide_context(&ctx, &mut seen);
                continue;
            }

            self.scratch.clear();
            let painted = painter.paint(&ctx, &mut self.scratch);
            queue.extend(painted.nested);

            if ctx.layer.is_root() {
                self.layers.root_mut().grid.sync_from(&self.scratch);
                continue;
            }
            let bounds = painted.bounds.intersection(&screen);
            let piece = self.scratch.copy_region(bounds);
            let layer = self
                .layers
                .create_layer(ctx.layer, ctx.z_index, bounds, Some(ctx.node_id()));
            layer.grid.sync_from(&piece);
            self.layers.set_visible(ctx.layer, true);
            self.layers.set_opacity(ctx.layer, ctx.node.style().opacity);
        }

        let stale: Vec<LayerId> = self
            .layers
            .iter()
            .map(|l| l.id())
            .filter(|id| !id.is_root() && !seen.contains(id))
            .collect();
        for id in stale {
            stratum_core::debug!(layer = %id, "layer removed with its node");
            self.layers.remove_layer(id);
        }
    }

    /// A context under `display: none` keeps its layer (and the layers of
    /// contexts inside it) but stops drawing.
    fn hide_context(&mut self, ctx: &StackingContext<'_>, seen: &mut HashSet<LayerId>) {
        if ctx.layer.is_root() {
            let blank = CellGrid::new(self.width(), self.height());
            self.layers.root_mut().grid.sync_from(&blank);
            return;
        }
        self.layers.set_visible(ctx.layer, false);
        for inner in ctx.node.descendants().skip(1) {
            if inner.creates_stacking_context() {
                let id = inner.layer_id().unwrap_or_else(|| LayerId::for_node(inner.id()));
                seen.insert(id);
                self.layers.set_visible(id, false);
            }
        }
    }

    /// Follow a terminal resize. The next frame is a full repaint.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        stratum_core::debug!(columns, rows, "resize");
        self.layers.resize(columns, rows);
        self.compositor.resize(columns, rows);
        self.display.resize(columns, rows);
        self.scratch.resize(columns, rows);
    }

    /// Force the next frame to be a full repaint.
    pub fn invalidate(&mut self) {
        self.display.invalidate();
    }

    /// The last composited frame.
    pub fn composite_grid(&self) -> &CellGrid {
        self.compositor.result()
    }

    /// Screen areas changed in the layers since the last composite.
    pub fn dirty_regions(&self) -> Vec<Rect> {
        self.layers
            .iter()
            .flat_map(|l| l.screen_dirty_regions())
            .collect()
    }

    pub fn display(&self) -> &DoubleBufferedDisplay {
        &self.display
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn last_layout(&self) -> Option<&Layout> {
        self.last_layout.as_ref()
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
