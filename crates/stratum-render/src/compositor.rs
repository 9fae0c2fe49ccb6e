#![forbid(unsafe_code)]

//! Layer compositing.
//!
//! For each screen cell the compositor looks at the drawn layers covering
//! it, top-most first:
//!
//! - The top-most layer whose cell is occupied (a character, or a
//!   non-transparent background) supplies the character, foreground,
//!   attributes, and ownership.
//! - The background is that layer's background laid `over` the backgrounds
//!   of every layer below it, each scaled by its layer's opacity. An opaque
//!   background ends the walk, so a cell with no background of its own shows
//!   the nearest opaque background underneath.
//!
//! A wide character whose tail ends up covered by another layer (or whose
//! tail shows without its head) is replaced by a blank, keeping its
//! background.
//!
//! Compositing reads the layers and writes only the result grid, so
//! compositing an unchanged layer set twice yields identical results.

use smallvec::SmallVec;
use stratum_core::geometry::Rect;

use crate::cell::{Cell, CellContent};
use crate::grid::CellGrid;
use crate::layer::{Layer, LayerManager};

#[derive(Debug, Clone)]
pub struct Compositor {
    result: CellGrid,
    row: Vec<Cell>,
}

impl Compositor {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            result: CellGrid::new(width, height),
            row: Vec::with_capacity(width as usize),
        }
    }

    /// The last composited frame.
    #[inline]
    pub fn result(&self) -> &CellGrid {
        &self.result
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.result.resize(width, height);
    }

    /// Composite the whole screen.
    pub fn composite(&mut self, layers: &mut LayerManager) -> &CellGrid {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("composite", layers = layers.len()).entered();

        self.sync_size(layers);
        let screen = self.result.bounds();
        self.composite_rect(layers, screen);
        &self.result
    }

    /// Composite only `rect` (clipped to the screen).
    pub fn composite_region(&mut self, layers: &mut LayerManager, rect: Rect) -> &CellGrid {
        self.sync_size(layers);
        let area = rect.intersection(&self.result.bounds());
        if !area.is_empty() {
            self.composite_rect(layers, area);
        }
        &self.result
    }

    /// Composite everything that changed since the last call, then mark the
    /// layers clean. Falls back to a full composite after a structural
    /// change (layers added, removed, moved, restacked, hidden, or faded).
    pub fn composite_dirty(&mut self, layers: &mut LayerManager) -> &CellGrid {
        let full = layers.structure_changed()
            || layers.width() != self.result.width()
            || layers.height() != self.result.height();
        if full {
            self.composite(layers);
        } else {
            let regions: SmallVec<[Rect; 8]> = layers
                .iter()
                .filter(|l| l.is_drawn())
                .flat_map(Layer::screen_dirty_regions)
                .collect();
            stratum_core::trace!(regions = regions.len(), "dirty composite");
            for rect in regions {
                self.composite_region(layers, rect);
            }
        }
        layers.mark_clean();
        &self.result
    }

    fn sync_size(&mut self, layers: &mut LayerManager) {
        // Sorting may flag a structure change; that is fine, we are about to
        // recomposite anyway.
        layers.get_sorted_layers();
        if self.result.width() != layers.width() || self.result.height() != layers.height() {
            self.result.resize(layers.width(), layers.height());
        }
    }

    fn composite_rect(&mut self, layers: &LayerManager, area: Rect) {
        let width = self.result.width();
        let drawn: SmallVec<[&Layer; 8]> = layers.sorted().filter(|l| l.is_drawn()).collect();

        for y in area.top()..area.bottom() {
            // Widen the span by a column on each side, then until it no
            // longer splits a wide character, so repairs see both halves.
            let mut x0 = area.left().saturating_sub(1);
            while x0 > 0 && composite_cell(&drawn, x0, y).is_continuation() {
                x0 -= 1;
            }
            let mut x1 = area.right().saturating_add(1).min(width);
            while x1 < width && composite_cell(&drawn, x1 - 1, y).content.width() > 1 {
                x1 += 1;
            }

            self.row.clear();
            self.row
                .extend((x0..x1).map(|x| composite_cell(&drawn, x, y)));
            repair_wide_chars(&mut self.row);
            self.result.blit_row(x0, y, &self.row);
        }
    }
}

/// Composite one screen cell from `drawn` (sorted bottom first).
fn composite_cell(drawn: &[&Layer], x: u16, y: u16) -> Cell {
    let mut covering = drawn
        .iter()
        .rev()
        .filter_map(|layer| layer.cell_at(x, y).map(|cell| (*layer, cell)));

    let Some((top_layer, top_cell)) = covering.by_ref().find(|(_, cell)| cell.is_occupied())
    else {
        return Cell::EMPTY;
    };

    let mut bg = top_cell.bg.with_opacity(top_layer.opacity());
    for (layer, cell) in covering {
        if bg.is_opaque() {
            break;
        }
        bg = bg.over(cell.bg.with_opacity(layer.opacity()));
    }

    let mut fg = top_cell.fg;
    if top_layer.opacity() < 1.0 && !fg.is_transparent() && !bg.is_transparent() {
        fg = fg.with_opacity(top_layer.opacity()).over(bg);
    }

    Cell {
        content: top_cell.content,
        fg,
        bg,
        attrs: top_cell.attrs,
        owner: top_cell.owner,
        layer: top_layer.id(),
        z_index: top_cell.z_index,
    }
}

/// Blank any wide head without its continuation and any continuation
/// without its head. Both halves must come from the same layer.
fn repair_wide_chars(row: &mut [Cell]) {
    let blank = |cell: &mut Cell| cell.content = CellContent::EMPTY;
    let mut x = 0;
    while x < row.len() {
        let cell = row[x];
        if cell.is_continuation() {
            blank(&mut row[x]);
            x += 1;
            continue;
        }
        let width = cell.content.width();
        if width > 1 {
            let whole = (1..width).all(|i| {
                row.get(x + i)
                    .is_some_and(|t| t.is_continuation() && t.layer == cell.layer)
            });
            if whole {
                x += width;
                continue;
            }
            blank(&mut row[x]);
        }
        x += 1;
    }
}
