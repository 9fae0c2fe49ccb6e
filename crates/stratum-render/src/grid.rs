#![forbid(unsafe_code)]

//! Cell grid storage.
//!
//! A [`CellGrid`] is a fixed-size, row-major 2D array of [`Cell`]s with a clip
//! stack and dirty-region tracking. Every layer owns one, the compositor
//! writes into one, and the display keeps two.
//!
//! # Invariants
//!
//! 1. `cells.len() == width * height` (zero-sized grids are allowed; every
//!    operation on them is a no-op).
//! 2. Out-of-bounds reads return `None`; out-of-bounds writes are dropped and
//!    never wrap into an adjacent row.
//! 3. A wide character is written whole (head + continuation) or not at all.
//! 4. Writes through [`CellGrid::set_cell`] obey the ownership rule; the
//!    `clear*` family and the compositor's raw writes bypass it.
//! 5. Every mutation marks the cells it changed dirty.

use crate::cell::{Cell, CellContent, CellPatch};
use crate::color::PackedRgba;
use crate::dirty::DirtyRegions;
use crate::escape::{AnsiSegments, Segment, SgrState};
use stratum_core::geometry::Rect;
use stratum_core::ids::NodeId;
use stratum_core::text_width::grapheme_width;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    clip_stack: Vec<Rect>,
    dirty: DirtyRegions,
}

impl CellGrid {
    /// A blank grid, fully dirty (nothing has been presented yet).
    pub fn new(width: u16, height: u16) -> Self {
        let mut grid = Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width as usize * height as usize],
            clip_stack: Vec::new(),
            dirty: DirtyRegions::new(),
        };
        grid.mark_all_dirty();
        grid
    }

    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    // ----- reads -----

    pub fn get_cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn get_row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        Some(&self.cells[start..start + self.width as usize])
    }

    pub fn get_column(&self, x: u16) -> Option<Vec<Cell>> {
        if x >= self.width {
            return None;
        }
        Some(
            (0..self.height)
                .map(|y| self.cells[y as usize * self.width as usize + x as usize])
                .collect(),
        )
    }

    /// Row contents as plain text (continuations skipped, blanks as spaces).
    pub fn row_text(&self, y: u16) -> Option<String> {
        self.get_row(y).map(|row| {
            row.iter()
                .filter(|c| !c.is_continuation())
                .map(Cell::display_char)
                .collect()
        })
    }

    /// All rows joined by newlines, trailing spaces trimmed.
    pub fn to_text(&self) -> String {
        (0..self.height)
            .filter_map(|y| self.row_text(y))
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ----- clipping -----

    /// Narrow the writable area. The effective clip is the intersection of
    /// everything pushed.
    pub fn push_clip(&mut self, rect: Rect) {
        let clipped = rect.intersection(&self.current_clip());
        self.clip_stack.push(clipped);
    }

    pub fn pop_clip(&mut self) {
        self.clip_stack.pop();
    }

    pub fn current_clip(&self) -> Rect {
        self.clip_stack.last().copied().unwrap_or_else(|| self.bounds())
    }

    pub fn clip_depth(&self) -> usize {
        self.clip_stack.len()
    }

    // ----- writes -----

    /// Merge `patch` into the cell at `(x, y)`.
    ///
    /// Returns `false` when the write was dropped: out of bounds, outside the
    /// clip, rejected by the ownership rule, a zero-width character, or a
    /// wide character that does not fit.
    pub fn set_cell(&mut self, x: u16, y: u16, patch: &CellPatch) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        if !self.current_clip().contains(x, y) {
            return false;
        }
        if !patch.may_overwrite(&self.cells[idx]) {
            return false;
        }
        if let Some(ch) = patch.ch
            && stratum_core::text_width::char_width(ch) == 0
        {
            return false;
        }
        let mut cell = self.cells[idx];
        patch.apply_to(&mut cell);
        if patch.ch.is_none() {
            // Style-only: the cell keeps its place in any wide character.
            self.cells[idx] = cell;
            self.dirty.mark(Rect::new(x, y, 1, 1));
            return true;
        }
        self.put(x, y, cell, true)
    }

    /// Write a complete cell, skipping the ownership rule but still honouring
    /// bounds, clip, and wide-character atomicity.
    pub fn set_raw(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.current_clip().contains(x, y) {
            return false;
        }
        self.put(x, y, cell, false)
    }

    fn put(&mut self, x: u16, y: u16, cell: Cell, check_owner: bool) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        let width = cell.content.width().max(1) as u16;
        if width > 1 {
            let clip = self.current_clip();
            for i in 1..width {
                let cx = x.saturating_add(i);
                let Some(tail) = self.index(cx, y) else {
                    return false;
                };
                if !clip.contains(cx, y) {
                    return false;
                }
                if check_owner && !CellPatch::from(cell).may_overwrite(&self.cells[tail]) {
                    return false;
                }
            }
        }

        let mut span = Rect::new(x, y, width, 1);
        for i in 0..width {
            span = span.union(&self.cleanup_overlap(x + i, y, i > 0));
        }

        self.cells[idx] = cell;
        for i in 1..width {
            let tail = idx + i as usize;
            self.cells[tail] = Cell {
                content: CellContent::CONTINUATION,
                ..cell
            };
        }
        self.dirty.mark(span);
        true
    }

    /// Break up any wide character that `(x, y)` is part of, returning the
    /// span of cells it touched.
    fn cleanup_overlap(&mut self, x: u16, y: u16, writing_tail: bool) -> Rect {
        let Some(idx) = self.index(x, y) else {
            return Rect::default();
        };
        let current = self.cells[idx];
        let mut touched = Rect::new(x, y, 1, 1);

        if !current.is_continuation() && current.content.width() > 1 {
            for i in 1..current.content.width() as u16 {
                if let Some(t) = self.index(x + i, y)
                    && self.cells[t].is_continuation()
                {
                    self.cells[t] = Cell::EMPTY;
                    touched = touched.union(&Rect::new(x + i, y, 1, 1));
                }
            }
        } else if current.is_continuation() && !writing_tail {
            let mut back = x;
            while back > 0 {
                back -= 1;
                let h = y as usize * self.width as usize + back as usize;
                if self.cells[h].is_continuation() {
                    continue;
                }
                let w = self.cells[h].content.width() as u16;
                if back + w > x {
                    self.cells[h] = Cell::EMPTY;
                    touched = touched.union(&Rect::new(back, y, 1, 1));
                    for i in 1..w {
                        if let Some(t) = self.index(back + i, y)
                            && self.cells[t].is_continuation()
                        {
                            self.cells[t] = Cell::EMPTY;
                            touched = touched.union(&Rect::new(back + i, y, 1, 1));
                        }
                    }
                }
                break;
            }
        }
        touched
    }

    /// Apply `patch` to every cell of `rect`. A wide fill character is laid
    /// down every other column.
    pub fn fill_region(&mut self, rect: Rect, patch: &CellPatch) {
        let area = rect.intersection(&self.bounds());
        let step = patch
            .ch
            .map_or(1, |c| stratum_core::text_width::char_width(c).max(1) as u16);
        for y in area.top()..area.bottom() {
            let mut x = area.left();
            while x < area.right() {
                self.set_cell(x, y, patch);
                x = x.saturating_add(step);
            }
        }
    }

    /// Paint a background color over `rect`, keeping characters.
    pub fn fill_background(&mut self, rect: Rect, color: PackedRgba, owner: NodeId, z_index: i32) {
        let patch = CellPatch::new().bg(color).owned_by(owner, z_index);
        self.fill_region(rect, &patch);
    }

    /// Reset `rect` to blank cells regardless of owner or clip.
    pub fn clear_region(&mut self, rect: Rect) {
        let area = rect.intersection(&self.bounds());
        if area.is_empty() {
            return;
        }
        let mut span = area;
        for y in area.top()..area.bottom() {
            // A wide char straddling either edge would be left half-drawn.
            span = span.union(&self.cleanup_overlap(area.left(), y, false));
            span = span.union(&self.cleanup_overlap(area.right() - 1, y, false));
            let start = y as usize * self.width as usize;
            self.cells[start + area.left() as usize..start + area.right() as usize]
                .fill(Cell::EMPTY);
            if let Some(next) = self.index(area.right(), y)
                && self.cells[next].is_continuation()
            {
                self.cells[next] = Cell::EMPTY;
                span = span.union(&Rect::new(area.right(), y, 1, 1));
            }
        }
        self.dirty.mark(span);
    }

    /// Reset every cell and mark the whole grid dirty.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
        self.mark_all_dirty();
    }

    /// Write `text` starting at `(x, y)`.
    ///
    /// Embedded SGR sequences change the style of the characters that follow
    /// (`ESC[0m` returns to `base`); other escape sequences and control
    /// characters are skipped. Each grapheme advances by its visible width.
    /// Stops at the right edge of the grid. Returns the number of cells
    /// advanced, including cells whose write was dropped by clip or owner.
    pub fn write_string(&mut self, x: u16, y: u16, text: &str, base: &CellPatch) -> u16 {
        if y >= self.height {
            return 0;
        }
        let base_state = SgrState::from_patch(base);
        let mut state = base_state;
        let mut cx = x;

        for segment in AnsiSegments::new(text) {
            match segment {
                Segment::Sgr(params) => state.apply(&params, &base_state),
                Segment::Other => {}
                Segment::Text(chunk) => {
                    for g in chunk.graphemes(true) {
                        let w = grapheme_width(g) as u16;
                        if w == 0 {
                            continue;
                        }
                        if cx as u32 + w as u32 > self.width as u32 {
                            return cx - x;
                        }
                        if let Some(ch) = g.chars().next() {
                            let patch = state.to_patch(base, &base_state).with_char(ch);
                            self.set_cell(cx, y, &patch);
                        }
                        cx += w;
                    }
                }
            }
        }
        cx - x
    }

    /// Change dimensions, keeping the overlapping top-left region.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == self.width && height == self.height {
            return;
        }
        let mut cells = vec![Cell::EMPTY; width as usize * height as usize];
        let keep_w = width.min(self.width) as usize;
        for y in 0..height.min(self.height) as usize {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            cells[dst..dst + keep_w].copy_from_slice(&self.cells[src..src + keep_w]);
            // A wide char cut by the new right edge loses its tail.
            if keep_w > 0 && (keep_w as u16) < self.width {
                let last = dst + keep_w - 1;
                if !cells[last].is_continuation() && cells[last].content.width() > 1 {
                    cells[last] = Cell::EMPTY;
                }
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
        self.clip_stack.clear();
        self.dirty.clip_to(self.bounds());
        self.mark_all_dirty();
    }

    // ----- dirty tracking -----

    pub fn mark_dirty(&mut self, rect: Rect) {
        self.dirty.mark(rect.intersection(&self.bounds()));
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.clear();
        self.dirty.mark(self.bounds());
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Coalesced, non-overlapping rectangles covering every changed cell.
    #[inline]
    pub fn dirty_regions(&self) -> &[Rect] {
        self.dirty.regions()
    }

    // ----- bulk copies -----

    /// A new grid holding a copy of `rect` (clipped to this grid).
    pub fn copy_region(&self, rect: Rect) -> CellGrid {
        let area = rect.intersection(&self.bounds());
        let mut out = CellGrid::new(area.width, area.height);
        for y in 0..area.height {
            let src = (area.y + y) as usize * self.width as usize + area.x as usize;
            let dst = y as usize * area.width as usize;
            out.cells[dst..dst + area.width as usize]
                .copy_from_slice(&self.cells[src..src + area.width as usize]);
            // Orphaned halves at the cut edges become blanks.
            if let Some(first) = out.cells.get_mut(dst)
                && first.is_continuation()
            {
                *first = Cell::EMPTY;
            }
            if area.width > 0 {
                let last = dst + area.width as usize - 1;
                if !out.cells[last].is_continuation() && out.cells[last].content.width() > 1 {
                    out.cells[last] = Cell::EMPTY;
                }
            }
        }
        out
    }

    /// Write `src` with its top-left at `(x, y)`, cell by cell under the
    /// ownership rule. Continuation cells are recreated from their heads.
    pub fn paste_buffer(&mut self, src: &CellGrid, x: u16, y: u16) {
        for sy in 0..src.height {
            for sx in 0..src.width {
                let cell = src.cells[sy as usize * src.width as usize + sx as usize];
                if cell.is_continuation() {
                    continue;
                }
                let (Some(dx), Some(dy)) = (x.checked_add(sx), y.checked_add(sy)) else {
                    continue;
                };
                let Some(idx) = self.index(dx, dy) else {
                    continue;
                };
                if !self.current_clip().contains(dx, dy) {
                    continue;
                }
                if CellPatch::from(cell).may_overwrite(&self.cells[idx]) {
                    self.put(dx, dy, cell, true);
                }
            }
        }
    }

    /// Make this grid identical to `other`, marking only changed cells
    /// dirty. Changes are compared visually plus by owner, so ownership
    /// transfers count as changes.
    pub fn sync_from(&mut self, other: &CellGrid) {
        if other.width != self.width || other.height != self.height {
            self.width = other.width;
            self.height = other.height;
            self.cells.clone_from(&other.cells);
            self.clip_stack.clear();
            self.dirty.clip_to(self.bounds());
            self.mark_all_dirty();
            return;
        }
        let w = self.width as usize;
        for y in 0..self.height {
            let row = y as usize * w;
            let mut run_start: Option<u16> = None;
            for x in 0..=self.width {
                let differs = x < self.width && {
                    let (a, b) = (&self.cells[row + x as usize], &other.cells[row + x as usize]);
                    !a.bits_eq(b) || a.owner != b.owner
                };
                match (differs, run_start) {
                    (true, None) => run_start = Some(x),
                    (false, Some(start)) => {
                        self.dirty.mark(Rect::new(start, y, x - start, 1));
                        run_start = None;
                    }
                    _ => {}
                }
            }
            self.cells[row..row + w].copy_from_slice(&other.cells[row..row + w]);
        }
    }

    /// Copy `cells` verbatim into row `y` from column `x`, ignoring clip and
    /// ownership. The caller keeps wide characters whole. Only cells that
    /// actually change are marked dirty.
    pub(crate) fn blit_row(&mut self, x: u16, y: u16, cells: &[Cell]) {
        let Some(start) = self.index(x, y) else {
            return;
        };
        let len = cells.len().min((self.width - x) as usize);
        let mut run_start: Option<usize> = None;
        for i in 0..=len {
            let differs = i < len && {
                let (a, b) = (&self.cells[start + i], &cells[i]);
                !a.bits_eq(b) || a.owner != b.owner
            };
            match (differs, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    self.dirty.mark(Rect::new(x + s as u16, y, (i - s) as u16, 1));
                    run_start = None;
                }
                _ => {}
            }
        }
        self.cells[start..start + len].copy_from_slice(&cells[..len]);
    }

    /// Visual equality of all cells.
    pub fn content_eq(&self, other: &CellGrid) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.bits_eq(b))
    }
}
