#![forbid(unsafe_code)]

//! Grid layout: explicit and auto placement into tracks, then track sizing.
//!
//! Items with both a row and a column line go where they ask. The rest flow
//! row-major into the first free cells that fit their spans. Column tracks
//! are sized first (fixed, then `auto` from single-span content, then `fr`
//! shares of what is left), rows second, using each item's height at its
//! column span width. Tracks beyond the template are implicit `auto` tracks.
//! With no column template the grid has a single `1fr` column.

use smallvec::SmallVec;

use crate::engine::{Constraints, ContentBox, LayoutPass, Request, to_u16};
use crate::style::{AlignItems, GridTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    slot: usize,
    row: usize,
    col: usize,
    row_span: usize,
    col_span: usize,
}

/// Cells taken so far, grown a row at a time.
#[derive(Debug, Default)]
struct Occupancy {
    columns: usize,
    cells: Vec<bool>,
}

impl Occupancy {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            cells: Vec::new(),
        }
    }

    fn rows(&self) -> usize {
        self.cells.len() / self.columns.max(1)
    }

    fn is_free(&self, row: usize, col: usize, row_span: usize, col_span: usize) -> bool {
        if col + col_span > self.columns {
            return false;
        }
        (row..row + row_span).all(|r| {
            (col..col + col_span).all(|c| {
                self.cells
                    .get(r * self.columns + c)
                    .is_none_or(|taken| !taken)
            })
        })
    }

    fn take(&mut self, p: &Placement) {
        let needed = (p.row + p.row_span) * self.columns;
        if self.cells.len() < needed {
            self.cells.resize(needed, false);
        }
        for r in p.row..p.row + p.row_span {
            for c in p.col..(p.col + p.col_span).min(self.columns) {
                self.cells[r * self.columns + c] = true;
            }
        }
    }
}

impl LayoutPass<'_, '_> {
    pub(crate) fn layout_grid(&mut self, idx: usize, content: ContentBox) -> (i32, i32) {
        let style = self.style_of(idx);
        let children = self.in_flow_children(idx);
        if children.is_empty() {
            return (0, 0);
        }
        let col_gap = i32::from(style.effective_column_gap());
        let row_gap = i32::from(style.effective_row_gap());

        let mut columns: Vec<GridTrack> = if style.grid_template_columns.is_empty() {
            vec![GridTrack::Fr(1)]
        } else {
            style.grid_template_columns.clone()
        };
        // Explicit lines past the template add implicit columns.
        for &child in &children {
            let cs = self.style_of(child);
            if let Some(start) = cs.grid_column.start_track() {
                let end = start + cs.grid_column.span_len();
                if end > columns.len() {
                    columns.resize(end, GridTrack::Auto);
                }
            }
        }

        let placements = place_items(self, &children, columns.len());
        let row_count = placements
            .iter()
            .map(|p| p.row + p.row_span)
            .max()
            .unwrap_or(0)
            .max(style.grid_template_rows.len());
        let mut rows = style.grid_template_rows.clone();
        rows.resize(row_count, GridTrack::Auto);

        // Columns.
        let col_sizes = {
            let definite = (!content.shrink).then_some(content.width);
            let mut sizes = fixed_sizes(&columns, definite.is_some());
            for p in placements.iter().filter(|p| p.col_span == 1) {
                if !sizes.is_auto(p.col) {
                    continue;
                }
                let margin = i32::from(self.style_of(p.slot).margin.horizontal_sum());
                let req = Request::new(Constraints::shrink_to_fit(to_u16(content.width)));
                let (w, _) = self.measure(p.slot, req);
                sizes.grow(p.col, w + margin);
            }
            if let Some(width) = definite {
                sizes.share_fr(&columns, width, col_gap);
            }
            sizes.values
        };

        // Rows, from each item's height at its area width.
        let row_sizes = {
            let mut sizes = fixed_sizes(&rows, content.height.is_some());
            let mut spanning: SmallVec<[(Placement, i32); 4]> = SmallVec::new();
            for p in &placements {
                let area_w = span_size(&col_sizes, p.col, p.col_span, col_gap);
                let margin = i32::from(self.style_of(p.slot).margin.vertical_sum());
                let (_, h) = self.measure(p.slot, Request::new(Constraints::width(to_u16(area_w))));
                if p.row_span == 1 {
                    if sizes.is_auto(p.row) {
                        sizes.grow(p.row, h + margin);
                    }
                } else {
                    spanning.push((*p, h + margin));
                }
            }
            for (p, needed) in spanning {
                let have = span_size(&sizes.values, p.row, p.row_span, row_gap);
                let flexible = (p.row..p.row + p.row_span).rev().find(|&r| sizes.is_auto(r));
                if let (true, Some(r)) = (needed > have, flexible) {
                    sizes.values[r] = sizes.values[r].saturating_add(needed - have);
                }
            }
            if let Some(height) = content.height {
                sizes.share_fr(&rows, height, row_gap);
            }
            sizes.values
        };

        let mut extent = (0, 0);
        for p in &placements {
            let cs = self.style_of(p.slot);
            let m = cs.margin;
            let x = offset_of(&col_sizes, p.col, col_gap);
            let y = offset_of(&row_sizes, p.row, row_gap);
            let area_w = span_size(&col_sizes, p.col, p.col_span, col_gap);
            let area_h = span_size(&row_sizes, p.row, p.row_span, row_gap);

            let align = cs.align_self.unwrap_or(style.align_items);
            let area = ContentBox {
                x: 0,
                y: 0,
                width: area_w,
                height: Some(area_h),
                shrink: false,
            };
            let mut req = Request::new(area.child_constraints());
            if align == AlignItems::Stretch && cs.height.is_auto() {
                req = req.with_height((area_h - i32::from(m.vertical_sum())).max(0));
            }
            let (w, h) = self.place(p.slot, req);
            let free = area_h - h - i32::from(m.vertical_sum());
            let dy = match align {
                AlignItems::Start | AlignItems::Stretch => 0,
                AlignItems::Center => free / 2,
                AlignItems::End => free,
            };
            let bx = x.saturating_add(i32::from(m.left));
            let by = y.saturating_add(dy).saturating_add(i32::from(m.top));
            self.set_flow_offset(p.slot, content.x.saturating_add(bx), content.y.saturating_add(by));
            extent.0 = extent.0.max(bx.saturating_add(w).saturating_add(i32::from(m.right)));
            extent.1 = extent.1.max(by.saturating_add(h).saturating_add(i32::from(m.bottom)));
        }
        extent
    }
}

/// Explicit placements first, then auto-flow in document order.
fn place_items(pass: &LayoutPass<'_, '_>, children: &[usize], columns: usize) -> Vec<Placement> {
    let mut grid = Occupancy::new(columns);
    let mut placed: Vec<Option<Placement>> = vec![None; children.len()];

    for (n, &child) in children.iter().enumerate() {
        let cs = pass.style_of(child);
        if let (Some(row), Some(col)) = (cs.grid_row.start_track(), cs.grid_column.start_track()) {
            let p = Placement {
                slot: child,
                row,
                col,
                row_span: cs.grid_row.span_len(),
                col_span: cs.grid_column.span_len().min(columns - col),
            };
            grid.take(&p);
            placed[n] = Some(p);
        }
    }

    let mut cursor = (0, 0);
    for (n, &child) in children.iter().enumerate() {
        if placed[n].is_some() {
            continue;
        }
        let cs = pass.style_of(child);
        let row_span = cs.grid_row.span_len();
        let col_span = cs.grid_column.span_len().min(columns);
        let (row, col) = match (cs.grid_row.start_track(), cs.grid_column.start_track()) {
            (None, Some(col)) => {
                let col_span = col_span.min(columns - col);
                let row = (0..)
                    .find(|&r| grid.is_free(r, col, row_span, col_span))
                    .unwrap_or(grid.rows());
                (row, col)
            }
            (Some(row), None) => {
                let col = (0..=columns - col_span)
                    .find(|&c| grid.is_free(row, c, row_span, col_span))
                    .unwrap_or(0);
                (row, col)
            }
            _ => {
                let spot = auto_flow(&grid, cursor, row_span, col_span);
                cursor = (spot.0, spot.1 + col_span);
                spot
            }
        };
        let p = Placement {
            slot: child,
            row,
            col,
            row_span,
            col_span: col_span.min(columns - col),
        };
        grid.take(&p);
        placed[n] = Some(p);
    }
    placed.into_iter().flatten().collect()
}

/// First free spot at or after `cursor`, scanning row-major.
fn auto_flow(grid: &Occupancy, cursor: (usize, usize), row_span: usize, col_span: usize) -> (usize, usize) {
    let mut row = cursor.0;
    let mut col = cursor.1;
    loop {
        while col + col_span <= grid.columns {
            if grid.is_free(row, col, row_span, col_span) {
                return (row, col);
            }
            col += 1;
        }
        row += 1;
        col = 0;
        // Past the occupied rows everything is free.
        if row > grid.rows() {
            return (row, 0);
        }
    }
}

struct TrackSizes {
    values: Vec<i32>,
    auto: Vec<bool>,
}

impl TrackSizes {
    fn is_auto(&self, track: usize) -> bool {
        self.auto.get(track).copied().unwrap_or(false)
    }

    fn grow(&mut self, track: usize, size: i32) {
        if let Some(v) = self.values.get_mut(track) {
            *v = (*v).max(size);
        }
    }

    /// Split the space left after non-`fr` tracks between `fr` tracks;
    /// rounding leftovers go to the last one.
    fn share_fr(&mut self, tracks: &[GridTrack], total: i32, gap: i32) {
        let total_fr: u32 = tracks
            .iter()
            .map(|t| match t {
                GridTrack::Fr(f) => u32::from(*f),
                _ => 0,
            })
            .sum();
        if total_fr == 0 {
            return;
        }
        let fixed = tracks
            .iter()
            .zip(&self.values)
            .filter(|(t, _)| !matches!(t, GridTrack::Fr(_)))
            .fold(0i32, |acc, (_, v)| acc.saturating_add(*v));
        let gaps = gap.saturating_mul(tracks.len().saturating_sub(1) as i32);
        let leftover = total.saturating_sub(fixed).saturating_sub(gaps).max(0);
        let mut handed = 0;
        let mut last = None;
        for (i, t) in tracks.iter().enumerate() {
            if let GridTrack::Fr(f) = t {
                let share = (i64::from(leftover) * i64::from(*f) / i64::from(total_fr)) as i32;
                self.values[i] = share;
                handed += share;
                last = Some(i);
            }
        }
        if let Some(i) = last {
            self.values[i] += leftover - handed;
        }
    }
}

/// Fixed tracks get their size; everything else starts at zero and is
/// content-sized. `fr` tracks only stay flexible when the axis is definite.
fn fixed_sizes(tracks: &[GridTrack], definite: bool) -> TrackSizes {
    let values = tracks
        .iter()
        .map(|t| match t {
            GridTrack::Cells(n) => i32::from(*n),
            _ => 0,
        })
        .collect();
    let auto = tracks
        .iter()
        .map(|t| match t {
            GridTrack::Auto => true,
            GridTrack::Fr(_) => !definite,
            GridTrack::Cells(_) => false,
        })
        .collect();
    TrackSizes { values, auto }
}

fn offset_of(sizes: &[i32], track: usize, gap: i32) -> i32 {
    sizes
        .iter()
        .take(track)
        .fold(0i32, |acc, s| acc.saturating_add(*s).saturating_add(gap))
}

fn span_size(sizes: &[i32], start: usize, span: usize, gap: i32) -> i32 {
    let end = (start + span).min(sizes.len());
    if start >= end {
        return 0;
    }
    let gaps = gap.saturating_mul((end - start - 1) as i32);
    sizes[start..end].iter().fold(gaps, |acc, s| acc.saturating_add(*s))
}
