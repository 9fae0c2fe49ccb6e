#![forbid(unsafe_code)]

//! Cell-level diff between two frames.
//!
//! [`FrameDiff::compute`] scans both grids row-major and records every cell
//! whose visual payload differs (`Cell::bits_eq`). Ownership bookkeeping is
//! ignored: a cell repainted by another node with the same look is not a
//! change on screen.
//!
//! ```
//! use stratum_render::cell::CellPatch;
//! use stratum_render::diff::FrameDiff;
//! use stratum_render::grid::CellGrid;
//!
//! let old = CellGrid::new(80, 24);
//! let mut new = CellGrid::new(80, 24);
//! new.write_string(5, 5, "XY", &CellPatch::new());
//!
//! let diff = FrameDiff::compute(&old, &new);
//! assert_eq!(diff.len(), 2);
//! assert_eq!(diff.runs().len(), 1);
//! ```

use crate::cell::Cell;
use crate::grid::CellGrid;

/// One changed cell and its new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDiff {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

/// A contiguous run of changed cells on one row, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRun {
    pub y: u16,
    pub x0: u16,
    pub x1: u16,
}

impl ChangeRun {
    #[inline]
    pub const fn new(y: u16, x0: u16, x1: u16) -> Self {
        debug_assert!(x0 <= x1);
        Self { y, x0, x1 }
    }

    #[inline]
    pub const fn len(&self) -> u16 {
        self.x1 - self.x0 + 1
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDiff {
    changes: Vec<CellDiff>,
}

impl FrameDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cell of `new` that differs from the same position in `old`.
    ///
    /// When the sizes differ, positions missing from `old` count as changed.
    pub fn compute(old: &CellGrid, new: &CellGrid) -> Self {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("diff_compute", width = new.width(), height = new.height())
            .entered();

        let estimated = (new.width() as usize * new.height() as usize) / 20;
        let mut changes = Vec::with_capacity(estimated);
        let same_size = old.width() == new.width() && old.height() == new.height();

        for y in 0..new.height() {
            let Some(row) = new.get_row(y) else {
                continue;
            };
            let old_row = if same_size { old.get_row(y) } else { None };
            for (x, cell) in row.iter().enumerate() {
                let unchanged = match old_row {
                    Some(old_row) => old_row[x].bits_eq(cell),
                    None => old
                        .get_cell(x as u16, y)
                        .is_some_and(|old_cell| old_cell.bits_eq(cell)),
                };
                if !unchanged {
                    changes.push(CellDiff {
                        x: x as u16,
                        y,
                        cell: *cell,
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(changes = changes.len(), "diff computed");

        Self { changes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes in row-major order.
    #[inline]
    pub fn changes(&self) -> &[CellDiff] {
        &self.changes
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &CellDiff> + '_ {
        self.changes.iter()
    }

    /// Coalesce consecutive columns on the same row.
    pub fn runs(&self) -> Vec<ChangeRun> {
        let mut runs: Vec<ChangeRun> = Vec::new();
        for change in &self.changes {
            match runs.last_mut() {
                Some(run) if run.y == change.y && run.x1 + 1 == change.x => run.x1 = change.x,
                _ => runs.push(ChangeRun::new(change.y, change.x, change.x)),
            }
        }
        runs
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
