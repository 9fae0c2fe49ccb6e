#![forbid(unsafe_code)]

//! Double-buffered display.
//!
//! `current` is what the terminal shows (as of the last flush); `pending` is
//! the next frame. Flushing writes the difference and then copies `pending`
//! into `current`, so after any flush the two are equal and the next diff is
//! empty until `pending` changes again.
//!
//! Two flush modes:
//!
//! - **Full repaint** ([`DoubleBufferedDisplay::flush`]): erase the screen and
//!   redraw every row up to the last row with content. Used for the first
//!   frame, after [`DoubleBufferedDisplay::invalidate`] (resize, explicit
//!   redraw), and when most of the screen changed anyway.
//! - **Incremental** ([`DoubleBufferedDisplay::flush_diff`]): only changed
//!   cells, one cursor move per discontiguous change, minimal style
//!   transitions.

use std::io::{self, Write};
use std::time::Instant;

use crate::counting_writer::FlushStats;
use crate::diff::FrameDiff;
use crate::escape::EscapeGenerator;
use crate::grid::CellGrid;
use crate::presenter::Presenter;

/// Changed-cell fraction above which a full repaint is cheaper.
pub const DEFAULT_FULL_REDRAW_RATIO: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct DoubleBufferedDisplay {
    current: CellGrid,
    pending: CellGrid,
    invalidated: bool,
    last_content_line: Option<u16>,
    generator: EscapeGenerator,
    sync_output: bool,
    hide_cursor: bool,
    full_redraw_ratio: f32,
    final_cursor: Option<(u16, u16)>,
}

impl DoubleBufferedDisplay {
    /// Starts invalidated: the first flush is always a full repaint.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            current: CellGrid::new(width, height),
            pending: CellGrid::new(width, height),
            invalidated: true,
            last_content_line: None,
            generator: EscapeGenerator::default(),
            sync_output: false,
            hide_cursor: true,
            full_redraw_ratio: DEFAULT_FULL_REDRAW_RATIO,
            final_cursor: None,
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: EscapeGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Wrap every flush in DEC 2026 synchronized output.
    #[must_use]
    pub fn with_sync_output(mut self, enabled: bool) -> Self {
        self.sync_output = enabled;
        self
    }

    #[must_use]
    pub fn with_hide_cursor(mut self, hide: bool) -> Self {
        self.hide_cursor = hide;
        self
    }

    /// Clamped to `[0, 1]`. 0 always repaints fully, 1 never does unless
    /// invalidated.
    #[must_use]
    pub fn with_full_redraw_ratio(mut self, ratio: f32) -> Self {
        self.full_redraw_ratio = if ratio.is_nan() {
            DEFAULT_FULL_REDRAW_RATIO
        } else {
            ratio.clamp(0.0, 1.0)
        };
        self
    }

    /// Where [`Self::present`] leaves the cursor (shown) after each frame.
    pub fn set_final_cursor(&mut self, cursor: Option<(u16, u16)>) {
        self.final_cursor = cursor;
    }

    #[inline]
    pub fn generator(&self) -> EscapeGenerator {
        self.generator
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.pending.width()
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.pending.height()
    }

    /// What the terminal shows.
    #[inline]
    pub fn current(&self) -> &CellGrid {
        &self.current
    }

    /// The next frame.
    #[inline]
    pub fn pending(&self) -> &CellGrid {
        &self.pending
    }

    /// Copy a composited frame into `pending`. A frame of a different size
    /// resizes both buffers and forces a full repaint.
    pub fn update_from_composite(&mut self, composite: &CellGrid) {
        if composite.width() != self.pending.width() || composite.height() != self.pending.height()
        {
            self.current.resize(composite.width(), composite.height());
            self.invalidate();
        }
        self.pending.sync_from(composite);
        self.last_content_line = scan_last_content_line(&self.pending);
    }

    /// Cells that differ between `current` and `pending`.
    pub fn get_diff(&self) -> FrameDiff {
        FrameDiff::compute(&self.current, &self.pending)
    }

    /// Lowest row of `pending` holding anything but default blanks.
    #[inline]
    pub fn last_content_line(&self) -> Option<u16> {
        self.last_content_line
    }

    /// Rows from the top through the last content line.
    #[inline]
    pub fn last_content_height(&self) -> u16 {
        self.last_content_line.map_or(0, |y| y + 1)
    }

    /// Force the next flush to be a full repaint.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Mark all of `pending` dirty and force a full repaint.
    pub fn mark_all_dirty(&mut self) {
        self.pending.mark_all_dirty();
        self.invalidate();
    }

    #[inline]
    pub fn needs_full_repaint(&self) -> bool {
        self.invalidated
    }

    /// Resize both buffers (keeping the overlap) and invalidate.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.current.resize(width, height);
        self.pending.resize(width, height);
        self.last_content_line = scan_last_content_line(&self.pending);
        self.invalidate();
    }

    /// Full repaint when invalidated or when too much changed, otherwise an
    /// incremental update. Uses the final cursor set with
    /// [`Self::set_final_cursor`].
    pub fn present<W: Write>(&mut self, w: &mut W) -> io::Result<FlushStats> {
        if self.invalidated {
            return self.flush(w, self.final_cursor);
        }
        let diff = self.get_diff();
        let area = self.pending.width() as usize * self.pending.height() as usize;
        if area > 0 && diff.len() as f32 / area as f32 > self.full_redraw_ratio {
            stratum_core::debug!(changes = diff.len(), area, "diff too large, repainting");
            return self.flush(w, self.final_cursor);
        }
        self.flush_changes(w, &diff)
    }

    /// Clear the screen and redraw `pending` row by row, then leave the
    /// cursor at `final_cursor` (shown) if given.
    pub fn flush<W: Write>(
        &mut self,
        w: &mut W,
        final_cursor: Option<(u16, u16)>,
    ) -> io::Result<FlushStats> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "flush",
            mode = "full",
            width = self.pending.width(),
            height = self.pending.height()
        )
        .entered();

        let start = Instant::now();
        let mut p = Presenter::new(w, self.generator);
        if self.sync_output {
            p.sync_begin()?;
        }
        if self.hide_cursor {
            p.hide_cursor()?;
        }
        p.clear_screen()?;

        let mut rows = 0;
        if let Some(last) = self.last_content_line {
            for y in 0..=last {
                let Some(row) = self.pending.get_row(y) else {
                    break;
                };
                let keep = row.iter().rposition(|c| !c.is_blank()).map_or(0, |i| i + 1);
                if keep > 0 {
                    p.emit_run(0, y, &row[..keep])?;
                    rows += 1;
                }
            }
        }
        self.finish_frame(p, final_cursor, rows, true, start)
    }

    /// Write only the cells that changed since the last flush.
    pub fn flush_diff<W: Write>(&mut self, w: &mut W) -> io::Result<FlushStats> {
        let diff = self.get_diff();
        self.flush_changes(w, &diff)
    }

    fn flush_changes<W: Write>(&mut self, w: &mut W, diff: &FrameDiff) -> io::Result<FlushStats> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("flush", mode = "diff", changes = diff.len()).entered();

        let start = Instant::now();
        if diff.is_empty() {
            self.commit();
            return Ok(FlushStats {
                duration: start.elapsed(),
                ..FlushStats::default()
            });
        }

        let mut p = Presenter::new(w, self.generator);
        if self.sync_output {
            p.sync_begin()?;
        }
        if self.hide_cursor {
            p.hide_cursor()?;
        }
        let runs = diff.runs();
        for run in &runs {
            if let Some(row) = self.pending.get_row(run.y) {
                p.emit_run(run.x0, run.y, &row[run.x0 as usize..=run.x1 as usize])?;
            }
        }
        self.finish_frame(p, self.final_cursor, runs.len(), false, start)
    }

    fn finish_frame<W: Write>(
        &mut self,
        mut p: Presenter<W>,
        final_cursor: Option<(u16, u16)>,
        run_count: usize,
        full_repaint: bool,
        start: Instant,
    ) -> io::Result<FlushStats> {
        p.reset_style()?;
        if let Some((x, y)) = final_cursor {
            p.move_to(x, y)?;
            p.show_cursor()?;
        }
        if self.sync_output {
            p.sync_end()?;
        }
        let cells_changed = p.cells_written();
        let escapes_emitted = p.escapes_written();
        let bytes_emitted = p.finish()?;
        self.commit();

        let stats = FlushStats {
            full_repaint,
            cells_changed,
            run_count,
            bytes_emitted,
            escapes_emitted,
            duration: start.elapsed(),
        };
        stats.log();
        Ok(stats)
    }

    fn commit(&mut self) {
        self.current.clone_from(&self.pending);
        self.current.mark_clean();
        self.pending.mark_clean();
        self.invalidated = false;
    }
}

fn scan_last_content_line(grid: &CellGrid) -> Option<u16> {
    (0..grid.height())
        .rev()
        .find(|&y| grid.get_row(y).is_some_and(|row| row.iter().any(|c| !c.is_blank())))
}
