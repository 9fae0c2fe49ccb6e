#![forbid(unsafe_code)]

//! Presenter: state-tracked escape-sequence emission.
//!
//! The presenter sits between the display and the output stream. It
//! remembers where the terminal cursor is and which style is active, so a
//! cursor move is written only when the next cell is somewhere else and a
//! style change only carries the codes that differ.
//!
//! Output is buffered and counted; [`Presenter::finish`] flushes once per
//! frame and reports the bytes written.
//!
//! # Usage
//!
//! ```
//! use stratum_render::cell::Cell;
//! use stratum_render::escape::EscapeGenerator;
//! use stratum_render::presenter::Presenter;
//!
//! let mut out = Vec::new();
//! let mut presenter = Presenter::new(&mut out, EscapeGenerator::default());
//! presenter.move_to(2, 0).unwrap();
//! presenter.emit_cell(&Cell::from_char('x')).unwrap();
//! presenter.reset_style().unwrap();
//! let written = presenter.finish().unwrap();
//! assert_eq!(written, out.len() as u64);
//! ```

use std::io::{self, BufWriter, Write};

use crate::ansi::{self, EraseDisplayMode};
use crate::cell::Cell;
use crate::counting_writer::CountingWriter;
use crate::escape::{EscapeGenerator, SgrState};

const BUFFER_CAPACITY: usize = 64 * 1024;

pub struct Presenter<W: Write> {
    writer: CountingWriter<BufWriter<W>>,
    generator: EscapeGenerator,
    /// Active terminal style.
    style: SgrState,
    /// Terminal cursor (x, y); `None` when unknown.
    cursor: Option<(u16, u16)>,
    cells_written: usize,
}

impl<W: Write> Presenter<W> {
    /// Assumes the terminal is at default style (every frame ends with a
    /// reset) and that the cursor position is unknown.
    pub fn new(writer: W, generator: EscapeGenerator) -> Self {
        Self {
            writer: CountingWriter::new(BufWriter::with_capacity(BUFFER_CAPACITY, writer)),
            generator,
            style: SgrState::DEFAULT,
            cursor: None,
            cells_written: 0,
        }
    }

    #[inline]
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    #[inline]
    pub fn cells_written(&self) -> usize {
        self.cells_written
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    #[inline]
    pub fn escapes_written(&self) -> u64 {
        self.writer.escapes_written()
    }

    /// `CUP` to `(x, y)` unless the cursor is already there.
    pub fn move_to(&mut self, x: u16, y: u16) -> io::Result<()> {
        if self.cursor == Some((x, y)) {
            return Ok(());
        }
        ansi::cup(&mut self.writer, y, x)?;
        self.cursor = Some((x, y));
        Ok(())
    }

    /// Write one cell at the cursor. Continuation cells are skipped: the
    /// terminal already advanced past them when the head was written.
    pub fn emit_cell(&mut self, cell: &Cell) -> io::Result<()> {
        if cell.is_continuation() {
            return Ok(());
        }
        self.apply_style(SgrState::of(cell))?;

        let mut buf = [0u8; 4];
        self.writer
            .write_all(cell.display_char().encode_utf8(&mut buf).as_bytes())?;
        self.cells_written += 1;

        if let Some((x, y)) = self.cursor {
            self.cursor = Some((x.saturating_add(cell.content.width() as u16), y));
        }
        Ok(())
    }

    /// Write `cells` left to right starting at `(x, y)`.
    pub fn emit_run(&mut self, x: u16, y: u16, cells: &[Cell]) -> io::Result<()> {
        self.move_to(x, y)?;
        cells.iter().try_for_each(|cell| self.emit_cell(cell))
    }

    fn apply_style(&mut self, next: SgrState) -> io::Result<()> {
        if self.style == next {
            return Ok(());
        }
        self.generator.write_transition(&mut self.writer, &self.style, &next)?;
        self.style = next;
        Ok(())
    }

    /// Return to the terminal default style.
    pub fn reset_style(&mut self) -> io::Result<()> {
        ansi::sgr_reset(&mut self.writer)?;
        self.style = SgrState::DEFAULT;
        Ok(())
    }

    /// Reset style, erase the display, and home the cursor.
    pub fn clear_screen(&mut self) -> io::Result<()> {
        self.reset_style()?;
        ansi::erase_display(&mut self.writer, EraseDisplayMode::All)?;
        ansi::cup(&mut self.writer, 0, 0)?;
        self.cursor = Some((0, 0));
        Ok(())
    }

    pub fn hide_cursor(&mut self) -> io::Result<()> {
        ansi::cursor_hide(&mut self.writer)
    }

    pub fn show_cursor(&mut self) -> io::Result<()> {
        ansi::cursor_show(&mut self.writer)
    }

    pub fn sync_begin(&mut self) -> io::Result<()> {
        ansi::sync_begin(&mut self.writer)
    }

    pub fn sync_end(&mut self) -> io::Result<()> {
        ansi::sync_end(&mut self.writer)
    }

    /// Flush buffered output; returns the bytes written this frame.
    pub fn finish(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        Ok(self.writer.bytes_written())
    }
}
