#![forbid(unsafe_code)]

//! Output accounting for a flush.
//!
//! The presenter writes through a [`CountingWriter`], which tallies the
//! bytes that reach the stream and how many of them opened an escape
//! sequence. [`FlushStats`] carries the totals out of the display.

use std::io::{self, Write};
use std::time::Duration;

/// Counts bytes and `ESC` introducers on their way to `inner`.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes: u64,
    escapes: u64,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: 0,
            escapes: 0,
        }
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Escape sequences started so far (one per `ESC` byte).
    #[inline]
    pub fn escapes_written(&self) -> u64 {
        self.escapes
    }

    fn tally(&mut self, written: &[u8]) {
        self.bytes += written.len() as u64;
        self.escapes += memchr::memchr_iter(0x1b, written).count() as u64;
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.tally(&buf[..n]);
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)?;
        self.tally(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// What one flush did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushStats {
    /// Whether the flush repainted the whole screen.
    pub full_repaint: bool,
    /// Cells written (continuations excluded).
    pub cells_changed: usize,
    /// Contiguous changed spans; painted rows for a full repaint.
    pub run_count: usize,
    pub bytes_emitted: u64,
    /// Control sequences among `bytes_emitted` (cursor moves, SGR, modes).
    pub escapes_emitted: u64,
    pub duration: Duration,
}

impl FlushStats {
    /// Output bytes per changed cell; 0.0 when nothing changed.
    pub fn bytes_per_cell(&self) -> f64 {
        if self.cells_changed == 0 {
            0.0
        } else {
            self.bytes_emitted as f64 / self.cells_changed as f64
        }
    }

    pub fn log(&self) {
        stratum_core::debug!(
            full_repaint = self.full_repaint,
            cells = self.cells_changed,
            runs = self.run_count,
            bytes = self.bytes_emitted,
            escapes = self.escapes_emitted,
            micros = self.duration.as_micros() as u64,
            "flush"
        );
    }
}
