#![forbid(unsafe_code)]

//! Byte-level ANSI/VT sequence writers.
//!
//! Pure functions over `std::io::Write`; no state is tracked here. The
//! [`crate::presenter::Presenter`] decides *when* to emit, these decide *how*.
//!
//! | Sequence | Meaning |
//! |---|---|
//! | `ESC [ p;p m` | SGR (select graphic rendition) |
//! | `ESC [ row ; col H` | CUP, 1-indexed |
//! | `ESC [ n J` / `ESC [ n K` | erase display / line |
//! | `ESC [ ? 25 l/h` | hide / show cursor |
//! | `ESC [ ? 2026 h/l` | synchronized output begin / end |

use std::io::{self, Write};

use crate::cell::StyleFlags;
use crate::color::PackedRgba;

pub const SGR_RESET: &[u8] = b"\x1b[0m";

#[inline]
pub fn sgr_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SGR_RESET)
}

/// SGR enable code for each attribute, in emission order.
pub const FLAG_CODES: [(StyleFlags, u16); 8] = [
    (StyleFlags::BOLD, 1),
    (StyleFlags::DIM, 2),
    (StyleFlags::ITALIC, 3),
    (StyleFlags::UNDERLINE, 4),
    (StyleFlags::BLINK, 5),
    (StyleFlags::REVERSE, 7),
    (StyleFlags::HIDDEN, 8),
    (StyleFlags::STRIKETHROUGH, 9),
];

/// Write `ESC [ p1;p2;... m`. Nothing is written for an empty list.
pub fn sgr_params<W: Write>(w: &mut W, params: &[u16]) -> io::Result<()> {
    if params.is_empty() {
        return Ok(());
    }
    w.write_all(b"\x1b[")?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            w.write_all(b";")?;
        }
        write!(w, "{p}")?;
    }
    w.write_all(b"m")
}

/// Enable codes for every flag in `flags`, as one sequence.
pub fn sgr_flags<W: Write>(w: &mut W, flags: StyleFlags) -> io::Result<()> {
    let mut params = [0u16; 8];
    let mut n = 0;
    for (flag, code) in FLAG_CODES {
        if flags.contains(flag) {
            params[n] = code;
            n += 1;
        }
    }
    sgr_params(w, &params[..n])
}

/// True-color foreground; transparent selects the default (`39`).
pub fn sgr_fg_packed<W: Write>(w: &mut W, color: PackedRgba) -> io::Result<()> {
    if color.is_transparent() {
        return w.write_all(b"\x1b[39m");
    }
    write!(w, "\x1b[38;2;{};{};{}m", color.r(), color.g(), color.b())
}

/// True-color background; transparent selects the default (`49`).
pub fn sgr_bg_packed<W: Write>(w: &mut W, color: PackedRgba) -> io::Result<()> {
    if color.is_transparent() {
        return w.write_all(b"\x1b[49m");
    }
    write!(w, "\x1b[48;2;{};{};{}m", color.r(), color.g(), color.b())
}

/// Cursor position, taking 0-indexed coordinates.
#[inline]
pub fn cup<W: Write>(w: &mut W, row: u16, col: u16) -> io::Result<()> {
    write!(
        w,
        "\x1b[{};{}H",
        row.saturating_add(1),
        col.saturating_add(1)
    )
}

pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

#[inline]
pub fn cursor_hide<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_HIDE)
}

#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_SHOW)
}

/// Erase Line (EL) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseLineMode {
    ToEnd = 0,
    ToStart = 1,
    All = 2,
}

pub fn erase_line<W: Write>(w: &mut W, mode: EraseLineMode) -> io::Result<()> {
    match mode {
        EraseLineMode::ToEnd => w.write_all(b"\x1b[K"),
        mode => write!(w, "\x1b[{}K", mode as u8),
    }
}

/// Erase Display (ED) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseDisplayMode {
    ToEnd = 0,
    ToStart = 1,
    All = 2,
}

pub fn erase_display<W: Write>(w: &mut W, mode: EraseDisplayMode) -> io::Result<()> {
    match mode {
        EraseDisplayMode::ToEnd => w.write_all(b"\x1b[J"),
        mode => write!(w, "\x1b[{}J", mode as u8),
    }
}

pub const SYNC_BEGIN: &[u8] = b"\x1b[?2026h";
pub const SYNC_END: &[u8] = b"\x1b[?2026l";

#[inline]
pub fn sync_begin<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SYNC_BEGIN)
}

#[inline]
pub fn sync_end<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SYNC_END)
}
