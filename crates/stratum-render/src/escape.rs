#![forbid(unsafe_code)]

//! Escape-sequence generation and its inverse.
//!
//! Generation works on [`SgrState`], the visible style of a cell (fg, bg,
//! attributes). Moving from one style to another emits only what changed,
//! except when the target *drops* an attribute or a color the source had:
//! then a single `ESC[0m` is emitted followed by the target's full style.
//! That keeps the bold/dim shared-off-code trap and per-terminal off-code
//! quirks out of the picture.
//!
//! The inverse side tokenizes strings into text, SGR, and other escape
//! sequences ([`AnsiSegments`]); `strip_ansi` and `visible_length` are built
//! on it, and so is the SGR interpretation in `CellGrid::write_string`.
//!
//! ```text
//! visible_length(strip_ansi(s)) == visible_length(s)
//! strip_ansi(cell_to_ansi(c))   == c.display_char()
//! ```

use std::borrow::Cow;
use std::io::{self, Write};

use smallvec::SmallVec;
use stratum_core::terminal_capabilities::ColorDepth;
use stratum_core::text_width::display_width;

use crate::ansi::{self, FLAG_CODES};
use crate::cell::{Cell, CellPatch, StyleFlags};
use crate::color::{ANSI16_PALETTE, PackedRgba};
use crate::grid::CellGrid;

pub type SgrParams = SmallVec<[u16; 16]>;

/// The visible style of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SgrState {
    pub fg: PackedRgba,
    pub bg: PackedRgba,
    pub attrs: StyleFlags,
}

impl SgrState {
    /// Terminal defaults: no colors, no attributes.
    pub const DEFAULT: Self = Self {
        fg: PackedRgba::TRANSPARENT,
        bg: PackedRgba::TRANSPARENT,
        attrs: StyleFlags::empty(),
    };

    #[inline]
    pub fn of(cell: &Cell) -> Self {
        Self {
            fg: cell.fg,
            bg: cell.bg,
            attrs: cell.attrs,
        }
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Style a patch would produce on a default cell.
    pub fn from_patch(patch: &CellPatch) -> Self {
        Self {
            fg: patch.fg.unwrap_or(PackedRgba::TRANSPARENT),
            bg: patch.bg.unwrap_or(PackedRgba::TRANSPARENT),
            attrs: patch.attrs.unwrap_or_default(),
        }
    }

    /// `base` with every field that differs from `base_state` overridden.
    pub fn to_patch(&self, base: &CellPatch, base_state: &SgrState) -> CellPatch {
        let mut patch = *base;
        if self.fg != base_state.fg {
            patch.fg = Some(self.fg);
        }
        if self.bg != base_state.bg {
            patch.bg = Some(self.bg);
        }
        if self.attrs != base_state.attrs {
            patch.attrs = Some(self.attrs);
        }
        patch
    }

    /// Interpret SGR parameters. Code 0 (and an empty list) restores `reset`.
    pub fn apply(&mut self, params: &[u16], reset: &SgrState) {
        if params.is_empty() {
            *self = *reset;
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let code = params[i];
            match code {
                0 => *self = *reset,
                1 => self.attrs.insert(StyleFlags::BOLD),
                2 => self.attrs.insert(StyleFlags::DIM),
                3 => self.attrs.insert(StyleFlags::ITALIC),
                4 => self.attrs.insert(StyleFlags::UNDERLINE),
                5 | 6 => self.attrs.insert(StyleFlags::BLINK),
                7 => self.attrs.insert(StyleFlags::REVERSE),
                8 => self.attrs.insert(StyleFlags::HIDDEN),
                9 => self.attrs.insert(StyleFlags::STRIKETHROUGH),
                21 | 22 => self.attrs.remove(StyleFlags::BOLD | StyleFlags::DIM),
                23 => self.attrs.remove(StyleFlags::ITALIC),
                24 => self.attrs.remove(StyleFlags::UNDERLINE),
                25 => self.attrs.remove(StyleFlags::BLINK),
                27 => self.attrs.remove(StyleFlags::REVERSE),
                28 => self.attrs.remove(StyleFlags::HIDDEN),
                29 => self.attrs.remove(StyleFlags::STRIKETHROUGH),
                30..=37 => self.fg = ANSI16_PALETTE[(code - 30) as usize],
                39 => self.fg = PackedRgba::TRANSPARENT,
                40..=47 => self.bg = ANSI16_PALETTE[(code - 40) as usize],
                49 => self.bg = PackedRgba::TRANSPARENT,
                90..=97 => self.fg = ANSI16_PALETTE[(code - 90 + 8) as usize],
                100..=107 => self.bg = ANSI16_PALETTE[(code - 100 + 8) as usize],
                38 | 48 => {
                    if let Some(color) = extended_color(params, &mut i) {
                        if code == 38 {
                            self.fg = color;
                        } else {
                            self.bg = color;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
}

fn extended_color(params: &[u16], i: &mut usize) -> Option<PackedRgba> {
    match params.get(*i + 1)? {
        5 => {
            let idx = *params.get(*i + 2)?;
            *i += 2;
            Some(PackedRgba::from_ansi256(idx.min(255) as u8))
        }
        2 => {
            let channel = |k: usize| params.get(*i + k).map(|v| (*v).min(255) as u8);
            let color = PackedRgba::rgb(channel(2)?, channel(3)?, channel(4)?);
            *i += 4;
            Some(color)
        }
        _ => None,
    }
}

/// Builds escape sequences for a given color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscapeGenerator {
    pub color_depth: ColorDepth,
}

impl EscapeGenerator {
    pub const fn new(color_depth: ColorDepth) -> Self {
        Self { color_depth }
    }

    fn push_color(&self, params: &mut SgrParams, color: PackedRgba, background: bool) {
        let base = if background { 10 } else { 0 };
        if color.is_transparent() {
            params.push(39 + base);
            return;
        }
        match self.color_depth {
            ColorDepth::NoColor => {}
            ColorDepth::Ansi16 => {
                let idx = color.to_ansi16() as u16;
                params.push(if idx < 8 { 30 + base + idx } else { 90 + base + idx - 8 });
            }
            ColorDepth::Ansi256 => {
                params.extend_from_slice(&[38 + base, 5, color.to_ansi256() as u16]);
            }
            ColorDepth::TrueColor => params.extend_from_slice(&[
                38 + base,
                2,
                color.r() as u16,
                color.g() as u16,
                color.b() as u16,
            ]),
        }
    }

    /// Parameters for one color, or nothing if the terminal shows no color
    /// or the color is the default.
    fn color_params(&self, color: PackedRgba, background: bool) -> SgrParams {
        let mut params = SgrParams::new();
        if self.color_depth != ColorDepth::NoColor && !color.is_transparent() {
            self.push_color(&mut params, color, background);
        }
        params
    }

    /// Everything needed to go from the terminal default to `style`.
    pub fn style_params(&self, style: &SgrState) -> SgrParams {
        let mut params = SgrParams::new();
        for (flag, code) in FLAG_CODES {
            if style.attrs.contains(flag) {
                params.push(code);
            }
        }
        params.extend(self.color_params(style.fg, false));
        params.extend(self.color_params(style.bg, true));
        params
    }

    /// Minimal parameters to move the terminal from `from` to `to`.
    pub fn transition_params(&self, from: &SgrState, to: &SgrState) -> SgrParams {
        let fg_from = self.color_params(from.fg, false);
        let fg_to = self.color_params(to.fg, false);
        let bg_from = self.color_params(from.bg, true);
        let bg_to = self.color_params(to.bg, true);

        let drops_attr = !(from.attrs - to.attrs).is_empty();
        let drops_fg = !fg_from.is_empty() && fg_to.is_empty();
        let drops_bg = !bg_from.is_empty() && bg_to.is_empty();

        let mut params = SgrParams::new();
        if drops_attr || drops_fg || drops_bg {
            params.push(0);
            params.extend(self.style_params(to));
            return params;
        }
        let added = to.attrs - from.attrs;
        for (flag, code) in FLAG_CODES {
            if added.contains(flag) {
                params.push(code);
            }
        }
        if fg_from != fg_to {
            params.extend(fg_to);
        }
        if bg_from != bg_to {
            params.extend(bg_to);
        }
        params
    }

    /// One cell as a self-contained styled string.
    pub fn cell_to_ansi(&self, cell: &Cell) -> String {
        if cell.is_continuation() {
            return String::new();
        }
        let params = self.style_params(&SgrState::of(cell));
        let mut out = String::new();
        push_sgr(&mut out, &params);
        out.push(cell.display_char());
        if !params.is_empty() {
            out.push_str("\x1b[0m");
        }
        out
    }

    /// Escape codes only (no character) to restyle from `from` to `to`.
    pub fn transition_codes(&self, from: &Cell, to: &Cell) -> String {
        let mut out = String::new();
        push_sgr(
            &mut out,
            &self.transition_params(&SgrState::of(from), &SgrState::of(to)),
        );
        out
    }

    /// A run of cells, starting and ending at the terminal default style.
    pub fn line_to_ansi(&self, cells: &[Cell]) -> String {
        let mut out = String::with_capacity(cells.len());
        let mut state = SgrState::DEFAULT;
        for cell in cells.iter().filter(|c| !c.is_continuation()) {
            let next = SgrState::of(cell);
            push_sgr(&mut out, &self.transition_params(&state, &next));
            state = next;
            out.push(cell.display_char());
        }
        if !self.style_params(&state).is_empty() {
            out.push_str("\x1b[0m");
        }
        out
    }

    /// Every row of `grid` through [`Self::line_to_ansi`], joined by `\n`.
    /// Trailing blank cells of each row are dropped.
    pub fn buffer_to_ansi(&self, grid: &CellGrid) -> String {
        (0..grid.height())
            .filter_map(|y| grid.get_row(y))
            .map(|row| {
                let keep = row.iter().rposition(|c| !c.is_blank()).map_or(0, |i| i + 1);
                self.line_to_ansi(&row[..keep])
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stream form of [`Self::transition_params`].
    pub fn write_transition<W: Write>(
        &self,
        w: &mut W,
        from: &SgrState,
        to: &SgrState,
    ) -> io::Result<()> {
        ansi::sgr_params(w, &self.transition_params(from, to))
    }
}

fn push_sgr(out: &mut String, params: &[u16]) {
    if params.is_empty() {
        return;
    }
    out.push_str("\x1b[");
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&p.to_string());
    }
    out.push('m');
}

/// True-color [`EscapeGenerator::cell_to_ansi`].
pub fn cell_to_ansi(cell: &Cell) -> String {
    EscapeGenerator::default().cell_to_ansi(cell)
}

/// True-color [`EscapeGenerator::transition_codes`].
pub fn transition_codes(from: &Cell, to: &Cell) -> String {
    EscapeGenerator::default().transition_codes(from, to)
}

/// True-color [`EscapeGenerator::line_to_ansi`].
pub fn line_to_ansi(cells: &[Cell]) -> String {
    EscapeGenerator::default().line_to_ansi(cells)
}

/// True-color [`EscapeGenerator::buffer_to_ansi`].
pub fn buffer_to_ansi(grid: &CellGrid) -> String {
    EscapeGenerator::default().buffer_to_ansi(grid)
}

// ----- parsing -----

/// A piece of a string that may contain escape sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Printable text (may still contain C0 controls other than ESC).
    Text(&'a str),
    /// `ESC [ ... m` with its numeric parameters (empty fields read as 0).
    Sgr(SgrParams),
    /// Any other escape sequence, consumed and ignored.
    Other,
}

/// Iterator splitting a string at escape sequences.
///
/// Recognizes CSI (`ESC [` params intermediates final), OSC (`ESC ]` up to
/// BEL or `ESC \`), and two-character escapes. An unterminated sequence runs
/// to the end of the input.
#[derive(Debug, Clone)]
pub struct AnsiSegments<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> AnsiSegments<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }

    fn scan_csi(&mut self, start: usize) -> Segment<'a> {
        let bytes = self.s.as_bytes();
        let mut i = start;
        let mut private = false;
        while i < bytes.len() && (0x30..=0x3F).contains(&bytes[i]) {
            if matches!(bytes[i], b'<' | b'=' | b'>' | b'?') {
                private = true;
            }
            i += 1;
        }
        let params_end = i;
        while i < bytes.len() && (0x20..=0x2F).contains(&bytes[i]) {
            i += 1;
        }
        if i < bytes.len() && (0x40..=0x7E).contains(&bytes[i]) {
            let final_byte = bytes[i];
            let intermediates = i > params_end;
            self.pos = i + 1;
            if final_byte == b'm' && !private && !intermediates {
                return Segment::Sgr(parse_params(&self.s[start..params_end]));
            }
            return Segment::Other;
        }
        // Malformed: resume at the offending byte so the text after it survives.
        self.pos = i;
        Segment::Other
    }

    fn scan_osc(&mut self, start: usize) -> Segment<'a> {
        let bytes = self.s.as_bytes();
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                0x07 => {
                    self.pos = i + 1;
                    return Segment::Other;
                }
                0x1B if bytes.get(i + 1) == Some(&b'\\') => {
                    self.pos = i + 2;
                    return Segment::Other;
                }
                _ => i += 1,
            }
        }
        self.pos = bytes.len();
        Segment::Other
    }
}

fn parse_params(raw: &str) -> SgrParams {
    raw.split([';', ':'])
        .map(|p| p.parse::<u32>().map_or(0, |v| v.min(u16::MAX as u32) as u16))
        .collect()
}

impl<'a> Iterator for AnsiSegments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let bytes = self.s.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        if bytes[self.pos] != 0x1B {
            let end = memchr::memchr(0x1B, &bytes[self.pos..]).map_or(bytes.len(), |i| self.pos + i);
            let text = &self.s[self.pos..end];
            self.pos = end;
            return Some(Segment::Text(text));
        }
        let after = self.pos + 1;
        Some(match bytes.get(after) {
            Some(b'[') => self.scan_csi(after + 1),
            Some(b']') => self.scan_osc(after + 1),
            Some(_) => {
                let len = self.s[after..].chars().next().map_or(1, char::len_utf8);
                self.pos = after + len;
                Segment::Other
            }
            None => {
                self.pos = after;
                Segment::Other
            }
        })
    }
}

/// Remove every escape sequence, keeping the printable text.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if memchr::memchr(0x1B, s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    for segment in AnsiSegments::new(s) {
        if let Segment::Text(text) = segment {
            out.push_str(text);
        }
    }
    Cow::Owned(out)
}

/// On-screen width of `s`, ignoring escape sequences.
pub fn visible_length(s: &str) -> usize {
    display_width(&strip_ansi(s))
}
