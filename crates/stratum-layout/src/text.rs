#![forbid(unsafe_code)]

//! Text wrapping and measurement for text nodes.
//!
//! Widths are visible cell widths: escape sequences count for nothing, wide
//! characters count for two, and grapheme clusters are never split. SGR
//! sequences embedded in the text travel with the characters they style,
//! and a style that is still active at a line break is re-opened at the
//! start of the next line so every wrapped line can be written on its own.
//!
//! ```
//! use stratum_layout::text::{wrap_text, WrapMode};
//!
//! let lines = wrap_text("Hello world foo bar", 10, WrapMode::Word);
//! assert_eq!(lines, vec!["Hello", "world foo", "bar"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;

use stratum_core::text_width::grapheme_width;
use stratum_render::escape::{AnsiSegments, Segment, visible_length};

/// Text wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// No wrapping; lines may exceed the width.
    None,
    /// Wrap at word boundaries; an over-long word stays whole on its own line.
    #[default]
    Word,
    /// Wrap at grapheme boundaries.
    Char,
    /// Word wrap, breaking over-long words at grapheme boundaries.
    WordChar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Columns to skip before a line of `line_width` inside `box_width`.
pub fn align_offset(align: TextAlign, line_width: usize, box_width: usize) -> usize {
    let free = box_width.saturating_sub(line_width);
    match align {
        TextAlign::Left => 0,
        TextAlign::Center => free / 2,
        TextAlign::Right => free,
    }
}

/// Widest visible line.
pub fn max_line_width<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .map(|l| visible_length(l.as_ref()))
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
enum Piece {
    Grapheme { text: String, width: usize, blank: bool },
    Sgr(String),
}

impl Piece {
    fn width(&self) -> usize {
        match self {
            Self::Grapheme { width, .. } => *width,
            Self::Sgr(_) => 0,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Grapheme { blank: true, .. })
    }
}

/// Split one paragraph into graphemes and SGR sequences. Other escape
/// sequences and zero-width controls are dropped.
fn pieces(paragraph: &str) -> Vec<Piece> {
    let mut out = Vec::new();
    for segment in AnsiSegments::new(paragraph) {
        match segment {
            Segment::Text(text) => {
                for g in text.graphemes(true) {
                    let width = grapheme_width(g);
                    let blank = g.chars().all(char::is_whitespace);
                    if width == 0 && !blank {
                        continue;
                    }
                    // Tabs and other whitespace controls measure zero; they
                    // still separate words, as a single space.
                    let (text, width) = if blank && width == 0 {
                        (" ".to_string(), 1)
                    } else {
                        (g.to_string(), width)
                    };
                    out.push(Piece::Grapheme { text, width, blank });
                }
            }
            Segment::Sgr(params) => {
                let joined: Vec<String> = params.iter().map(u16::to_string).collect();
                out.push(Piece::Sgr(format!("\x1b[{}m", joined.join(";"))));
            }
            Segment::Other => {}
        }
    }
    out
}

fn is_reset(sgr: &str) -> bool {
    sgr == "\x1b[m" || sgr == "\x1b[0m"
}

/// Accumulates wrapped lines, carrying open SGR state across breaks.
struct LineBuilder {
    lines: Vec<String>,
    current: Vec<Piece>,
    width: usize,
    /// SGR sequences in effect at the start of `current`.
    open_at_start: Vec<String>,
    /// SGR sequences in effect after the last piece pushed.
    open: Vec<String>,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            width: 0,
            open_at_start: Vec::new(),
            open: Vec::new(),
        }
    }

    fn push(&mut self, piece: Piece) {
        if let Piece::Sgr(seq) = &piece {
            if is_reset(seq) {
                self.open.clear();
            } else {
                self.open.push(seq.clone());
            }
        }
        self.width += piece.width();
        self.current.push(piece);
    }

    fn has_text(&self) -> bool {
        self.current
            .iter()
            .any(|p| matches!(p, Piece::Grapheme { .. }))
    }

    /// Close the current line, trimming trailing blanks.
    fn break_line(&mut self) {
        if let Some(last_visible) = self.current.iter().rposition(|p| !p.is_blank() && p.width() > 0)
        {
            let mut keep = Vec::with_capacity(self.current.len());
            for (i, piece) in self.current.drain(..).enumerate() {
                if i <= last_visible || matches!(piece, Piece::Sgr(_)) {
                    keep.push(piece);
                }
            }
            self.current = keep;
        } else {
            self.current.retain(|p| matches!(p, Piece::Sgr(_)));
        }

        let mut line: String = self.open_at_start.concat();
        for piece in self.current.drain(..) {
            match piece {
                Piece::Grapheme { text, .. } => line.push_str(&text),
                Piece::Sgr(seq) => line.push_str(&seq),
            }
        }
        if !self.open.is_empty() {
            line.push_str("\x1b[0m");
        }
        self.lines.push(line);
        self.width = 0;
        self.open_at_start = self.open.clone();
    }

    fn finish(mut self) -> Vec<String> {
        if self.has_text() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

/// Group pieces into alternating runs of blank and non-blank graphemes.
/// SGR pieces stay with the run in progress.
fn words(pieces: Vec<Piece>) -> Vec<Vec<Piece>> {
    let mut words: Vec<Vec<Piece>> = Vec::new();
    let mut current: Vec<Piece> = Vec::new();
    let mut current_blank: Option<bool> = None;

    for piece in pieces {
        if let Piece::Grapheme { blank, .. } = piece {
            if current_blank.is_some_and(|b| b != blank) {
                words.push(std::mem::take(&mut current));
            }
            current_blank = Some(blank);
        }
        current.push(piece);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn run_width(run: &[Piece]) -> usize {
    run.iter().map(Piece::width).sum()
}

fn run_is_blank(run: &[Piece]) -> bool {
    run.iter()
        .filter(|p| matches!(p, Piece::Grapheme { .. }))
        .all(Piece::is_blank)
}

fn wrap_paragraph(out: &mut LineBuilder, paragraph: &str, width: usize, mode: WrapMode) {
    let pieces = pieces(paragraph);
    match mode {
        WrapMode::None => pieces.into_iter().for_each(|p| out.push(p)),
        WrapMode::Char => {
            for piece in pieces {
                if piece.width() > 0 && out.width + piece.width() > width && out.width > 0 {
                    out.break_line();
                    if piece.is_blank() {
                        continue;
                    }
                }
                out.push(piece);
            }
        }
        WrapMode::Word | WrapMode::WordChar => {
            for word in words(pieces) {
                let word_width = run_width(&word);
                if out.width + word_width <= width {
                    word.into_iter().for_each(|p| out.push(p));
                    continue;
                }
                if run_is_blank(&word) {
                    // Whitespace at a break is dropped.
                    if out.width > 0 {
                        out.break_line();
                    }
                    word.into_iter()
                        .filter(|p| matches!(p, Piece::Sgr(_)))
                        .for_each(|p| out.push(p));
                    continue;
                }
                if out.width > 0 {
                    out.break_line();
                }
                if word_width <= width || mode == WrapMode::Word {
                    word.into_iter().for_each(|p| out.push(p));
                    continue;
                }
                for piece in word {
                    if piece.width() > 0 && out.width + piece.width() > width && out.width > 0 {
                        out.break_line();
                    }
                    out.push(piece);
                }
            }
        }
    }
}

/// Wrap `text` to `width` columns.
///
/// Embedded newlines always break. A width of zero disables wrapping.
/// Always returns at least one line.
pub fn wrap_text(text: &str, width: usize, mode: WrapMode) -> Vec<String> {
    let mode = if width == 0 { WrapMode::None } else { mode };
    let mut out = LineBuilder::new();
    for (i, paragraph) in text.split('\n').enumerate() {
        if i > 0 {
            out.break_line();
        }
        wrap_paragraph(&mut out, paragraph.strip_suffix('\r').unwrap_or(paragraph), width, mode);
    }
    out.finish()
}
