#![forbid(unsafe_code)]

//! Visible-width measurement.
//!
//! Terminal cells are not bytes and not chars: CJK ideographs and most emoji
//! occupy two columns, combining marks and joiners occupy none. Layout,
//! grids, and the escape generator all measure through these functions so
//! they agree on where the cursor ends up.

use unicode_display_width::{is_double_width, width as unicode_display_width};
use unicode_segmentation::UnicodeSegmentation;

#[inline]
fn printable_ascii_len(text: &str) -> Option<usize> {
    text.bytes()
        .all(|b| (0x20..=0x7E).contains(&b))
        .then_some(text.len())
}

#[inline]
fn is_zero_width(c: char) -> bool {
    let u = c as u32;
    matches!(u, 0x0000..=0x001F | 0x007F..=0x009F)
        || matches!(u, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
        || matches!(u, 0xFE00..=0xFE0F | 0xFE20..=0xFE2F | 0xE0100..=0xE01EF)
        || matches!(
            u,
            0x00AD | 0x034F | 0x180E | 0x200B..=0x200F | 0x2060 | 0xFEFF
        )
        || matches!(u, 0x202A..=0x202E | 0x2066..=0x206F)
}

#[inline]
fn is_probable_emoji(c: char) -> bool {
    let u = c as u32;
    matches!(
        u,
        0x1F000..=0x1FAFF | 0x2300..=0x23FF | 0x2600..=0x27BF | 0x2B00..=0x2BFF
    ) && u != 0x2764
}

/// Width of a single grapheme cluster.
pub fn grapheme_width(grapheme: &str) -> usize {
    if let Some(n) = printable_ascii_len(grapheme) {
        return n;
    }
    if grapheme.chars().all(is_zero_width) {
        return 0;
    }
    if grapheme.chars().any(|c| c as u32 == 0xFE0F || is_probable_emoji(c)) {
        return 2;
    }
    unicode_display_width(grapheme) as usize
}

/// Width of a single scalar value. Control characters measure zero.
pub fn char_width(ch: char) -> usize {
    if ch.is_ascii() {
        return if (' '..='~').contains(&ch) { 1 } else { 0 };
    }
    if is_zero_width(ch) {
        0
    } else if is_double_width(ch) || is_probable_emoji(ch) {
        2
    } else {
        1
    }
}

/// Visible width of a string. Escape sequences are NOT stripped here; call
/// through the escape generator's `visible_length` for styled text.
pub fn display_width(text: &str) -> usize {
    if let Some(n) = printable_ascii_len(text) {
        return n;
    }
    if text.is_ascii() {
        return text.bytes().filter(|b| (0x20..=0x7E).contains(b)).count();
    }
    if !text.chars().any(|c| is_zero_width(c) || is_probable_emoji(c)) {
        return unicode_display_width(text) as usize;
    }
    text.graphemes(true).map(grapheme_width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_counts_bytes() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn controls_are_zero_width() {
        assert_eq!(display_width("a\tb"), 2);
        assert_eq!(char_width('\n'), 0);
        assert_eq!(char_width('\u{200B}'), 0);
    }

    #[test]
    fn wide_chars_count_two() {
        assert_eq!(char_width('日'), 2);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(grapheme_width("😀"), 2);
    }

    #[test]
    fn combining_marks_do_not_advance() {
        assert_eq!(display_width("e\u{0301}"), 1);
        assert_eq!(char_width('\u{0301}'), 0);
    }
}
