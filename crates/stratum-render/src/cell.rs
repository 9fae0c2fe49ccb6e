#![forbid(unsafe_code)]

//! Cells: the unit every grid, layer, and frame is made of.
//!
//! Besides the visual payload (content, colors, attributes) a cell remembers
//! who painted it: the owning node, the layer it lives on, and the z-index the
//! write was made at. Those three fields drive the ownership rule checked by
//! [`CellPatch::may_overwrite`]:
//!
//! ```text
//! allowed  <=>  existing.owner is None
//!           ||  existing.owner == incoming.owner
//!           ||  incoming.z_index >= existing.z_index
//! ```
//!
//! Diffing and compositing ignore the bookkeeping fields; two cells that look
//! the same on screen are equal under [`Cell::bits_eq`].

use crate::color::PackedRgba;
use stratum_core::ids::{LayerId, NodeId};
use stratum_core::text_width::char_width;

bitflags::bitflags! {
    /// Text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        const BOLD          = 0b0000_0001;
        const DIM           = 0b0000_0010;
        const ITALIC        = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const BLINK         = 0b0001_0000;
        /// Swap fg/bg.
        const REVERSE       = 0b0010_0000;
        const STRIKETHROUGH = 0b0100_0000;
        const HIDDEN        = 0b1000_0000;
    }
}

/// Attributes that draw something even on a space.
const SPACE_MARKS: StyleFlags = StyleFlags::UNDERLINE
    .union(StyleFlags::STRIKETHROUGH)
    .union(StyleFlags::REVERSE);

/// What a cell displays: a scalar value, nothing, or the tail of a wide char.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CellContent(u32);

impl CellContent {
    /// Blank. Rendered as a space.
    pub const EMPTY: Self = Self(0);

    /// Second column of a double-width character.
    ///
    /// Outside the Unicode scalar range, so it can never collide with a char.
    pub const CONTINUATION: Self = Self(0x7FFF_FFFF);

    #[inline]
    pub const fn from_char(c: char) -> Self {
        Self(c as u32)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    #[inline]
    pub const fn is_continuation(self) -> bool {
        self.0 == Self::CONTINUATION.0
    }

    /// The character, if this is neither empty nor a continuation.
    #[inline]
    pub fn as_char(self) -> Option<char> {
        if self.is_empty() || self.is_continuation() {
            None
        } else {
            char::from_u32(self.0)
        }
    }

    /// Columns occupied. Empty cells still take one column on screen.
    #[inline]
    pub fn width(self) -> usize {
        if self.is_continuation() {
            0
        } else {
            self.as_char().map_or(1, |c| char_width(c).max(1))
        }
    }
}

impl core::fmt::Debug for CellContent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            f.write_str("Empty")
        } else if self.is_continuation() {
            f.write_str("Continuation")
        } else {
            match self.as_char() {
                Some(c) => write!(f, "{c:?}"),
                None => write!(f, "Invalid({:#x})", self.0),
            }
        }
    }
}

/// One terminal cell plus the bookkeeping needed for ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub content: CellContent,
    pub fg: PackedRgba,
    pub bg: PackedRgba,
    pub attrs: StyleFlags,
    /// Node that painted this cell, `None` for never-painted cells.
    pub owner: Option<NodeId>,
    pub layer: LayerId,
    pub z_index: i32,
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Cell {
    pub const EMPTY: Self = Self {
        content: CellContent::EMPTY,
        fg: PackedRgba::TRANSPARENT,
        bg: PackedRgba::TRANSPARENT,
        attrs: StyleFlags::empty(),
        owner: None,
        layer: LayerId::ROOT,
        z_index: 0,
    };

    #[inline]
    pub const fn from_char(c: char) -> Self {
        Self {
            content: CellContent::from_char(c),
            ..Self::EMPTY
        }
    }

    #[inline]
    pub const fn with_fg(mut self, fg: PackedRgba) -> Self {
        self.fg = fg;
        self
    }

    #[inline]
    pub const fn with_bg(mut self, bg: PackedRgba) -> Self {
        self.bg = bg;
        self
    }

    #[inline]
    pub const fn with_attrs(mut self, attrs: StyleFlags) -> Self {
        self.attrs = attrs;
        self
    }

    #[inline]
    pub const fn with_owner(mut self, owner: NodeId, z_index: i32) -> Self {
        self.owner = Some(owner);
        self.z_index = z_index;
        self
    }

    /// Character shown on screen; blanks render as a space.
    #[inline]
    pub fn display_char(&self) -> char {
        self.content.as_char().unwrap_or(' ')
    }

    #[inline]
    pub const fn is_continuation(&self) -> bool {
        self.content.is_continuation()
    }

    /// Blank content, no colors, no attributes.
    #[inline]
    pub fn is_blank(&self) -> bool {
        (self.content.is_empty() || self.content.as_char() == Some(' '))
            && self.fg.is_transparent()
            && self.bg.is_transparent()
            && self.attrs.is_empty()
    }

    /// Contributes something to compositing: a visible character or a
    /// background. A plain space on a transparent background lets the
    /// layers below show through.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        if !self.bg.is_transparent() {
            return true;
        }
        match self.content.as_char() {
            Some(' ') => self.attrs.intersects(SPACE_MARKS),
            Some(_) => true,
            None => self.content.is_continuation(),
        }
    }

    /// Visual equality: content, colors, and attributes.
    #[inline]
    pub fn bits_eq(&self, other: &Self) -> bool {
        self.content == other.content
            && self.fg == other.fg
            && self.bg == other.bg
            && self.attrs == other.attrs
    }
}

/// A partial cell write.
///
/// `None` fields leave the existing value alone. The writer identity
/// (`owner`, `layer`, `z_index`) is always stamped onto the cell when the
/// write is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellPatch {
    pub ch: Option<char>,
    pub fg: Option<PackedRgba>,
    pub bg: Option<PackedRgba>,
    pub attrs: Option<StyleFlags>,
    pub owner: Option<NodeId>,
    pub layer: LayerId,
    pub z_index: i32,
}

impl CellPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that writes `ch` and nothing else.
    pub fn char(ch: char) -> Self {
        Self {
            ch: Some(ch),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_char(mut self, ch: char) -> Self {
        self.ch = Some(ch);
        self
    }

    #[must_use]
    pub fn fg(mut self, fg: PackedRgba) -> Self {
        self.fg = Some(fg);
        self
    }

    #[must_use]
    pub fn bg(mut self, bg: PackedRgba) -> Self {
        self.bg = Some(bg);
        self
    }

    #[must_use]
    pub fn attrs(mut self, attrs: StyleFlags) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Writer identity.
    #[must_use]
    pub fn owned_by(mut self, owner: NodeId, z_index: i32) -> Self {
        self.owner = Some(owner);
        self.z_index = z_index;
        self
    }

    #[must_use]
    pub fn on_layer(mut self, layer: LayerId) -> Self {
        self.layer = layer;
        self
    }

    /// The ownership rule.
    #[inline]
    pub fn may_overwrite(&self, existing: &Cell) -> bool {
        match existing.owner {
            None => true,
            Some(owner) => self.owner == Some(owner) || self.z_index >= existing.z_index,
        }
    }

    /// Apply onto `cell` without checking ownership.
    pub fn apply_to(&self, cell: &mut Cell) {
        if let Some(ch) = self.ch {
            cell.content = CellContent::from_char(ch);
        }
        if let Some(fg) = self.fg {
            cell.fg = fg;
        }
        if let Some(bg) = self.bg {
            cell.bg = bg;
        }
        if let Some(attrs) = self.attrs {
            cell.attrs = attrs;
        }
        cell.owner = self.owner;
        cell.layer = self.layer;
        cell.z_index = self.z_index;
    }

    /// The cell this patch produces when applied to a blank cell.
    pub fn to_cell(&self) -> Cell {
        let mut cell = Cell::EMPTY;
        self.apply_to(&mut cell);
        cell
    }
}

impl From<Cell> for CellPatch {
    /// A patch that reproduces `cell` entirely, including its identity.
    fn from(cell: Cell) -> Self {
        Self {
            ch: Some(cell.display_char()),
            fg: Some(cell.fg),
            bg: Some(cell.bg),
            attrs: Some(cell.attrs),
            owner: cell.owner,
            layer: cell.layer,
            z_index: cell.z_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_blank_and_unowned() {
        let cell = Cell::default();
        assert!(cell.is_blank());
        assert!(!cell.is_occupied());
        assert_eq!(cell.display_char(), ' ');
        assert_eq!(cell.owner, None);
    }

    #[test]
    fn content_widths() {
        assert_eq!(CellContent::from_char('a').width(), 1);
        assert_eq!(CellContent::from_char('日').width(), 2);
        assert_eq!(CellContent::EMPTY.width(), 1);
        assert_eq!(CellContent::CONTINUATION.width(), 0);
        assert_eq!(CellContent::CONTINUATION.as_char(), None);
    }

    #[test]
    fn bits_eq_ignores_bookkeeping() {
        let a = Cell::from_char('x').with_owner(NodeId(1), 5);
        let b = Cell::from_char('x').with_owner(NodeId(2), -1);
        assert!(a.bits_eq(&b));
        assert_ne!(a, b);
        assert!(!a.bits_eq(&a.with_fg(PackedRgba::RED)));
    }

    #[test]
    fn plain_space_is_see_through() {
        assert!(!Cell::from_char(' ').is_occupied());
        assert!(!Cell::from_char(' ').with_attrs(StyleFlags::BOLD).is_occupied());
        assert!(Cell::from_char(' ').with_attrs(StyleFlags::UNDERLINE).is_occupied());
        assert!(Cell::from_char(' ').with_bg(PackedRgba::BLUE).is_occupied());
        assert!(Cell::from_char('x').is_occupied());
        let tail = Cell {
            content: CellContent::CONTINUATION,
            ..Cell::EMPTY
        };
        assert!(tail.is_occupied());
    }

    #[test]
    fn bg_only_cell_is_occupied() {
        let cell = Cell::EMPTY.with_bg(PackedRgba::BLUE);
        assert!(cell.is_occupied());
        assert!(!cell.is_blank());
    }

    #[test]
    fn unowned_cells_accept_any_write() {
        let patch = CellPatch::char('a').owned_by(NodeId(1), -10);
        assert!(patch.may_overwrite(&Cell::EMPTY));
    }

    #[test]
    fn lower_z_from_other_node_is_rejected() {
        let existing = Cell::from_char('h').with_owner(NodeId(1), 5);
        let lower = CellPatch::char('l').owned_by(NodeId(2), 4);
        let equal = CellPatch::char('e').owned_by(NodeId(2), 5);
        assert!(!lower.may_overwrite(&existing));
        assert!(equal.may_overwrite(&existing));
    }

    #[test]
    fn same_owner_may_always_repaint() {
        let existing = Cell::from_char('h').with_owner(NodeId(1), 5);
        let repaint = CellPatch::char('r').owned_by(NodeId(1), 0);
        assert!(repaint.may_overwrite(&existing));
    }

    #[test]
    fn patch_merges_only_set_fields() {
        let mut cell = Cell::from_char('a').with_fg(PackedRgba::RED);
        CellPatch::new().bg(PackedRgba::BLUE).apply_to(&mut cell);
        assert_eq!(cell.display_char(), 'a');
        assert_eq!(cell.fg, PackedRgba::RED);
        assert_eq!(cell.bg, PackedRgba::BLUE);
    }

    #[test]
    fn patch_from_cell_reproduces_it() {
        let cell = Cell::from_char('q')
            .with_fg(PackedRgba::GREEN)
            .with_attrs(StyleFlags::BOLD)
            .with_owner(NodeId(9), 3);
        let rebuilt = CellPatch::from(cell).to_cell();
        assert_eq!(rebuilt, cell);
    }

    #[test]
    fn debug_formats_content() {
        assert_eq!(format!("{:?}", CellContent::EMPTY), "Empty");
        assert_eq!(format!("{:?}", CellContent::from_char('z')), "'z'");
    }
}
