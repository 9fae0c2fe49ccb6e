#![forbid(unsafe_code)]

//! Box-model and presentation attributes for layout nodes.
//!
//! [`Style`] carries everything the layout engine and the painter read from
//! a node: sizes, spacing, borders, positioning, flex and grid parameters,
//! text handling, and colors. Styles are built either with the chaining
//! setters or from CSS-like declarations:
//!
//! ```
//! use stratum_layout::style::{Dimension, Display, Style};
//!
//! let style = Style::from_inline("width: 50%; display: flex; gap: 1; border: rounded cyan");
//! assert_eq!(style.width, Dimension::Percent(50.0));
//! assert_eq!(style.display, Display::Flex);
//! assert_eq!(style.gap, 1);
//! ```
//!
//! Malformed declarations never abort: [`Style::from_declarations`] skips
//! them (with a warning when tracing is enabled) and the affected
//! attributes keep their defaults.

use std::fmt;

use stratum_core::geometry::Sides;
use stratum_render::cell::StyleFlags;
use stratum_render::color::PackedRgba;

pub use crate::text::{TextAlign, WrapMode};

/// Largest size or offset, in cells, that layout works with. Larger
/// resolved values are clamped to it.
pub const MAX_EXTENT: i32 = u16::MAX as i32;

/// A length along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    /// Determined by the layout algorithm.
    #[default]
    Auto,
    Cells(u16),
    /// Percentage of the containing block along the same axis.
    Percent(f32),
}

impl Dimension {
    #[inline]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Resolve against a containing size. Percentages of an unknown size
    /// behave like `Auto`; resolved percentages stay within
    /// `0..=MAX_EXTENT`.
    pub fn resolve(self, base: Option<i32>) -> Option<i32> {
        match self {
            Self::Auto => None,
            Self::Cells(n) => Some(i32::from(n)),
            Self::Percent(p) => base.map(|b| {
                let cells = ((b.max(0) as f32) * p / 100.0).floor() as i32;
                cells.clamp(0, MAX_EXTENT)
            }),
        }
    }
}

impl From<u16> for Dimension {
    fn from(cells: u16) -> Self {
        Self::Cells(cells)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Single,
    Double,
    Rounded,
    Heavy,
    Ascii,
}

impl BorderStyle {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("single", Self::Single),
        ("solid", Self::Single),
        ("double", Self::Double),
        ("rounded", Self::Rounded),
        ("round", Self::Rounded),
        ("heavy", Self::Heavy),
        ("bold", Self::Heavy),
        ("ascii", Self::Ascii),
        ("classic", Self::Ascii),
    ];
}

bitflags::bitflags! {
    /// Which edges of the border box carry a border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BorderSides: u8 {
        const TOP    = 0b0001;
        const RIGHT  = 0b0010;
        const BOTTOM = 0b0100;
        const LEFT   = 0b1000;
    }
}

impl Default for BorderSides {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Border {
    pub style: BorderStyle,
    /// `None` inherits the text color.
    pub color: Option<PackedRgba>,
    pub sides: BorderSides,
}

impl Border {
    /// Cells taken on each edge: one per enabled side, none without a style.
    pub fn widths(&self) -> Sides {
        if self.style == BorderStyle::None {
            return Sides::ZERO;
        }
        let w = |side| u16::from(self.sides.contains(side));
        Sides::new(
            w(BorderSides::TOP),
            w(BorderSides::RIGHT),
            w(BorderSides::BOTTOM),
            w(BorderSides::LEFT),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    #[default]
    Static,
    /// In flow, drawn shifted by the insets.
    Relative,
    /// Out of flow, placed against the nearest positioned ancestor.
    Absolute,
    /// Out of flow, placed against the viewport.
    Fixed,
    /// Treated as `Relative`.
    Sticky,
}

impl Position {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("static", Self::Static),
        ("relative", Self::Relative),
        ("absolute", Self::Absolute),
        ("fixed", Self::Fixed),
        ("sticky", Self::Sticky),
    ];

    /// Anything but `Static`: establishes a containing block for
    /// absolutely positioned descendants.
    #[inline]
    pub const fn is_positioned(self) -> bool {
        !matches!(self, Self::Static)
    }

    #[inline]
    pub const fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }

    /// Keeps its reserved space but is drawn at an offset.
    #[inline]
    pub const fn is_offset_in_flow(self) -> bool {
        matches!(self, Self::Relative | Self::Sticky)
    }
}

/// Positioning offsets. `None` is `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Insets {
    pub top: Option<i32>,
    pub right: Option<i32>,
    pub bottom: Option<i32>,
    pub left: Option<i32>,
}

impl Insets {
    pub const AUTO: Self = Self {
        top: None,
        right: None,
        bottom: None,
        left: None,
    };

    pub const fn all(v: i32) -> Self {
        Self {
            top: Some(v),
            right: Some(v),
            bottom: Some(v),
            left: Some(v),
        }
    }

    /// Every set inset limited to `-MAX_EXTENT..=MAX_EXTENT`.
    pub fn clamped(&self) -> Self {
        let bound = |v: Option<i32>| v.map(|v| v.clamp(-MAX_EXTENT, MAX_EXTENT));
        Self {
            top: bound(self.top),
            right: bound(self.right),
            bottom: bound(self.bottom),
            left: bound(self.left),
        }
    }

    /// Visual shift for relative positioning: `left` wins over `right`,
    /// `top` over `bottom`.
    pub fn relative_offset(&self) -> (i32, i32) {
        let Self {
            top,
            right,
            bottom,
            left,
        } = self.clamped();
        let dx = left.or(right.map(|r| -r)).unwrap_or(0);
        let dy = top.or(bottom.map(|b| -b)).unwrap_or(0);
        (dx, dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Display {
    #[default]
    Block,
    Flex,
    Grid,
    /// Not laid out and not painted.
    None,
}

impl Display {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("block", Self::Block),
        ("flex", Self::Flex),
        ("grid", Self::Grid),
        ("none", Self::None),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

impl FlexDirection {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("row", Self::Row),
        ("column", Self::Column),
        ("row-reverse", Self::RowReverse),
        ("column-reverse", Self::ColumnReverse),
    ];

    #[inline]
    pub const fn is_row(self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }

    #[inline]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Self::RowReverse | Self::ColumnReverse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlexWrap {
    #[default]
    NoWrap,
    Wrap,
}

impl FlexWrap {
    const KEYWORDS: &'static [(&'static str, Self)] = &[("nowrap", Self::NoWrap), ("wrap", Self::Wrap)];
}

/// Main-axis distribution of free space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JustifyContent {
    #[default]
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

impl JustifyContent {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("start", Self::Start),
        ("flex-start", Self::Start),
        ("end", Self::End),
        ("flex-end", Self::End),
        ("center", Self::Center),
        ("space-between", Self::SpaceBetween),
        ("space-around", Self::SpaceAround),
        ("space-evenly", Self::SpaceEvenly),
    ];
}

/// Cross-axis placement of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignItems {
    Start,
    End,
    Center,
    #[default]
    Stretch,
}

impl AlignItems {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("start", Self::Start),
        ("flex-start", Self::Start),
        ("end", Self::End),
        ("flex-end", Self::End),
        ("center", Self::Center),
        ("stretch", Self::Stretch),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridTrack {
    Cells(u16),
    /// Share of the space left after fixed and auto tracks.
    Fr(u16),
    /// Sized to the widest (or tallest) single-span item in the track.
    Auto,
}

/// Where an item sits on one grid axis. `start` is a 1-based line number;
/// `None` lets auto-placement choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPlacement {
    pub start: Option<u16>,
    pub span: u16,
}

impl Default for GridPlacement {
    fn default() -> Self {
        Self::AUTO
    }
}

impl GridPlacement {
    pub const AUTO: Self = Self {
        start: None,
        span: 1,
    };

    pub const fn line(start: u16) -> Self {
        Self {
            start: Some(start),
            span: 1,
        }
    }

    pub const fn span(span: u16) -> Self {
        Self { start: None, span }
    }

    pub const fn with_span(mut self, span: u16) -> Self {
        self.span = span;
        self
    }

    /// Highest line number honored; later lines and longer spans are
    /// clamped so the implicit grid stays bounded.
    pub const MAX_LINE: u16 = 1000;

    /// Zero-based start track, if placed explicitly.
    #[inline]
    pub fn start_track(&self) -> Option<usize> {
        self.start
            .map(|s| usize::from(s.clamp(1, Self::MAX_LINE)) - 1)
    }

    #[inline]
    pub fn span_len(&self) -> usize {
        usize::from(self.span.clamp(1, Self::MAX_LINE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    /// Clipped, with content shifted by the scroll offset.
    Scroll,
}

impl Overflow {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("visible", Self::Visible),
        ("hidden", Self::Hidden),
        ("clip", Self::Hidden),
        ("scroll", Self::Scroll),
        ("auto", Self::Scroll),
    ];

    #[inline]
    pub const fn clips(self) -> bool {
        !matches!(self, Self::Visible)
    }
}

impl TextAlign {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("left", Self::Left),
        ("start", Self::Left),
        ("center", Self::Center),
        ("right", Self::Right),
        ("end", Self::Right),
    ];
}

impl WrapMode {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("nowrap", Self::None),
        ("word", Self::Word),
        ("wrap", Self::Word),
        ("char", Self::Char),
        ("word-char", Self::WordChar),
        ("break-word", Self::WordChar),
    ];
}

const ATTR_KEYWORDS: &[(&str, StyleFlags)] = &[
    ("bold", StyleFlags::BOLD),
    ("dim", StyleFlags::DIM),
    ("italic", StyleFlags::ITALIC),
    ("underline", StyleFlags::UNDERLINE),
    ("blink", StyleFlags::BLINK),
    ("reverse", StyleFlags::REVERSE),
    ("hidden", StyleFlags::HIDDEN),
    ("strikethrough", StyleFlags::STRIKETHROUGH),
    ("line-through", StyleFlags::STRIKETHROUGH),
];

/// Why a declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    UnknownProperty(String),
    InvalidValue { property: String, value: String },
}

impl fmt::Display for StyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty(p) => write!(f, "unknown style property {p:?}"),
            Self::InvalidValue { property, value } => {
                write!(f, "invalid value {value:?} for {property:?}")
            }
        }
    }
}

impl std::error::Error for StyleError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// Border-box width.
    pub width: Dimension,
    /// Border-box height.
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub margin: Sides,
    pub padding: Sides,
    pub border: Border,

    pub position: Position,
    pub inset: Insets,
    pub z_index: Option<i32>,
    pub display: Display,

    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub align_self: Option<AlignItems>,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    /// Spacing between children on both axes unless overridden.
    pub gap: u16,
    pub row_gap: Option<u16>,
    pub column_gap: Option<u16>,

    pub grid_template_columns: Vec<GridTrack>,
    pub grid_template_rows: Vec<GridTrack>,
    pub grid_column: GridPlacement,
    pub grid_row: GridPlacement,

    pub text_align: TextAlign,
    pub text_wrap: WrapMode,
    /// `None` inherits from the parent.
    pub fg: Option<PackedRgba>,
    pub bg: Option<PackedRgba>,
    /// Added to the inherited attributes.
    pub attrs: StyleFlags,

    pub overflow: Overflow,
    /// `(x, y)` content shift for `Overflow::Scroll`.
    pub scroll_offset: (u16, u16),
    pub opacity: f32,
    /// Always paint into a layer of its own.
    pub overlay: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            margin: Sides::ZERO,
            padding: Sides::ZERO,
            border: Border::default(),
            position: Position::Static,
            inset: Insets::AUTO,
            z_index: None,
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            align_self: None,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            gap: 0,
            row_gap: None,
            column_gap: None,
            grid_template_columns: Vec::new(),
            grid_template_rows: Vec::new(),
            grid_column: GridPlacement::AUTO,
            grid_row: GridPlacement::AUTO,
            text_align: TextAlign::Left,
            text_wrap: WrapMode::Word,
            fg: None,
            bg: None,
            attrs: StyleFlags::empty(),
            overflow: Overflow::Visible,
            scroll_offset: (0, 0),
            opacity: 1.0,
            overlay: false,
        }
    }
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- derived values -----

    /// Border plus padding on each edge.
    pub fn frame(&self) -> Sides {
        self.border.widths().add(self.padding)
    }

    #[inline]
    pub fn effective_row_gap(&self) -> u16 {
        self.row_gap.unwrap_or(self.gap)
    }

    #[inline]
    pub fn effective_column_gap(&self) -> u16 {
        self.column_gap.unwrap_or(self.gap)
    }

    /// Whether a node with this style composites in a layer of its own:
    /// fixed or sticky positioning, an explicit overlay, or a relative or
    /// absolute box with a non-zero z-index.
    pub fn creates_stacking_context(&self) -> bool {
        let positioned = match self.position {
            Position::Fixed | Position::Sticky => true,
            Position::Relative | Position::Absolute => self.z_index.is_some_and(|z| z != 0),
            Position::Static => false,
        };
        positioned || self.overlay
    }

    // ----- builder -----

    #[must_use]
    pub fn width(mut self, width: impl Into<Dimension>) -> Self {
        self.width = width.into();
        self
    }

    #[must_use]
    pub fn height(mut self, height: impl Into<Dimension>) -> Self {
        self.height = height.into();
        self
    }

    #[must_use]
    pub fn min_width(mut self, v: impl Into<Dimension>) -> Self {
        self.min_width = v.into();
        self
    }

    #[must_use]
    pub fn min_height(mut self, v: impl Into<Dimension>) -> Self {
        self.min_height = v.into();
        self
    }

    #[must_use]
    pub fn max_width(mut self, v: impl Into<Dimension>) -> Self {
        self.max_width = v.into();
        self
    }

    #[must_use]
    pub fn max_height(mut self, v: impl Into<Dimension>) -> Self {
        self.max_height = v.into();
        self
    }

    #[must_use]
    pub fn margin(mut self, margin: Sides) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: Sides) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn border(mut self, style: BorderStyle) -> Self {
        self.border.style = style;
        self
    }

    #[must_use]
    pub fn border_color(mut self, color: PackedRgba) -> Self {
        self.border.color = Some(color);
        self
    }

    #[must_use]
    pub fn border_sides(mut self, sides: BorderSides) -> Self {
        self.border.sides = sides;
        self
    }

    #[must_use]
    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn top(mut self, v: i32) -> Self {
        self.inset.top = Some(v);
        self
    }

    #[must_use]
    pub fn right(mut self, v: i32) -> Self {
        self.inset.right = Some(v);
        self
    }

    #[must_use]
    pub fn bottom(mut self, v: i32) -> Self {
        self.inset.bottom = Some(v);
        self
    }

    #[must_use]
    pub fn left(mut self, v: i32) -> Self {
        self.inset.left = Some(v);
        self
    }

    #[must_use]
    pub fn z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    #[must_use]
    pub fn display(mut self, display: Display) -> Self {
        self.display = display;
        self
    }

    #[must_use]
    pub fn flex_direction(mut self, direction: FlexDirection) -> Self {
        self.display = Display::Flex;
        self.flex_direction = direction;
        self
    }

    #[must_use]
    pub fn flex_wrap(mut self, wrap: FlexWrap) -> Self {
        self.flex_wrap = wrap;
        self
    }

    #[must_use]
    pub fn justify_content(mut self, justify: JustifyContent) -> Self {
        self.justify_content = justify;
        self
    }

    #[must_use]
    pub fn align_items(mut self, align: AlignItems) -> Self {
        self.align_items = align;
        self
    }

    #[must_use]
    pub fn align_self(mut self, align: AlignItems) -> Self {
        self.align_self = Some(align);
        self
    }

    #[must_use]
    pub fn flex_grow(mut self, grow: f32) -> Self {
        self.flex_grow = grow.max(0.0);
        self
    }

    #[must_use]
    pub fn flex_shrink(mut self, shrink: f32) -> Self {
        self.flex_shrink = shrink.max(0.0);
        self
    }

    #[must_use]
    pub fn flex_basis(mut self, basis: impl Into<Dimension>) -> Self {
        self.flex_basis = basis.into();
        self
    }

    #[must_use]
    pub fn gap(mut self, gap: u16) -> Self {
        self.gap = gap;
        self
    }

    #[must_use]
    pub fn row_gap(mut self, gap: u16) -> Self {
        self.row_gap = Some(gap);
        self
    }

    #[must_use]
    pub fn column_gap(mut self, gap: u16) -> Self {
        self.column_gap = Some(gap);
        self
    }

    #[must_use]
    pub fn grid_columns(mut self, tracks: impl IntoIterator<Item = GridTrack>) -> Self {
        self.display = Display::Grid;
        self.grid_template_columns = tracks.into_iter().collect();
        self
    }

    #[must_use]
    pub fn grid_rows(mut self, tracks: impl IntoIterator<Item = GridTrack>) -> Self {
        self.grid_template_rows = tracks.into_iter().collect();
        self
    }

    #[must_use]
    pub fn grid_column(mut self, placement: GridPlacement) -> Self {
        self.grid_column = placement;
        self
    }

    #[must_use]
    pub fn grid_row(mut self, placement: GridPlacement) -> Self {
        self.grid_row = placement;
        self
    }

    #[must_use]
    pub fn text_align(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }

    #[must_use]
    pub fn text_wrap(mut self, wrap: WrapMode) -> Self {
        self.text_wrap = wrap;
        self
    }

    #[must_use]
    pub fn fg(mut self, color: PackedRgba) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub fn bg(mut self, color: PackedRgba) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub fn attrs(mut self, attrs: StyleFlags) -> Self {
        self.attrs |= attrs;
        self
    }

    #[must_use]
    pub fn bold(self) -> Self {
        self.attrs(StyleFlags::BOLD)
    }

    #[must_use]
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    #[must_use]
    pub fn scroll_offset(mut self, x: u16, y: u16) -> Self {
        self.scroll_offset = (x, y);
        self
    }

    #[must_use]
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self
    }

    #[must_use]
    pub fn overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    // ----- declarations -----

    /// Apply every declaration, skipping the malformed ones.
    pub fn from_declarations<'a, I>(declarations: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::try_from_declarations(declarations).0
    }

    /// Like [`Self::from_declarations`], also returning what was skipped.
    pub fn try_from_declarations<'a, I>(declarations: I) -> (Self, Vec<StyleError>)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut style = Self::default();
        let mut skipped = Vec::new();
        for (key, value) in declarations {
            if let Err(err) = style.apply_declaration(key, value) {
                stratum_core::warn!(error = %err, "skipping style declaration");
                skipped.push(err);
            }
        }
        (style, skipped)
    }

    /// Parse `key: value; key: value` text.
    pub fn from_inline(text: &str) -> Self {
        Self::from_declarations(
            text.split(';')
                .filter_map(|decl| decl.split_once(':'))
                .map(|(k, v)| (k.trim(), v.trim())),
        )
    }

    /// Apply one kebab-case declaration such as `("padding", "1 2")`.
    ///
    /// On error the style is unchanged.
    pub fn apply_declaration(&mut self, key: &str, value: &str) -> Result<(), StyleError> {
        let property = key.trim().to_ascii_lowercase();
        let value = value.trim();
        let lower = value.to_ascii_lowercase();
        let invalid = || StyleError::InvalidValue {
            property: property.clone(),
            value: value.to_string(),
        };

        match property.as_str() {
            "width" => self.width = parse_dimension(&lower).ok_or_else(invalid)?,
            "height" => self.height = parse_dimension(&lower).ok_or_else(invalid)?,
            "min-width" => self.min_width = parse_dimension(&lower).ok_or_else(invalid)?,
            "min-height" => self.min_height = parse_dimension(&lower).ok_or_else(invalid)?,
            "max-width" => self.max_width = parse_dimension(&lower).ok_or_else(invalid)?,
            "max-height" => self.max_height = parse_dimension(&lower).ok_or_else(invalid)?,

            "margin" => self.margin = parse_sides(&lower).ok_or_else(invalid)?,
            "padding" => self.padding = parse_sides(&lower).ok_or_else(invalid)?,
            "margin-top" => self.margin.top = lower.parse().map_err(|_| invalid())?,
            "margin-right" => self.margin.right = lower.parse().map_err(|_| invalid())?,
            "margin-bottom" => self.margin.bottom = lower.parse().map_err(|_| invalid())?,
            "margin-left" => self.margin.left = lower.parse().map_err(|_| invalid())?,
            "padding-top" => self.padding.top = lower.parse().map_err(|_| invalid())?,
            "padding-right" => self.padding.right = lower.parse().map_err(|_| invalid())?,
            "padding-bottom" => self.padding.bottom = lower.parse().map_err(|_| invalid())?,
            "padding-left" => self.padding.left = lower.parse().map_err(|_| invalid())?,

            "border" => self.border = parse_border(&lower, self.border).ok_or_else(invalid)?,
            "border-style" => {
                self.border.style = keyword(&lower, BorderStyle::KEYWORDS).ok_or_else(invalid)?;
            }
            "border-color" => self.border.color = Some(lower.parse().map_err(|_| invalid())?),
            "border-sides" => self.border.sides = parse_border_sides(&lower).ok_or_else(invalid)?,

            "position" => self.position = keyword(&lower, Position::KEYWORDS).ok_or_else(invalid)?,
            "top" => self.inset.top = parse_offset(&lower).ok_or_else(invalid)?,
            "right" => self.inset.right = parse_offset(&lower).ok_or_else(invalid)?,
            "bottom" => self.inset.bottom = parse_offset(&lower).ok_or_else(invalid)?,
            "left" => self.inset.left = parse_offset(&lower).ok_or_else(invalid)?,
            "inset" => self.inset = parse_insets(&lower).ok_or_else(invalid)?,
            "z-index" => self.z_index = parse_offset(&lower).ok_or_else(invalid)?,
            "display" => self.display = keyword(&lower, Display::KEYWORDS).ok_or_else(invalid)?,

            "flex-direction" => {
                self.flex_direction = keyword(&lower, FlexDirection::KEYWORDS).ok_or_else(invalid)?;
            }
            "flex-wrap" => self.flex_wrap = keyword(&lower, FlexWrap::KEYWORDS).ok_or_else(invalid)?,
            "justify-content" => {
                self.justify_content =
                    keyword(&lower, JustifyContent::KEYWORDS).ok_or_else(invalid)?;
            }
            "align-items" => {
                self.align_items = keyword(&lower, AlignItems::KEYWORDS).ok_or_else(invalid)?;
            }
            "align-self" => {
                self.align_self = if lower == "auto" {
                    None
                } else {
                    Some(keyword(&lower, AlignItems::KEYWORDS).ok_or_else(invalid)?)
                };
            }
            "flex-grow" => self.flex_grow = parse_factor(&lower).ok_or_else(invalid)?,
            "flex-shrink" => self.flex_shrink = parse_factor(&lower).ok_or_else(invalid)?,
            "flex-basis" => self.flex_basis = parse_dimension(&lower).ok_or_else(invalid)?,
            "flex" => {
                let (grow, shrink, basis) = parse_flex(&lower).ok_or_else(invalid)?;
                self.flex_grow = grow;
                self.flex_shrink = shrink;
                self.flex_basis = basis;
            }
            "gap" => {
                let sides = parse_u16_list(&lower).ok_or_else(invalid)?;
                match sides.as_slice() {
                    [g] => {
                        self.gap = *g;
                        self.row_gap = None;
                        self.column_gap = None;
                    }
                    [row, column] => {
                        self.row_gap = Some(*row);
                        self.column_gap = Some(*column);
                    }
                    _ => return Err(invalid()),
                }
            }
            "row-gap" => self.row_gap = Some(lower.parse().map_err(|_| invalid())?),
            "column-gap" => self.column_gap = Some(lower.parse().map_err(|_| invalid())?),

            "grid-template-columns" => {
                self.grid_template_columns = parse_tracks(&lower).ok_or_else(invalid)?;
            }
            "grid-template-rows" => {
                self.grid_template_rows = parse_tracks(&lower).ok_or_else(invalid)?;
            }
            "grid-column" => self.grid_column = parse_placement(&lower).ok_or_else(invalid)?,
            "grid-row" => self.grid_row = parse_placement(&lower).ok_or_else(invalid)?,

            "text-align" => self.text_align = keyword(&lower, TextAlign::KEYWORDS).ok_or_else(invalid)?,
            "text-wrap" | "wrap" => {
                self.text_wrap = keyword(&lower, WrapMode::KEYWORDS).ok_or_else(invalid)?;
            }
            "color" | "fg" => self.fg = Some(lower.parse().map_err(|_| invalid())?),
            "background" | "background-color" | "bg" => {
                self.bg = Some(lower.parse().map_err(|_| invalid())?);
            }
            "font-weight" => match lower.as_str() {
                "bold" => self.attrs |= StyleFlags::BOLD,
                "normal" => self.attrs -= StyleFlags::BOLD,
                _ => return Err(invalid()),
            },
            "font-style" => match lower.as_str() {
                "italic" => self.attrs |= StyleFlags::ITALIC,
                "normal" => self.attrs -= StyleFlags::ITALIC,
                _ => return Err(invalid()),
            },
            "text-decoration" => {
                let deco = parse_attrs(&lower).ok_or_else(invalid)?;
                self.attrs -= StyleFlags::UNDERLINE | StyleFlags::STRIKETHROUGH;
                self.attrs |= deco;
            }
            "attrs" | "text-style" => self.attrs = parse_attrs(&lower).ok_or_else(invalid)?,

            "overflow" => self.overflow = keyword(&lower, Overflow::KEYWORDS).ok_or_else(invalid)?,
            "scroll-offset" => match parse_u16_list(&lower).as_deref() {
                Some([y]) => self.scroll_offset = (0, *y),
                Some([x, y]) => self.scroll_offset = (*x, *y),
                _ => return Err(invalid()),
            },
            "scroll-x" => self.scroll_offset.0 = lower.parse().map_err(|_| invalid())?,
            "scroll-y" => self.scroll_offset.1 = lower.parse().map_err(|_| invalid())?,
            "opacity" => {
                let v: f32 = lower.parse().map_err(|_| invalid())?;
                if !v.is_finite() {
                    return Err(invalid());
                }
                self.opacity = v.clamp(0.0, 1.0);
            }
            "overlay" => {
                self.overlay = match lower.as_str() {
                    "true" | "1" | "yes" => true,
                    "false" | "0" | "no" => false,
                    _ => return Err(invalid()),
                };
            }
            _ => return Err(StyleError::UnknownProperty(property)),
        }
        Ok(())
    }
}

// ----- value parsers -----

fn keyword<T: Copy>(value: &str, table: &[(&str, T)]) -> Option<T> {
    table.iter().find(|(k, _)| *k == value).map(|(_, v)| *v)
}

fn parse_dimension(value: &str) -> Option<Dimension> {
    if value == "auto" {
        return Some(Dimension::Auto);
    }
    if let Some(pct) = value.strip_suffix('%') {
        let p: f32 = pct.trim().parse().ok()?;
        return (p.is_finite() && p >= 0.0).then_some(Dimension::Percent(p));
    }
    value.parse().ok().map(Dimension::Cells)
}

fn parse_u16_list(value: &str) -> Option<Vec<u16>> {
    value.split_whitespace().map(|t| t.parse().ok()).collect()
}

/// CSS shorthand: 1 to 4 values, clockwise from the top.
fn parse_sides(value: &str) -> Option<Sides> {
    match parse_u16_list(value)?.as_slice() {
        [a] => Some(Sides::all(*a)),
        [v, h] => Some(Sides::new(*v, *h, *v, *h)),
        [t, h, b] => Some(Sides::new(*t, *h, *b, *h)),
        [t, r, b, l] => Some(Sides::new(*t, *r, *b, *l)),
        _ => None,
    }
}

fn parse_offset(value: &str) -> Option<Option<i32>> {
    if value == "auto" {
        return Some(None);
    }
    value.parse().ok().map(Some)
}

fn parse_insets(value: &str) -> Option<Insets> {
    let parts: Vec<Option<i32>> = value
        .split_whitespace()
        .map(parse_offset)
        .collect::<Option<_>>()?;
    let (top, right, bottom, left) = match parts.as_slice() {
        [a] => (*a, *a, *a, *a),
        [v, h] => (*v, *h, *v, *h),
        [t, h, b] => (*t, *h, *b, *h),
        [t, r, b, l] => (*t, *r, *b, *l),
        _ => return None,
    };
    Some(Insets {
        top,
        right,
        bottom,
        left,
    })
}

fn parse_factor(value: &str) -> Option<f32> {
    let v: f32 = value.parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// `flex: none | auto | <grow> [<shrink>] [<basis>]`. A lone second value
/// is the shrink factor when it is a plain number.
fn parse_flex(value: &str) -> Option<(f32, f32, Dimension)> {
    match value {
        "none" => return Some((0.0, 0.0, Dimension::Auto)),
        "auto" => return Some((1.0, 1.0, Dimension::Auto)),
        _ => {}
    }
    let mut parts = value.split_whitespace();
    let grow = parse_factor(parts.next()?)?;
    let mut shrink = 1.0;
    let mut basis = Dimension::Cells(0);
    let rest: Vec<&str> = parts.collect();
    match rest.as_slice() {
        [] => {}
        [one] => match parse_factor(one) {
            Some(f) => shrink = f,
            None => basis = parse_dimension(one)?,
        },
        [s, b] => {
            shrink = parse_factor(s)?;
            basis = parse_dimension(b)?;
        }
        _ => return None,
    }
    Some((grow, shrink, basis))
}

fn parse_border(value: &str, current: Border) -> Option<Border> {
    let mut border = Border {
        sides: current.sides,
        ..Border::default()
    };
    for token in value.split_whitespace() {
        if let Some(style) = keyword(token, BorderStyle::KEYWORDS) {
            border.style = style;
        } else {
            border.color = Some(token.parse().ok()?);
        }
    }
    Some(border)
}

fn parse_border_sides(value: &str) -> Option<BorderSides> {
    let mut sides = BorderSides::empty();
    for token in value.split_whitespace() {
        sides |= match token {
            "all" => BorderSides::all(),
            "none" => BorderSides::empty(),
            "top" => BorderSides::TOP,
            "right" => BorderSides::RIGHT,
            "bottom" => BorderSides::BOTTOM,
            "left" => BorderSides::LEFT,
            "horizontal" => BorderSides::TOP | BorderSides::BOTTOM,
            "vertical" => BorderSides::LEFT | BorderSides::RIGHT,
            _ => return None,
        };
    }
    Some(sides)
}

fn parse_tracks(value: &str) -> Option<Vec<GridTrack>> {
    value
        .split_whitespace()
        .map(|t| {
            if t == "auto" {
                Some(GridTrack::Auto)
            } else if let Some(fr) = t.strip_suffix("fr") {
                fr.parse().ok().filter(|n| *n > 0).map(GridTrack::Fr)
            } else {
                t.parse().ok().map(GridTrack::Cells)
            }
        })
        .collect()
}

/// `auto`, `<line>`, `span <n>`, `<line> / span <n>`, or `<line> / <end>`.
fn parse_placement(value: &str) -> Option<GridPlacement> {
    let span_of = |s: &str| -> Option<u16> {
        let n: u16 = s.trim().strip_prefix("span")?.trim().parse().ok()?;
        (n > 0).then_some(n)
    };
    let line_of = |s: &str| -> Option<u16> { s.trim().parse().ok().filter(|n| *n > 0) };

    let value = value.trim();
    if value == "auto" {
        return Some(GridPlacement::AUTO);
    }
    match value.split_once('/') {
        None => span_of(value)
            .map(GridPlacement::span)
            .or_else(|| line_of(value).map(GridPlacement::line)),
        Some((start, end)) => {
            let start = line_of(start)?;
            let span = match span_of(end) {
                Some(span) => span,
                None => line_of(end)?.checked_sub(start).filter(|s| *s > 0)?,
            };
            Some(GridPlacement::line(start).with_span(span))
        }
    }
}

fn parse_attrs(value: &str) -> Option<StyleFlags> {
    let mut attrs = StyleFlags::empty();
    for token in value.split_whitespace() {
        if token == "none" || token == "normal" {
            continue;
        }
        attrs |= keyword(token, ATTR_KEYWORDS)?;
    }
    Some(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_parse() {
        assert_eq!(parse_dimension("auto"), Some(Dimension::Auto));
        assert_eq!(parse_dimension("12"), Some(Dimension::Cells(12)));
        assert_eq!(parse_dimension("50%"), Some(Dimension::Percent(50.0)));
        assert_eq!(parse_dimension("-3"), None);
        assert_eq!(parse_dimension("wide"), None);
    }

    #[test]
    fn percent_resolves_against_base() {
        assert_eq!(Dimension::Percent(50.0).resolve(Some(21)), Some(10));
        assert_eq!(Dimension::Percent(50.0).resolve(None), None);
        assert_eq!(Dimension::Cells(4).resolve(None), Some(4));
        assert_eq!(Dimension::Auto.resolve(Some(80)), None);
    }

    #[test]
    fn sides_shorthand() {
        assert_eq!(parse_sides("1"), Some(Sides::all(1)));
        assert_eq!(parse_sides("1 2"), Some(Sides::new(1, 2, 1, 2)));
        assert_eq!(parse_sides("1 2 3"), Some(Sides::new(1, 2, 3, 2)));
        assert_eq!(parse_sides("1 2 3 4"), Some(Sides::new(1, 2, 3, 4)));
        assert_eq!(parse_sides("1 2 3 4 5"), None);
    }

    #[test]
    fn border_shorthand_and_widths() {
        let mut style = Style::new();
        style.apply_declaration("border", "double #ff0000").unwrap();
        assert_eq!(style.border.style, BorderStyle::Double);
        assert_eq!(style.border.color, Some(PackedRgba::rgb(255, 0, 0)));
        assert_eq!(style.border.widths(), Sides::all(1));

        style.apply_declaration("border-sides", "top bottom").unwrap();
        assert_eq!(style.border.widths(), Sides::new(1, 0, 1, 0));

        style.apply_declaration("border", "none").unwrap();
        assert_eq!(style.border.widths(), Sides::ZERO);
    }

    #[test]
    fn frame_sums_border_and_padding() {
        let style = Style::new().border(BorderStyle::Single).padding(Sides::new(0, 2, 0, 2));
        assert_eq!(style.frame(), Sides::new(1, 3, 1, 3));
    }

    #[test]
    fn positioning_declarations() {
        let style = Style::from_inline("position: absolute; right: 0; top: -2; z-index: 5");
        assert_eq!(style.position, Position::Absolute);
        assert_eq!(style.inset.right, Some(0));
        assert_eq!(style.inset.top, Some(-2));
        assert_eq!(style.inset.left, None);
        assert_eq!(style.z_index, Some(5));
        assert!(style.creates_stacking_context());
    }

    #[test]
    fn relative_offset_prefers_left_and_top() {
        let insets = Insets {
            top: None,
            right: Some(3),
            bottom: Some(1),
            left: None,
        };
        assert_eq!(insets.relative_offset(), (-3, -1));
        assert_eq!(Insets::all(2).relative_offset(), (2, 2));
    }

    #[test]
    fn stacking_context_rules() {
        assert!(!Style::new().creates_stacking_context());
        assert!(!Style::new().position(Position::Relative).creates_stacking_context());
        assert!(!Style::new().position(Position::Absolute).z_index(0).creates_stacking_context());
        assert!(Style::new().position(Position::Fixed).creates_stacking_context());
        assert!(Style::new().position(Position::Sticky).creates_stacking_context());
        assert!(Style::new().overlay(true).creates_stacking_context());
        assert!(Style::new().position(Position::Absolute).z_index(-2).creates_stacking_context());
        assert!(Style::new().position(Position::Relative).z_index(4).creates_stacking_context());
        assert!(Style::new().overlay(true).position(Position::Relative).creates_stacking_context());
        // z-index alone does nothing on a static box.
        assert!(!Style::new().z_index(3).creates_stacking_context());
    }

    #[test]
    fn extreme_values_are_bounded() {
        let huge = Style::from_declarations([("width", "1e30%"), ("height", "-50%")]);
        assert_eq!(huge.width.resolve(Some(38)), Some(MAX_EXTENT));
        assert!(huge.height.is_auto());
        assert_eq!(Dimension::Percent(-50.0).resolve(Some(10)), Some(0));
        assert_eq!(Dimension::Cells(u16::MAX).resolve(None), Some(MAX_EXTENT));

        let insets = Insets {
            top: Some(i32::MIN),
            right: None,
            bottom: None,
            left: Some(i32::MAX),
        };
        assert_eq!(insets.relative_offset(), (MAX_EXTENT, -MAX_EXTENT));

        let far = Style::from_declarations([("grid-column", "65535 / span 65535")]);
        assert_eq!(far.grid_column.start_track(), Some(usize::from(GridPlacement::MAX_LINE) - 1));
        assert_eq!(far.grid_column.span_len(), usize::from(GridPlacement::MAX_LINE));
    }

    #[test]
    fn flex_declarations() {
        let style = Style::from_inline(
            "display: flex; flex-direction: column-reverse; justify-content: space-evenly; \
             align-items: center; flex-wrap: wrap; gap: 1 2",
        );
        assert_eq!(style.flex_direction, FlexDirection::ColumnReverse);
        assert!(style.flex_direction.is_reverse());
        assert_eq!(style.justify_content, JustifyContent::SpaceEvenly);
        assert_eq!(style.align_items, AlignItems::Center);
        assert_eq!(style.flex_wrap, FlexWrap::Wrap);
        assert_eq!(style.effective_row_gap(), 1);
        assert_eq!(style.effective_column_gap(), 2);
    }

    #[test]
    fn flex_shorthand() {
        assert_eq!(parse_flex("1"), Some((1.0, 1.0, Dimension::Cells(0))));
        assert_eq!(parse_flex("1 3"), Some((1.0, 3.0, Dimension::Cells(0))));
        assert_eq!(parse_flex("2 0 10"), Some((2.0, 0.0, Dimension::Cells(10))));
        assert_eq!(parse_flex("1 25%"), Some((1.0, 1.0, Dimension::Percent(25.0))));
        assert_eq!(parse_flex("none"), Some((0.0, 0.0, Dimension::Auto)));
        assert_eq!(parse_flex("x"), None);
    }

    #[test]
    fn grid_declarations() {
        let style = Style::from_inline(
            "display: grid; grid-template-columns: 10 1fr auto 2fr; grid-column: 2 / span 3; grid-row: 1 / 3",
        );
        assert_eq!(
            style.grid_template_columns,
            vec![
                GridTrack::Cells(10),
                GridTrack::Fr(1),
                GridTrack::Auto,
                GridTrack::Fr(2)
            ]
        );
        assert_eq!(style.grid_column, GridPlacement::line(2).with_span(3));
        assert_eq!(style.grid_row, GridPlacement::line(1).with_span(2));
        assert_eq!(parse_placement("span 2"), Some(GridPlacement::span(2)));
        assert_eq!(parse_placement("3 / 2"), None);
    }

    #[test]
    fn text_attributes() {
        let style = Style::from_inline(
            "color: red; background: #000; font-weight: bold; text-decoration: underline line-through",
        );
        assert_eq!(style.fg, Some(PackedRgba::RED));
        assert_eq!(style.bg, Some(PackedRgba::rgb(0, 0, 0)));
        assert!(style.attrs.contains(StyleFlags::BOLD | StyleFlags::UNDERLINE | StyleFlags::STRIKETHROUGH));

        let mut style = style;
        style.apply_declaration("text-decoration", "none").unwrap();
        assert_eq!(style.attrs, StyleFlags::BOLD);
    }

    #[test]
    fn malformed_declarations_degrade_to_defaults() {
        let (style, skipped) = Style::try_from_declarations([
            ("width", "wide"),
            ("height", "3"),
            ("colour", "red"),
            ("opacity", "NaN"),
            ("display", "inline"),
        ]);
        assert_eq!(style.width, Dimension::Auto);
        assert_eq!(style.height, Dimension::Cells(3));
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.display, Display::Block);
        assert_eq!(skipped.len(), 4);
        assert_eq!(skipped[1], StyleError::UnknownProperty("colour".into()));
        assert!(skipped[0].to_string().contains("wide"));
    }

    #[test]
    fn opacity_is_clamped() {
        let mut style = Style::new();
        style.apply_declaration("opacity", "1.7").unwrap();
        assert_eq!(style.opacity, 1.0);
        assert_eq!(Style::new().opacity(-1.0).opacity, 0.0);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let mut style = Style::new();
        style.apply_declaration(" Overflow ", "SCROLL").unwrap();
        assert_eq!(style.overflow, Overflow::Scroll);
        style.apply_declaration("scroll-offset", "2 5").unwrap();
        assert_eq!(style.scroll_offset, (2, 5));
    }

    mod property {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_declarations_never_panic(key in "[a-z-]{1,20}", value in "\\PC{0,24}") {
                let mut style = Style::new();
                let before = style.clone();
                if style.apply_declaration(&key, &value).is_err() {
                    prop_assert_eq!(style, before);
                }
            }

            #[test]
            fn cell_dimensions_round_trip(n in 0u16..10_000) {
                prop_assert_eq!(parse_dimension(&n.to_string()), Some(Dimension::Cells(n)));
            }
        }
    }
}
