#![forbid(unsafe_code)]

//! Painting laid-out nodes into cell grids.
//!
//! A [`Painter`] walks one stacking context at a time: the context's root
//! node and every descendant that does not start a context of its own.
//! Painting happens in screen coordinates into a screen-sized scratch grid;
//! the painter reports the area it touched and the nested contexts it
//! skipped, and the session turns that into layers.
//!
//! Per node: background over the border box, then border glyphs, then text
//! lines aligned inside the content box. Children follow in document order,
//! out-of-flow children after in-flow ones in ascending z. `Hidden` and
//! `Scroll` overflow clip descendants to the padding box; `Scroll` also
//! shifts them up and left by the scroll offset.

use smallvec::SmallVec;
use stratum_core::geometry::{Rect, Sides};
use stratum_core::ids::{LayerId, NodeId};
use stratum_core::text_width::grapheme_width;
use stratum_layout::text::align_offset;
use stratum_layout::{
    BorderSides, BorderStyle, ComputedBox, Display, LaidOut, Layout, Node, NodeKind, Overflow,
    Position, Style, Styled,
};
use stratum_render::cell::{CellPatch, StyleFlags};
use stratum_render::color::PackedRgba;
use stratum_render::escape::{strip_ansi, visible_length};
use stratum_render::grid::CellGrid;
use unicode_segmentation::UnicodeSegmentation;

/// Glyphs for one border style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderChars {
    pub const SINGLE: Self = Self {
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        horizontal: '─',
        vertical: '│',
    };

    pub const ROUNDED: Self = Self {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        horizontal: '─',
        vertical: '│',
    };

    pub const DOUBLE: Self = Self {
        top_left: '╔',
        top_right: '╗',
        bottom_left: '╚',
        bottom_right: '╝',
        horizontal: '═',
        vertical: '║',
    };

    pub const HEAVY: Self = Self {
        top_left: '┏',
        top_right: '┓',
        bottom_left: '┗',
        bottom_right: '┛',
        horizontal: '━',
        vertical: '┃',
    };

    pub const ASCII: Self = Self {
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        horizontal: '-',
        vertical: '|',
    };

    pub const fn for_style(style: BorderStyle) -> Option<Self> {
        match style {
            BorderStyle::None => None,
            BorderStyle::Single => Some(Self::SINGLE),
            BorderStyle::Double => Some(Self::DOUBLE),
            BorderStyle::Rounded => Some(Self::ROUNDED),
            BorderStyle::Heavy => Some(Self::HEAVY),
            BorderStyle::Ascii => Some(Self::ASCII),
        }
    }
}

/// Text styling passed down the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inherited {
    pub fg: Option<PackedRgba>,
    pub attrs: StyleFlags,
}

impl Inherited {
    /// What `style`'s node passes on to its children.
    #[must_use]
    pub fn apply(self, style: &Style) -> Self {
        Self {
            fg: style.fg.or(self.fg),
            attrs: self.attrs | style.attrs,
        }
    }
}

/// Everything a node needs to paint itself.
#[derive(Debug, Clone, Copy)]
pub struct PaintContext {
    pub layer: LayerId,
    /// z-index written into every cell.
    pub z_index: i32,
    /// Styling already resolved for this node (its own style applied).
    pub inherited: Inherited,
    /// Screen offset added to every laid-out position (scrolling).
    pub shift: (i32, i32),
}

/// A node that knows how to draw its own cells, not its children's.
pub trait Renderable {
    /// Paint into `grid` and return the area written, in grid coordinates.
    fn render(&self, computed: &ComputedBox, ctx: &PaintContext, grid: &mut CellGrid) -> Rect;
}

/// A box in signed screen coordinates; partly off-screen boxes keep their
/// true origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignedRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl SignedRect {
    fn border_box(computed: &ComputedBox, shift: (i32, i32)) -> Self {
        let b = computed.border_box;
        let (ox, oy) = computed.origin;
        // `border_box` is clipped at the origin; undo that for the size.
        Self {
            x: ox.saturating_add(shift.0),
            y: oy.saturating_add(shift.1),
            w: i32::from(b.width).saturating_add(i32::from(b.x).saturating_sub(ox).max(0)),
            h: i32::from(b.height).saturating_add(i32::from(b.y).saturating_sub(oy).max(0)),
        }
    }

    fn inner(self, sides: Sides) -> Self {
        let (l, r) = (i32::from(sides.left), i32::from(sides.right));
        let (t, b) = (i32::from(sides.top), i32::from(sides.bottom));
        Self {
            x: self.x.saturating_add(l),
            y: self.y.saturating_add(t),
            w: (self.w - l - r).max(0),
            h: (self.h - t - b).max(0),
        }
    }

    fn to_rect(self) -> Rect {
        Rect::from_signed(self.x, self.y, self.w, self.h)
    }
}

fn put(grid: &mut CellGrid, x: i32, y: i32, patch: &CellPatch) {
    if let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) {
        grid.set_cell(x, y, patch);
    }
}

impl Renderable for Node {
    fn render(&self, computed: &ComputedBox, ctx: &PaintContext, grid: &mut CellGrid) -> Rect {
        let style = self.style();
        let outer = SignedRect::border_box(computed, ctx.shift);
        let owner = self.id();
        let base = CellPatch::new()
            .owned_by(owner, ctx.z_index)
            .on_layer(ctx.layer);
        let clip = grid.current_clip();
        let mut touched = Rect::default();

        if let Some(bg) = style.bg {
            let rect = outer.to_rect();
            let patch = base
                .with_char(' ')
                .bg(bg)
                .fg(PackedRgba::TRANSPARENT)
                .attrs(StyleFlags::empty());
            grid.fill_region(rect, &patch);
            touched = touched.union(&rect.intersection(&clip));
        }

        if let Some(chars) = BorderChars::for_style(style.border.style) {
            let fg = style.border.color.or(ctx.inherited.fg).unwrap_or(PackedRgba::TRANSPARENT);
            let patch = base.fg(fg).attrs(ctx.inherited.attrs);
            draw_border(grid, outer, chars, style.border.sides, &patch);
            touched = touched.union(&outer.to_rect().intersection(&clip));
        }

        if matches!(self.kind(), NodeKind::Text(_)) {
            let content = outer.inner(style.frame());
            let patch = base
                .fg(ctx.inherited.fg.unwrap_or(PackedRgba::TRANSPARENT))
                .attrs(ctx.inherited.attrs);
            for (i, line) in computed.lines.iter().enumerate() {
                let y = content.y.saturating_add(i as i32);
                let width = visible_length(line);
                let offset = align_offset(style.text_align, width, content.w.max(0) as usize);
                let x = content.x.saturating_add(offset as i32);
                let Ok(y16) = u16::try_from(y) else {
                    continue;
                };
                let advanced = match u16::try_from(x) {
                    Ok(x16) => grid.write_string(x16, y16, line, &patch),
                    Err(_) if x < 0 => {
                        let rest = skip_columns(line, x.unsigned_abs() as usize);
                        grid.write_string(0, y16, &rest, &patch)
                    }
                    Err(_) => continue,
                };
                let line_rect = Rect::from_signed(x.max(0), y, i32::from(advanced), 1);
                touched = touched.union(&line_rect.intersection(&clip));
            }
        }
        touched
    }
}

fn draw_border(
    grid: &mut CellGrid,
    r: SignedRect,
    chars: BorderChars,
    sides: BorderSides,
    patch: &CellPatch,
) {
    if r.w <= 0 || r.h <= 0 {
        return;
    }
    let (x0, y0) = (r.x, r.y);
    let (x1, y1) = (r.x.saturating_add(r.w - 1), r.y.saturating_add(r.h - 1));
    // Only the part of each edge that can land on the grid.
    let (gx0, gx1) = (x0.max(0), x1.min(i32::from(grid.width()) - 1));
    let (gy0, gy1) = (y0.max(0), y1.min(i32::from(grid.height()) - 1));
    let top = sides.contains(BorderSides::TOP);
    let bottom = sides.contains(BorderSides::BOTTOM) && (y1 != y0 || !top);
    let left = sides.contains(BorderSides::LEFT);
    let right = sides.contains(BorderSides::RIGHT) && (x1 != x0 || !left);

    let mut edge = |y: i32, lc: char, rc: char| {
        for x in gx0..=gx1 {
            let ch = match x {
                _ if x == x0 && left => lc,
                _ if x == x1 && right => rc,
                _ => chars.horizontal,
            };
            put(grid, x, y, &patch.with_char(ch));
        }
    };
    if top {
        edge(y0, chars.top_left, chars.top_right);
    }
    if bottom {
        edge(y1, chars.bottom_left, chars.bottom_right);
    }

    let first = y0.saturating_add(i32::from(top)).max(gy0);
    let last = y1.saturating_sub(i32::from(bottom)).min(gy1);
    let rows = first..=last;
    for y in rows {
        if left {
            put(grid, x0, y, &patch.with_char(chars.vertical));
        }
        if right {
            put(grid, x1, y, &patch.with_char(chars.vertical));
        }
    }
}

/// `line` without its first `n` visible columns. Embedded escape sequences
/// are dropped; a wide character cut in half leaves a blank.
fn skip_columns(line: &str, n: usize) -> String {
    let plain = strip_ansi(line);
    let mut skipped = 0;
    let mut out = String::new();
    for g in plain.graphemes(true) {
        if skipped >= n {
            out.push_str(g);
            continue;
        }
        skipped += grapheme_width(g);
        if skipped > n {
            out.extend(std::iter::repeat_n(' ', skipped - n));
        }
    }
    out
}

/// A stacking context waiting to be painted: the node that starts it and
/// the state its ancestors left behind.
#[derive(Debug, Clone, Copy)]
pub struct StackingContext<'a> {
    pub node: &'a Node,
    pub layer: LayerId,
    pub z_index: i32,
    pub inherited: Inherited,
    pub shift: (i32, i32),
    /// Clip from ancestor overflow, in screen coordinates.
    pub clip: Rect,
    /// Inside a `display: none` subtree, or itself hidden.
    pub hidden: bool,
}

impl<'a> StackingContext<'a> {
    /// The root context: the whole screen on the root layer.
    pub fn root(node: &'a Node, screen: Rect) -> Self {
        Self {
            node,
            layer: LayerId::ROOT,
            z_index: 0,
            inherited: Inherited::default(),
            shift: (0, 0),
            clip: screen,
            hidden: node.display() == Display::None,
        }
    }

    fn nested(node: &'a Node, inherited: Inherited, shift: (i32, i32), clip: Rect) -> Self {
        Self {
            node,
            layer: node.layer_id().unwrap_or_else(|| LayerId::for_node(node.id())),
            z_index: node.style().z_index.unwrap_or(0),
            inherited,
            shift,
            clip,
            hidden: node.display() == Display::None,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }
}

/// What painting one context produced.
#[derive(Debug, Default)]
pub struct Painted<'a> {
    /// Union of everything written, in screen coordinates.
    pub bounds: Rect,
    /// Contexts found below this one, still to be painted.
    pub nested: Vec<StackingContext<'a>>,
}

/// Paints stacking contexts from one layout.
pub struct Painter<'l> {
    layout: &'l Layout,
}

impl<'l> Painter<'l> {
    pub fn new(layout: &'l Layout) -> Self {
        Self { layout }
    }

    /// Paint `ctx` into `grid`, which should be blank and screen-sized.
    pub fn paint<'a>(&self, ctx: &StackingContext<'a>, grid: &mut CellGrid) -> Painted<'a> {
        let mut out = Painted::default();
        if ctx.hidden {
            return out;
        }
        grid.push_clip(ctx.clip);
        self.paint_node(ctx.node, ctx, ctx.inherited, ctx.shift, true, grid, &mut out);
        grid.pop_clip();
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_node<'a>(
        &self,
        node: &'a Node,
        ctx: &StackingContext<'a>,
        inherited: Inherited,
        shift: (i32, i32),
        is_context_root: bool,
        grid: &mut CellGrid,
        out: &mut Painted<'a>,
    ) {
        if !is_context_root && node.creates_stacking_context() {
            let clip = grid.current_clip();
            out.nested.push(StackingContext::nested(node, inherited, shift, clip));
            return;
        }
        if node.display() == Display::None {
            return;
        }
        let Some(computed) = self.layout.get(node.id()) else {
            return;
        };
        let style = node.style();
        let own = inherited.apply(style);
        let pc = PaintContext {
            layer: ctx.layer,
            z_index: ctx.z_index,
            inherited: own,
            shift,
        };
        let touched = node.render(computed, &pc, grid);
        out.bounds = out.bounds.union(&touched);

        let children = node.layout_children();
        if children.is_empty() {
            return;
        }
        let clipped = style.overflow != Overflow::Visible;
        let mut child_shift = shift;
        if clipped {
            let padding_box = SignedRect::border_box(computed, shift).inner(style.border.widths());
            grid.push_clip(padding_box.to_rect());
            if style.overflow == Overflow::Scroll {
                child_shift.0 = child_shift.0.saturating_sub(i32::from(style.scroll_offset.0));
                child_shift.1 = child_shift.1.saturating_sub(i32::from(style.scroll_offset.1));
            }
        }

        let mut order: SmallVec<[&Node; 8]> = children.iter().collect();
        order.sort_by_key(|c| paint_key(c.style()));
        for child in order {
            self.paint_node(child, ctx, own, child_shift, false, grid, out);
        }

        if clipped {
            grid.pop_clip();
        }
    }
}

/// In-flow children first in document order, then out-of-flow children by
/// z-index. The sort is stable.
fn paint_key(style: &Style) -> (bool, i32) {
    match style.position {
        Position::Absolute | Position::Fixed => (true, style.z_index.unwrap_or(0)),
        _ => (false, 0),
    }
}
