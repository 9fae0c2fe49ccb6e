#![forbid(unsafe_code)]

//! The layout engine: turns a [`Node`] tree and [`Constraints`] into a
//! [`Layout`] of computed boxes.
//!
//! # Algorithm
//!
//! The tree is flattened into a pre-order slot table, so each node's
//! descendants occupy the contiguous range `idx + 1 .. slots[idx].end`.
//! Every slot records its border-box size and an offset relative to an
//! *anchor*: its parent for in-flow boxes, its containing block for
//! absolutely positioned boxes, or the screen for fixed boxes. A node is
//! always laid out at its own origin; moving it later never touches its
//! descendants, and absolute coordinates are resolved in a single pre-order
//! sweep at the end.
//!
//! Sizing follows the box model:
//!
//! - explicit `width`/`height` are border-box sizes; percentages resolve
//!   against the available size of the containing block,
//! - an auto width fills the available width minus margins, or shrinks to
//!   fit the content when no available width is given (flex items,
//!   absolutely positioned boxes, left-aligned text),
//! - an auto height is the height of the content,
//! - content never goes negative: a box whose frame eats its explicit size
//!   keeps one content cell.
//!
//! Measurements are memoized per `(NodeId, request)` for the duration of one
//! [`LayoutEngine::compute_layout`] call.

use std::collections::HashMap;

use smallvec::SmallVec;
use stratum_core::geometry::{Rect, Sides, Size};
use stratum_core::ids::NodeId;

use crate::node::{LaidOut, Node, NodeKind, Styled};
use crate::style::{Display, MAX_EXTENT, Overflow, Position, Style, TextAlign};
use crate::text::{max_line_width, wrap_text};

/// Space offered to a node by its parent.
///
/// `available_width: None` asks the node to shrink to fit its content
/// (never wider than `max_width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraints {
    pub max_width: u16,
    pub max_height: Option<u16>,
    pub available_width: Option<u16>,
    pub available_height: Option<u16>,
}

impl Constraints {
    /// A screen of `width` x `height` cells: the root fills the width and
    /// percentages of either axis resolve against the screen.
    pub const fn viewport(width: u16, height: u16) -> Self {
        Self {
            max_width: width,
            max_height: Some(height),
            available_width: Some(width),
            available_height: Some(height),
        }
    }

    /// Shrink to fit, at most `max_width` wide.
    pub const fn shrink_to_fit(max_width: u16) -> Self {
        Self {
            max_width,
            max_height: None,
            available_width: None,
            available_height: None,
        }
    }

    /// Fill `width`, with an unconstrained height.
    pub const fn width(width: u16) -> Self {
        Self {
            max_width: width,
            max_height: None,
            available_width: Some(width),
            available_height: None,
        }
    }
}

/// Resolved geometry of one node, in screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedBox {
    pub node: NodeId,
    pub parent: Option<NodeId>,
    pub margin_box: Rect,
    pub border_box: Rect,
    pub padding_box: Rect,
    pub content_box: Rect,
    /// Unclamped top-left of the border box. Differs from `border_box`
    /// only when the box starts left of or above the screen.
    pub origin: (i32, i32),
    /// Wrapped text lines, for text nodes.
    pub lines: Vec<String>,
}

/// The per-node answer to "where did this go": size, placement, and the
/// placement of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResult {
    pub dimensions: Size,
    pub bounds: Rect,
    pub child_bounds: Vec<Rect>,
}

/// Output of [`LayoutEngine::compute_layout`].
#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: Vec<ComputedBox>,
    children: Vec<SmallVec<[usize; 4]>>,
    index: HashMap<NodeId, usize>,
    viewport: Size,
}

impl Layout {
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&ComputedBox> {
        self.index.get(&id).map(|&i| &self.boxes[i])
    }

    pub fn result_for(&self, id: NodeId) -> Option<LayoutResult> {
        let &i = self.index.get(&id)?;
        let bounds = self.boxes[i].border_box;
        Some(LayoutResult {
            dimensions: bounds.size(),
            bounds,
            child_bounds: self.children[i]
                .iter()
                .map(|&c| self.boxes[c].border_box)
                .collect(),
        })
    }

    pub fn dimensions(&self, id: NodeId) -> Option<Size> {
        self.get(id).map(|b| b.border_box.size())
    }

    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.get(id).map(|b| b.border_box)
    }

    pub fn child_bounds(&self, id: NodeId) -> Vec<Rect> {
        self.result_for(id)
            .map(|r| r.child_bounds)
            .unwrap_or_default()
    }

    /// Children of `id` that were laid out, in document order.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &ComputedBox> + '_ {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&i| self.children[i].iter().map(move |&c| &self.boxes[c]))
    }

    #[inline]
    pub fn root(&self) -> Option<&ComputedBox> {
        self.boxes.first()
    }

    /// All boxes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &ComputedBox> + '_ {
        self.boxes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Size of the screen the layout was computed for.
    #[inline]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Union of every border box.
    pub fn content_bounds(&self) -> Rect {
        self.boxes
            .iter()
            .fold(Rect::default(), |acc, b| acc.union(&b.border_box))
    }
}

/// Counters for the most recent layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Nodes that took part in layout.
    pub nodes: usize,
    /// Times a node's layout algorithm actually ran.
    pub layouts: u64,
    /// Measurements answered from the memo table.
    pub cache_hits: u64,
    /// Placements skipped because the node was already laid out with the
    /// same request.
    pub reused: u64,
}

/// Stateful layout driver. Keeps its memo table allocated between calls.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    memo: HashMap<(NodeId, Request), (i32, i32)>,
    stats: LayoutStats,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `root` and everything below it.
    ///
    /// Nodes with `display: none` (and their subtrees) are left out of the
    /// result.
    pub fn compute_layout(&mut self, root: &Node, constraints: Constraints) -> Layout {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "compute_layout",
            root = %root.id(),
            max_width = constraints.max_width
        )
        .entered();

        self.memo.clear();
        self.stats = LayoutStats::default();

        let viewport = Size::new(
            constraints.available_width.unwrap_or(constraints.max_width),
            constraints
                .available_height
                .or(constraints.max_height)
                .unwrap_or(0),
        );
        if root.display() == Display::None {
            return Layout {
                viewport,
                ..Layout::default()
            };
        }

        let mut pass = LayoutPass {
            slots: Vec::new(),
            memo: &mut self.memo,
            stats: &mut self.stats,
        };
        pass.build(root, None);
        pass.stats.nodes = pass.slots.len();

        let (_, root_h) = pass.place(0, Request::new(constraints));
        let root_style = pass.style_of(0);
        let (dx, dy) = relative_shift(root_style);
        pass.slots[0].offset = (
            i32::from(root_style.margin.left) + dx,
            i32::from(root_style.margin.top) + dy,
        );

        let screen = IRect {
            x: 0,
            y: 0,
            w: i32::from(viewport.width),
            h: if viewport.height > 0 {
                i32::from(viewport.height)
            } else {
                root_h
            },
        };
        pass.place_fixed_descendants(screen);

        let layout = pass.finish(viewport);
        stratum_core::debug!(
            nodes = self.stats.nodes,
            layouts = self.stats.layouts,
            cache_hits = self.stats.cache_hits,
            reused = self.stats.reused,
            "layout computed"
        );
        layout
    }

    /// Counters from the last [`compute_layout`](Self::compute_layout).
    #[inline]
    pub fn stats(&self) -> LayoutStats {
        self.stats
    }
}

// ---------------------------------------------------------------------------
// Internals shared by the block, flex, grid, and positioning passes.
// ---------------------------------------------------------------------------

/// What a parent asks of a child: constraints plus optional forced
/// border-box sizes (flex main sizes, stretched cross sizes, insets that
/// pin both edges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Request {
    pub cons: Constraints,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl Request {
    pub(crate) const fn new(cons: Constraints) -> Self {
        Self {
            cons,
            width: None,
            height: None,
        }
    }

    pub(crate) const fn with_width(mut self, width: i32) -> Self {
        self.width = Some(width);
        self
    }

    pub(crate) const fn with_height(mut self, height: i32) -> Self {
        self.height = Some(height);
        self
    }
}

/// Signed rectangle used before clamping to screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// The area a container lays its children into, relative to the
/// container's border-box origin.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContentBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    /// `None` while the container's height depends on its content.
    pub height: Option<i32>,
    /// Measuring max-content width: children shrink to fit and nothing
    /// grows into free space.
    pub shrink: bool,
}

impl ContentBox {
    /// Constraints for an in-flow child of a block or grid area.
    pub(crate) fn child_constraints(&self) -> Constraints {
        let width = to_u16(self.width);
        let height = self.height.map(to_u16);
        Constraints {
            max_width: width,
            max_height: height,
            available_width: (!self.shrink).then_some(width),
            available_height: height,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Slot<'n> {
    pub node: &'n Node,
    pub parent: Option<usize>,
    /// Exclusive end of this node's subtree range.
    pub end: usize,
    pub children: SmallVec<[usize; 4]>,
    /// Nearest positioned ancestor (root as fallback) for absolute boxes.
    pub containing: Option<usize>,
    /// What `offset` is relative to; `None` is the screen.
    pub anchor: Option<usize>,
    pub offset: (i32, i32),
    pub size: (i32, i32),
    pub lines: Vec<String>,
    pub placed_with: Option<Request>,
}

pub(crate) struct LayoutPass<'n, 'e> {
    pub slots: Vec<Slot<'n>>,
    memo: &'e mut HashMap<(NodeId, Request), (i32, i32)>,
    pub stats: &'e mut LayoutStats,
}

impl<'n> LayoutPass<'n, '_> {
    fn build(&mut self, node: &'n Node, parent: Option<usize>) -> usize {
        let idx = self.slots.len();
        let position = node.style().position;
        let containing = match position {
            Position::Absolute => Some(self.nearest_positioned(parent).unwrap_or(0)),
            _ => None,
        };
        let anchor = match position {
            Position::Absolute => containing,
            Position::Fixed => None,
            _ => parent,
        };
        self.slots.push(Slot {
            node,
            parent,
            end: idx + 1,
            children: SmallVec::new(),
            containing,
            anchor,
            offset: (0, 0),
            size: (0, 0),
            lines: Vec::new(),
            placed_with: None,
        });
        for child in node.layout_children() {
            if child.display() == Display::None {
                continue;
            }
            let c = self.build(child, Some(idx));
            self.slots[idx].children.push(c);
        }
        self.slots[idx].end = self.slots.len();
        idx
    }

    fn nearest_positioned(&self, mut at: Option<usize>) -> Option<usize> {
        while let Some(i) = at {
            if self.style_of(i).position.is_positioned() {
                return Some(i);
            }
            at = self.slots[i].parent;
        }
        None
    }

    #[inline]
    pub(crate) fn style_of(&self, idx: usize) -> &'n Style {
        let node: &'n Node = self.slots[idx].node;
        node.style()
    }

    /// Children that take part in normal flow.
    pub(crate) fn in_flow_children(&self, idx: usize) -> SmallVec<[usize; 8]> {
        self.slots[idx]
            .children
            .iter()
            .copied()
            .filter(|&c| !self.style_of(c).position.is_out_of_flow())
            .collect()
    }

    /// Record where flow put `child` (border-box origin, relative to its
    /// parent), shifted by any relative offset.
    pub(crate) fn set_flow_offset(&mut self, child: usize, x: i32, y: i32) {
        let (dx, dy) = relative_shift(self.style_of(child));
        self.slots[child].offset = (x.saturating_add(dx), y.saturating_add(dy));
    }

    /// Size of `idx` under `req`, from the memo table when possible. The
    /// node's subtree may be left laid out for a different request; call
    /// [`place`](Self::place) before positioning it.
    pub(crate) fn measure(&mut self, idx: usize, req: Request) -> (i32, i32) {
        let key = (self.slots[idx].node.id(), req);
        if let Some(&size) = self.memo.get(&key) {
            self.stats.cache_hits += 1;
            return size;
        }
        self.place(idx, req)
    }

    /// Lay out `idx` (and its subtree) for `req`; returns the border-box
    /// size. The caller positions the node afterwards.
    pub(crate) fn place(&mut self, idx: usize, req: Request) -> (i32, i32) {
        if self.slots[idx].placed_with == Some(req) {
            self.stats.reused += 1;
            return self.slots[idx].size;
        }
        let size = self.layout_node(idx, req);
        self.slots[idx].placed_with = Some(req);
        self.memo.insert((self.slots[idx].node.id(), req), size);
        size
    }

    fn layout_node(&mut self, idx: usize, req: Request) -> (i32, i32) {
        self.stats.layouts += 1;
        let node: &'n Node = self.slots[idx].node;
        let style = self.style_of(idx);
        let margin = style.margin;
        let frame = style.frame();
        let (mh, fh, fv) = (
            i32::from(margin.horizontal_sum()),
            i32::from(frame.horizontal_sum()),
            i32::from(frame.vertical_sum()),
        );
        let cons = req.cons;

        let base_w = Some(i32::from(cons.available_width.unwrap_or(cons.max_width)));
        let base_h = cons.available_height.or(cons.max_height).map(i32::from);
        let (min_w, max_w) = (style.min_width.resolve(base_w), style.max_width.resolve(base_w));
        let (min_h, max_h) = (
            style.min_height.resolve(base_h),
            style.max_height.resolve(base_h),
        );

        let fills = match node.kind() {
            NodeKind::Text(_) => style.text_align != TextAlign::Left,
            NodeKind::Box | NodeKind::Spacer => true,
        };

        // Width.
        let explicit_w = req.width.or_else(|| style.width.resolve(base_w));
        let explicit_h = req
            .height
            .or_else(|| style.height.resolve(base_h))
            .map(|h| clamp_size(h, min_h, max_h));
        let mut width = match (explicit_w, cons.available_width) {
            (Some(w), _) => w,
            (None, Some(avail)) if fills => i32::from(avail) - mh,
            _ => {
                let cap = clamp_max(i32::from(cons.max_width) - mh, max_w);
                let cap_content = (cap - fh).max(0);
                let measuring = ContentBox {
                    x: i32::from(frame.left),
                    y: i32::from(frame.top),
                    width: cap_content,
                    height: explicit_h.map(|h| (h - fv).max(0)),
                    shrink: true,
                };
                let (intrinsic, _) = self.content_extent(idx, measuring);
                intrinsic.min(cap_content) + fh
            }
        };
        width = clamp_size(width, min_w, max_w);
        width = keep_content_cell(width, fh, explicit_w.is_some());

        // Height, when known up front.
        let content_h = explicit_h.map(|h| keep_content_cell(h, fv, true) - fv);

        let content = ContentBox {
            x: i32::from(frame.left),
            y: i32::from(frame.top),
            width: width - fh,
            height: content_h,
            shrink: false,
        };
        let (_, extent_h) = self.content_extent(idx, content);
        let mut height = match content_h {
            Some(h) => h.saturating_add(fv),
            None => clamp_size(extent_h.saturating_add(fv), min_h, max_h),
        };

        if style.position.is_positioned() || self.slots[idx].parent.is_none() {
            self.place_absolute_descendants(idx, width, height);
        }

        // Grow on auto axes to contain children drawn past the flow extent.
        if style.overflow == Overflow::Visible {
            let (reach_w, reach_h) = self.visual_reach(idx, &content);
            if explicit_w.is_none() {
                width = clamp_max(width.max(reach_w.saturating_add(fh)), max_w).max(width);
            }
            if explicit_h.is_none() {
                height = clamp_max(height.max(reach_h.saturating_add(fv)), max_h).max(height);
            }
        }

        let size = (width.clamp(0, MAX_EXTENT), height.clamp(0, MAX_EXTENT));
        self.slots[idx].size = size;
        size
    }

    /// Run the node's own algorithm for `content`; returns the extent of
    /// what was laid out, relative to the content origin.
    fn content_extent(&mut self, idx: usize, content: ContentBox) -> (i32, i32) {
        let node: &'n Node = self.slots[idx].node;
        let style = self.style_of(idx);
        match node.kind() {
            NodeKind::Text(text) => {
                let lines = wrap_text(text, content.width.max(0) as usize, style.text_wrap);
                let extent = (max_line_width(&lines) as i32, lines.len() as i32);
                self.slots[idx].lines = lines;
                extent
            }
            NodeKind::Spacer => (0, 0),
            NodeKind::Box => match style.display {
                Display::Block | Display::None => self.layout_block(idx, content),
                Display::Flex => self.layout_flex(idx, content),
                Display::Grid => self.layout_grid(idx, content),
            },
        }
    }

    /// Furthest right and bottom edges (margins included) of anything
    /// anchored to `idx`, relative to its content origin.
    fn visual_reach(&self, idx: usize, content: &ContentBox) -> (i32, i32) {
        let mut reach = (0, 0);
        for i in idx + 1..self.slots[idx].end {
            let slot = &self.slots[i];
            if slot.anchor != Some(idx) {
                continue;
            }
            let margin = self.style_of(i).margin;
            let right = slot
                .offset
                .0
                .saturating_add(slot.size.0)
                .saturating_add(i32::from(margin.right))
                .saturating_sub(content.x);
            let bottom = slot
                .offset
                .1
                .saturating_add(slot.size.1)
                .saturating_add(i32::from(margin.bottom))
                .saturating_sub(content.y);
            reach = (reach.0.max(right), reach.1.max(bottom));
        }
        reach
    }

    /// Offset of `idx` relative to `stop`'s border-box origin, following
    /// anchors. With `stop: None` the result is in screen coordinates.
    pub(crate) fn origin_relative_to(&self, idx: usize, stop: Option<usize>) -> (i32, i32) {
        let mut at = idx;
        let mut acc: (i32, i32) = (0, 0);
        while Some(at) != stop {
            let slot = &self.slots[at];
            acc.0 = acc.0.saturating_add(slot.offset.0);
            acc.1 = acc.1.saturating_add(slot.offset.1);
            match slot.anchor {
                Some(a) => at = a,
                None => break,
            }
        }
        acc
    }

    fn finish(mut self, viewport: Size) -> Layout {
        let mut origins: Vec<(i32, i32)> = Vec::with_capacity(self.slots.len());
        for i in 0..self.slots.len() {
            let slot = &self.slots[i];
            let base = slot.anchor.map_or((0, 0), |a| origins[a]);
            origins.push((
                base.0.saturating_add(slot.offset.0),
                base.1.saturating_add(slot.offset.1),
            ));
        }

        let ids: Vec<NodeId> = self.slots.iter().map(|s| s.node.id()).collect();
        let mut layout = Layout {
            boxes: Vec::with_capacity(self.slots.len()),
            children: Vec::with_capacity(self.slots.len()),
            index: HashMap::with_capacity(self.slots.len()),
            viewport,
        };
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let style = slot.node.style();
            let (x, y) = origins[i];
            let (w, h) = slot.size;
            let outer = IRect { x, y, w, h };
            layout.index.insert(ids[i], i);
            layout.boxes.push(ComputedBox {
                node: ids[i],
                parent: slot.parent.map(|p| ids[p]),
                margin_box: outer.grow(style.margin).to_rect(),
                border_box: outer.to_rect(),
                padding_box: outer.shrink(style.border.widths()).to_rect(),
                content_box: outer.shrink(style.frame()).to_rect(),
                origin: (x, y),
                lines: std::mem::take(&mut slot.lines),
            });
            layout.children.push(std::mem::take(&mut slot.children));
        }
        layout
    }
}

impl IRect {
    pub(crate) fn to_rect(self) -> Rect {
        Rect::from_signed(self.x, self.y, self.w, self.h)
    }

    fn grow(self, sides: Sides) -> Self {
        Self {
            x: self.x - i32::from(sides.left),
            y: self.y - i32::from(sides.top),
            w: self.w + i32::from(sides.horizontal_sum()),
            h: self.h + i32::from(sides.vertical_sum()),
        }
    }

    pub(crate) fn shrink(self, sides: Sides) -> Self {
        Self {
            x: self.x + i32::from(sides.left),
            y: self.y + i32::from(sides.top),
            w: (self.w - i32::from(sides.horizontal_sum())).max(0),
            h: (self.h - i32::from(sides.vertical_sum())).max(0),
        }
    }
}

/// Visual shift of a relatively positioned (or sticky) box.
fn relative_shift(style: &Style) -> (i32, i32) {
    if style.position.is_offset_in_flow() {
        style.inset.relative_offset()
    } else {
        (0, 0)
    }
}

#[inline]
pub(crate) fn to_u16(v: i32) -> u16 {
    v.clamp(0, i32::from(u16::MAX)) as u16
}

#[inline]
pub(crate) fn clamp_max(v: i32, max: Option<i32>) -> i32 {
    max.map_or(v, |m| v.min(m))
}

/// Apply `max` then `min`, so `min` wins when they conflict.
#[inline]
pub(crate) fn clamp_size(v: i32, min: Option<i32>, max: Option<i32>) -> i32 {
    let v = clamp_max(v, max);
    min.map_or(v, |m| v.max(m))
}

/// A border-box size that leaves at least one content cell when it is
/// explicit and framed, and never a negative content size.
fn keep_content_cell(size: i32, frame: i32, explicit: bool) -> i32 {
    let content = size - frame;
    if content < 0 || (explicit && frame > 0 && content == 0) {
        frame + 1
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderStyle, Dimension};

    fn layout(root: &Node, w: u16, h: u16) -> Layout {
        LayoutEngine::new().compute_layout(root, Constraints::viewport(w, h))
    }

    #[test]
    fn root_fills_viewport_width() {
        let root = Node::new(NodeId(1));
        let l = layout(&root, 40, 10);
        assert_eq!(l.bounds(NodeId(1)), Some(Rect::new(0, 0, 40, 0)));
        assert_eq!(l.viewport(), Size::new(40, 10));
    }

    #[test]
    fn explicit_size_is_border_box() {
        let root = Node::new(NodeId(1)).with_style(
            Style::new()
                .width(10)
                .height(5)
                .border(BorderStyle::Single)
                .padding(Sides::all(1)),
        );
        let l = layout(&root, 40, 10);
        let b = l.get(NodeId(1)).cloned();
        let b = b.map(|b| (b.border_box, b.padding_box, b.content_box));
        assert_eq!(
            b,
            Some((
                Rect::new(0, 0, 10, 5),
                Rect::new(1, 1, 8, 3),
                Rect::new(2, 2, 6, 1),
            ))
        );
    }

    #[test]
    fn frame_larger_than_size_keeps_one_content_cell() {
        let root = Node::new(NodeId(1)).with_style(
            Style::new()
                .width(2)
                .height(2)
                .border(BorderStyle::Single),
        );
        let l = layout(&root, 40, 10);
        assert_eq!(l.dimensions(NodeId(1)), Some(Size::new(3, 3)));
        assert_eq!(l.get(NodeId(1)).map(|b| b.content_box.size()), Some(Size::new(1, 1)));
    }

    #[test]
    fn margins_offset_the_root() {
        let root = Node::new(NodeId(1)).with_style(Style::new().margin(Sides::new(1, 2, 0, 3)).height(2));
        let l = layout(&root, 20, 5);
        assert_eq!(l.bounds(NodeId(1)), Some(Rect::new(3, 1, 15, 2)));
        assert_eq!(
            l.get(NodeId(1)).map(|b| b.margin_box),
            Some(Rect::new(0, 0, 20, 3))
        );
    }

    #[test]
    fn percentages_resolve_against_viewport() {
        let root = Node::new(NodeId(1)).with_style(
            Style::new()
                .width(Dimension::Percent(50.0))
                .height(Dimension::Percent(25.0)),
        );
        let l = layout(&root, 40, 20);
        assert_eq!(l.dimensions(NodeId(1)), Some(Size::new(20, 5)));
    }

    #[test]
    fn left_aligned_text_shrinks_centered_text_fills() {
        let root = Node::new(NodeId(1))
            .child(Node::text(NodeId(2), "hello"))
            .child(Node::text(NodeId(3), "hi").with_style(Style::new().text_align(TextAlign::Center)));
        let l = layout(&root, 30, 5);
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(0, 0, 5, 1)));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(0, 1, 30, 1)));
    }

    #[test]
    fn text_wraps_to_content_width() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().width(7))
            .child(Node::text(NodeId(2), "one two three"));
        let l = layout(&root, 30, 5);
        let text = l.get(NodeId(2)).cloned();
        assert_eq!(text.as_ref().map(|b| b.lines.clone()), Some(vec![
            "one two".to_string(),
            "three".to_string(),
        ]));
        assert_eq!(text.map(|b| b.border_box), Some(Rect::new(0, 0, 7, 2)));
    }

    #[test]
    fn display_none_is_left_out() {
        let root = Node::new(NodeId(1))
            .child(Node::text(NodeId(2), "gone").with_style(Style::new().display(Display::None)))
            .child(Node::text(NodeId(3), "here"));
        let l = layout(&root, 20, 5);
        assert!(l.get(NodeId(2)).is_none());
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(0, 0, 4, 1)));
        assert_eq!(l.child_bounds(NodeId(1)), vec![Rect::new(0, 0, 4, 1)]);
    }

    #[test]
    fn parents_are_recorded() {
        let root = Node::new(NodeId(1)).child(Node::new(NodeId(2)).child(Node::text(NodeId(3), "x")));
        let l = layout(&root, 10, 5);
        assert_eq!(l.get(NodeId(1)).and_then(|b| b.parent), None);
        assert_eq!(l.get(NodeId(3)).and_then(|b| b.parent), Some(NodeId(2)));
        let kids: Vec<NodeId> = l.children_of(NodeId(1)).map(|b| b.node).collect();
        assert_eq!(kids, vec![NodeId(2)]);
    }

    #[test]
    fn measurements_are_memoized() {
        let mut row = Node::new(NodeId(1)).with_style(Style::new().flex_direction(crate::style::FlexDirection::Row));
        for i in 2..6 {
            row = row.child(Node::text(NodeId(i), "item"));
        }
        let mut engine = LayoutEngine::new();
        engine.compute_layout(&row, Constraints::viewport(40, 10));
        let first = engine.stats();
        assert_eq!(first.nodes, 5);
        assert!(first.layouts >= 5);
        engine.compute_layout(&row, Constraints::viewport(40, 10));
        assert_eq!(engine.stats(), first);
    }

    #[test]
    fn result_for_unknown_node_is_none() {
        let l = layout(&Node::new(NodeId(1)), 10, 5);
        assert!(l.result_for(NodeId(7)).is_none());
        assert!(l.child_bounds(NodeId(7)).is_empty());
    }

    #[test]
    fn hidden_root_gives_empty_layout() {
        let root = Node::new(NodeId(1)).with_style(Style::new().display(Display::None));
        let l = layout(&root, 10, 5);
        assert!(l.is_empty());
        assert_eq!(l.content_bounds(), Rect::default());
    }

    #[test]
    fn huge_percentages_are_clamped() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().padding(Sides::all(1)))
            .child(Node::new(NodeId(2)).with_style(Style::from_declarations([("width", "1e30%")])));
        let l = layout(&root, 40, 10);
        let child = l.get(NodeId(2)).cloned();
        assert_eq!(child.as_ref().map(|b| b.origin), Some((1, 1)));
        assert_eq!(child.map(|b| b.border_box.width), Some(u16::MAX - 1));
        assert_eq!(l.dimensions(NodeId(1)).map(|s| s.width), Some(u16::MAX));
    }

    #[test]
    fn extreme_insets_and_margins_stay_in_range() {
        let root = Node::new(NodeId(1))
            .with_style(Style::from_inline("position: relative; width: 65535; padding: 65535"))
            .child(Node::text(NodeId(2), "far").with_style(Style::from_inline(
                "position: absolute; left: -2147483648; bottom: 2147483647; margin: 65535",
            )))
            .child(Node::text(NodeId(3), "near").with_style(Style::from_inline(
                "position: relative; top: 2147483647; right: -2147483648",
            )));
        let l = layout(&root, 40, 10);
        assert_eq!(l.len(), 3);
        let near = l.get(NodeId(3)).map(|b| b.origin);
        assert!(near.is_some_and(|(x, y)| x >= MAX_EXTENT && y >= MAX_EXTENT));
        assert!(l.get(NodeId(2)).is_some());
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        fn tree(widths: &[u16]) -> Node {
            Node::new(NodeId(1)).with_children(widths.iter().enumerate().map(|(i, &w)| {
                Node::new(NodeId(i as u32 + 2)).with_style(Style::new().width(w).height(1))
            }))
        }

        fn extreme_value(key: &'static str) -> impl Strategy<Value = String> {
            let numeric = prop_oneof![
                Just("0".to_string()),
                Just("65535".to_string()),
                Just("1e30%".to_string()),
                Just("3.4e38%".to_string()),
                Just("2147483647".to_string()),
                Just("-2147483648".to_string()),
                Just("auto".to_string()),
                any::<u16>().prop_map(|n| n.to_string()),
                (0.0f32..1e6).prop_map(|p| format!("{p}%")),
            ];
            match key {
                "display" => prop_oneof![Just("block"), Just("flex"), Just("grid")]
                    .prop_map(str::to_string)
                    .boxed(),
                "position" => prop_oneof![
                    Just("static"),
                    Just("relative"),
                    Just("absolute"),
                    Just("fixed"),
                    Just("sticky"),
                ]
                .prop_map(str::to_string)
                .boxed(),
                "flex-wrap" => prop_oneof![Just("wrap"), Just("nowrap")].prop_map(str::to_string).boxed(),
                "grid-column" | "grid-row" => prop_oneof![
                    Just("auto".to_string()),
                    Just("65535".to_string()),
                    Just("span 65535".to_string()),
                    (1u16..2000, 1u16..2000).prop_map(|(a, b)| format!("{a} / span {b}")),
                ]
                .boxed(),
                "grid-template-columns" | "grid-template-rows" => prop_oneof![
                    Just("65535 1fr".to_string()),
                    Just("1fr 65535fr auto".to_string()),
                    Just("auto auto".to_string()),
                ]
                .boxed(),
                "flex-grow" | "flex-shrink" => prop_oneof![
                    Just("0".to_string()),
                    Just("3.4e38".to_string()),
                    (0.0f32..1e9).prop_map(|f| f.to_string()),
                ]
                .boxed(),
                _ => numeric.boxed(),
            }
        }

        const KEYS: &[&str] = &[
            "width",
            "height",
            "min-width",
            "min-height",
            "max-width",
            "max-height",
            "margin",
            "padding",
            "gap",
            "top",
            "left",
            "right",
            "bottom",
            "flex-basis",
            "flex-grow",
            "flex-shrink",
            "flex-wrap",
            "grid-template-columns",
            "grid-template-rows",
            "grid-column",
            "grid-row",
            "position",
            "display",
        ];

        fn declarations() -> impl Strategy<Value = Vec<(&'static str, String)>> {
            let one = proptest::sample::select(KEYS).prop_flat_map(|key| (Just(key), extreme_value(key)));
            proptest::collection::vec(one, 0..6)
        }

        fn styled(decls: &[(&'static str, String)]) -> Style {
            Style::from_declarations(decls.iter().map(|(k, v)| (*k, v.as_str())))
        }

        proptest! {
            #[test]
            fn boxes_nest(widths in proptest::collection::vec(1u16..30, 0..12), vw in 1u16..60) {
                let root = tree(&widths);
                let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(vw, 40));
                for b in l.iter() {
                    prop_assert!(b.margin_box.contains_rect(&b.border_box));
                    prop_assert!(b.border_box.contains_rect(&b.padding_box));
                    prop_assert!(b.padding_box.contains_rect(&b.content_box));
                }
            }

            #[test]
            fn extreme_declarations_lay_out(
                outer in declarations(),
                kids in proptest::collection::vec((declarations(), declarations()), 0..4),
            ) {
                let root = Node::new(NodeId(1))
                    .with_style(styled(&outer).padding(Sides::all(1)))
                    .with_children(kids.iter().enumerate().map(|(i, (own, inner))| {
                        let id = 10 * (i as u32 + 1);
                        Node::new(NodeId(id))
                            .with_style(styled(own))
                            .child(Node::text(NodeId(id + 1), "cell").with_style(styled(inner)))
                    }));
                let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 10));
                for b in l.iter() {
                    prop_assert!(b.margin_box.contains_rect(&b.border_box));
                    prop_assert!(b.border_box.contains_rect(&b.padding_box));
                    prop_assert!(b.padding_box.contains_rect(&b.content_box));
                }
            }

            #[test]
            fn layout_is_deterministic(widths in proptest::collection::vec(1u16..30, 0..8)) {
                let root = tree(&widths);
                let mut engine = LayoutEngine::new();
                let a = engine.compute_layout(&root, Constraints::viewport(50, 20));
                let b = engine.compute_layout(&root, Constraints::viewport(50, 20));
                let a: Vec<_> = a.iter().cloned().collect();
                let b: Vec<_> = b.iter().cloned().collect();
                prop_assert_eq!(a, b);
            }
        }
    }
}
