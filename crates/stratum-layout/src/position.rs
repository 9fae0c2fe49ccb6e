#![forbid(unsafe_code)]

//! Out-of-flow positioning.
//!
//! Absolutely positioned boxes are laid out once their containing block
//! (nearest positioned ancestor, else the root) has its final size, against
//! that block's padding box. Fixed boxes wait for the whole tree and are
//! placed against the screen. Either kind shrinks to fit unless both insets
//! of an axis are set, which stretches it between them. An axis with no
//! inset keeps the static position: the parent's content origin.

use crate::engine::{Constraints, IRect, LayoutPass, Request, to_u16};
use crate::style::Position;

impl LayoutPass<'_, '_> {
    /// Place every absolutely positioned box whose containing block is `cb`,
    /// now that `cb` is `width` x `height`.
    pub(crate) fn place_absolute_descendants(&mut self, cb: usize, width: i32, height: i32) {
        let border = self.style_of(cb).border.widths();
        let padding_box = IRect { x: 0, y: 0, w: width, h: height }.shrink(border);
        for d in cb + 1..self.slots[cb].end {
            if self.slots[d].containing != Some(cb) {
                continue;
            }
            let static_pos = self.static_position(d, Some(cb));
            self.place_out_of_flow(d, padding_box, static_pos);
        }
    }

    /// Place fixed boxes against `screen`, in document order so an outer
    /// fixed box is settled before anything inside it.
    pub(crate) fn place_fixed_descendants(&mut self, screen: IRect) {
        for d in 1..self.slots.len() {
            if self.style_of(d).position != Position::Fixed {
                continue;
            }
            let static_pos = self.static_position(d, None);
            self.place_out_of_flow(d, screen, static_pos);
        }
    }

    /// Content origin of `d`'s parent, relative to `stop` (or the screen).
    fn static_position(&self, d: usize, stop: Option<usize>) -> (i32, i32) {
        let Some(parent) = self.slots[d].parent else {
            return (0, 0);
        };
        let frame = self.style_of(parent).frame();
        let origin = self.origin_relative_to(parent, stop);
        (
            origin.0.saturating_add(i32::from(frame.left)),
            origin.1.saturating_add(i32::from(frame.top)),
        )
    }

    fn place_out_of_flow(&mut self, d: usize, cb: IRect, static_pos: (i32, i32)) {
        let style = self.style_of(d);
        let m = style.margin;
        let inset = style.inset.clamped();
        let (cb_w, cb_h) = (cb.w.max(0), cb.h.max(0));

        let mut req = Request::new(Constraints {
            max_width: to_u16(cb_w),
            max_height: Some(to_u16(cb_h)),
            available_width: None,
            available_height: Some(to_u16(cb_h)),
        });
        if let (Some(l), Some(r), true) = (inset.left, inset.right, style.width.is_auto()) {
            req = req.with_width((cb_w - l - r - i32::from(m.horizontal_sum())).max(0));
        }
        if let (Some(t), Some(b), true) = (inset.top, inset.bottom, style.height.is_auto()) {
            req = req.with_height((cb_h - t - b - i32::from(m.vertical_sum())).max(0));
        }
        let (w, h) = self.place(d, req);

        let x = match (inset.left, inset.right) {
            (Some(l), _) => cb.x + l + i32::from(m.left),
            (None, Some(r)) => cb.x + cb_w - r - i32::from(m.right) - w,
            (None, None) => static_pos.0.saturating_add(i32::from(m.left)),
        };
        let y = match (inset.top, inset.bottom) {
            (Some(t), _) => cb.y + t + i32::from(m.top),
            (None, Some(b)) => cb.y + cb_h - b - i32::from(m.bottom) - h,
            (None, None) => static_pos.1.saturating_add(i32::from(m.top)),
        };
        self.slots[d].offset = (x, y);

        stratum_core::trace!(node = %self.slots[d].node.id(), x, y, w, h, "out-of-flow box placed");
    }
}

#[cfg(test)]
mod tests {
    use stratum_core::geometry::{Rect, Sides};
    use stratum_core::ids::NodeId;

    use crate::engine::{Constraints, LayoutEngine};
    use crate::node::Node;
    use crate::style::{BorderStyle, Position, Style};

    fn abs() -> Style {
        Style::new().position(Position::Absolute)
    }

    #[test]
    fn right_inset_anchors_to_padding_box_edge() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().width(20).height(5).position(Position::Relative))
            .child(Node::text(NodeId(2), "hello").with_style(abs().right(0)));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 10));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(15, 0, 5, 1)));
    }

    #[test]
    fn insets_are_measured_inside_the_border() {
        let root = Node::new(NodeId(1))
            .with_style(
                Style::new()
                    .width(20)
                    .height(6)
                    .border(BorderStyle::Single)
                    .padding(Sides::all(1))
                    .position(Position::Relative),
            )
            .child(Node::text(NodeId(2), "x").with_style(abs().top(0).left(0)))
            .child(Node::text(NodeId(3), "y").with_style(abs().bottom(0).right(1)));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 10));
        // Padding box is inside the border, not inside the padding.
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(1, 1, 1, 1)));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(17, 4, 1, 1)));
    }

    #[test]
    fn static_position_is_parent_content_origin() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().padding(Sides::new(2, 0, 0, 3)))
            .child(Node::text(NodeId(2), "flow"))
            .child(Node::text(NodeId(3), "float").with_style(abs()));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(30, 10));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(3, 2, 5, 1)));
        // Removed from flow: the parent only holds the first child.
        assert_eq!(l.dimensions(NodeId(1)).map(|s| s.height), Some(3));
    }

    #[test]
    fn both_insets_stretch() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().width(20).height(10).position(Position::Relative))
            .child(Node::new(NodeId(2)).with_style(abs().left(2).right(3).top(1).bottom(1)));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 20));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(2, 1, 15, 8)));
    }

    #[test]
    fn containing_block_is_nearest_positioned_ancestor() {
        let root = Node::new(NodeId(1)).with_style(Style::new().height(10)).child(
            Node::new(NodeId(2))
                .with_style(Style::new().width(10).height(4).margin(Sides::new(3, 0, 0, 5)).position(Position::Relative))
                .child(
                    Node::new(NodeId(3))
                        .child(Node::text(NodeId(4), "deep").with_style(abs().bottom(0).left(1))),
                ),
        );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 20));
        assert_eq!(l.bounds(NodeId(4)), Some(Rect::new(6, 6, 4, 1)));
    }

    #[test]
    fn fixed_ignores_ancestors() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().padding(Sides::all(2)).position(Position::Relative))
            .child(
                Node::text(NodeId(2), "status")
                    .with_style(Style::new().position(Position::Fixed).bottom(0).right(0)),
            );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(30, 10));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(24, 9, 6, 1)));
    }

    #[test]
    fn relative_offset_does_not_move_siblings() {
        let root = Node::new(NodeId(1))
            .child(Node::text(NodeId(2), "a").with_style(Style::new().position(Position::Relative).top(1).left(2)))
            .child(Node::text(NodeId(3), "b"));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(10, 5));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(2, 1, 1, 1)));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(0, 1, 1, 1)));
    }

    #[test]
    fn container_grows_to_hold_shifted_children() {
        let root = Node::new(NodeId(1)).child(
            Node::new(NodeId(2)).child(
                Node::text(NodeId(3), "down").with_style(Style::new().position(Position::Relative).top(3)),
            ),
        );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(10, 10));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(0, 3, 4, 1)));
        assert_eq!(l.dimensions(NodeId(2)).map(|s| s.height), Some(4));
        assert_eq!(l.dimensions(NodeId(1)).map(|s| s.height), Some(4));
    }

    #[test]
    fn hidden_overflow_does_not_grow() {
        let root = Node::new(NodeId(1)).child(
            Node::new(NodeId(2))
                .with_style(Style::new().overflow(crate::style::Overflow::Hidden))
                .child(
                    Node::text(NodeId(3), "down")
                        .with_style(Style::new().position(Position::Relative).top(3)),
                ),
        );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(10, 10));
        assert_eq!(l.dimensions(NodeId(2)).map(|s| s.height), Some(1));
    }

    #[test]
    fn absolute_child_moves_with_repositioned_parent() {
        // The containing block is placed by its parent after its own
        // layout; the absolute child must follow.
        let root = Node::new(NodeId(1))
            .with_style(Style::new().flex_direction(crate::style::FlexDirection::Row))
            .child(Node::new(NodeId(2)).with_style(Style::new().width(7).height(1)))
            .child(
                Node::new(NodeId(3))
                    .with_style(Style::new().width(6).height(3).position(Position::Relative))
                    .child(Node::text(NodeId(4), "z").with_style(abs().top(1).left(1))),
            );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(30, 10));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(7, 0, 6, 3)));
        assert_eq!(l.bounds(NodeId(4)), Some(Rect::new(8, 1, 1, 1)));
    }
}
