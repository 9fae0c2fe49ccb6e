#![forbid(unsafe_code)]

//! Block flow: children stack top to bottom, separated by the row gap.

use crate::engine::{ContentBox, LayoutPass, Request};

impl LayoutPass<'_, '_> {
    pub(crate) fn layout_block(&mut self, idx: usize, content: ContentBox) -> (i32, i32) {
        let gap = i32::from(self.style_of(idx).effective_row_gap());
        let cons = content.child_constraints();

        let mut cursor: i32 = 0;
        let mut widest = 0;
        for (n, child) in self.in_flow_children(idx).into_iter().enumerate() {
            if n > 0 {
                cursor = cursor.saturating_add(gap);
            }
            let margin = self.style_of(child).margin;
            let (w, h) = self.place(child, Request::new(cons));
            let x = content.x + i32::from(margin.left);
            let y = content.y.saturating_add(cursor).saturating_add(i32::from(margin.top));
            self.set_flow_offset(child, x, y);
            cursor = cursor
                .saturating_add(h)
                .saturating_add(i32::from(margin.vertical_sum()));
            widest = widest.max(w.saturating_add(i32::from(margin.horizontal_sum())));
        }
        (widest, cursor)
    }
}

#[cfg(test)]
mod tests {
    use stratum_core::geometry::{Rect, Sides};
    use stratum_core::ids::NodeId;

    use crate::engine::{Constraints, LayoutEngine};
    use crate::node::Node;
    use crate::style::{Dimension, Style};

    #[test]
    fn children_stack_with_margins_and_gap() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().row_gap(1).padding(Sides::all(1)))
            .child(Node::new(NodeId(2)).with_style(Style::new().height(2)))
            .child(
                Node::new(NodeId(3))
                    .with_style(Style::new().height(1).margin(Sides::new(1, 0, 0, 2))),
            );
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(20, 10));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(1, 1, 18, 2)));
        // gap 1, then top margin 1
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(3, 5, 16, 1)));
        // 1 padding + 2 + 1 gap + 1 margin + 1 + 1 padding
        assert_eq!(l.bounds(NodeId(1)), Some(Rect::new(0, 0, 20, 7)));
    }

    #[test]
    fn empty_auto_box_has_no_height() {
        let root = Node::new(NodeId(1)).child(Node::new(NodeId(2)));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(10, 5));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(0, 0, 10, 0)));
    }

    #[test]
    fn percent_height_of_definite_parent() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().height(10))
            .child(Node::new(NodeId(2)).with_style(Style::new().height(Dimension::Percent(50.0))));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(10, 20));
        assert_eq!(l.dimensions(NodeId(2)).map(|s| s.height), Some(5));
    }

    #[test]
    fn explicit_width_does_not_fill() {
        let root = Node::new(NodeId(1))
            .child(Node::new(NodeId(2)).with_style(Style::new().width(4).height(1)))
            .child(Node::new(NodeId(3)).with_style(Style::new().height(1)));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(12, 5));
        assert_eq!(l.bounds(NodeId(2)), Some(Rect::new(0, 0, 4, 1)));
        assert_eq!(l.bounds(NodeId(3)), Some(Rect::new(0, 1, 12, 1)));
    }

    #[test]
    fn shrink_to_fit_box_takes_widest_child() {
        let inner = Node::new(NodeId(2))
            .with_style(Style::new().position(crate::style::Position::Absolute))
            .child(Node::text(NodeId(3), "short"))
            .child(Node::text(NodeId(4), "a bit longer"));
        let root = Node::new(NodeId(1)).child(inner);
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(40, 10));
        assert_eq!(l.dimensions(NodeId(2)).map(|s| (s.width, s.height)), Some((12, 2)));
    }
}
