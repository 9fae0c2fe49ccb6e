#![forbid(unsafe_code)]

//! Flexbox layout along a main axis (row or column, optionally reversed).
//!
//! Steps:
//! 1. hypothetical main size per item: `flex-basis`, else the explicit main
//!    size, else the measured content size, clamped by min/max,
//! 2. split items into lines (only with `flex-wrap: wrap` and a definite main
//!    size),
//! 3. per line, hand out free space by `flex-grow` or take back overflow by
//!    `flex-shrink` weighted by base size; rounding leftovers go to the last
//!    flexible item,
//! 4. lay each item out at its final main size, size lines on the cross axis
//!    and stretch items that ask for it,
//! 5. position along the main axis with `justify-content` and across with
//!    `align-items` / `align-self`.
//!
//! The container's content extent is the union of its items; justify and
//! align decide where items go, never how big the container is.

use std::ops::Range;

use smallvec::SmallVec;

use crate::engine::{ContentBox, Constraints, LayoutPass, Request, clamp_size, to_u16};
use crate::style::{AlignItems, FlexWrap, JustifyContent};

#[derive(Debug, Clone, Copy)]
struct FlexItem {
    slot: usize,
    main: i32,
    cross: i32,
    /// Margins before and after on the main axis, in physical order.
    main_margin: (i32, i32),
    cross_margin: (i32, i32),
    grow: f32,
    shrink: f32,
    min_main: Option<i32>,
    max_main: Option<i32>,
    align: AlignItems,
    auto_cross: bool,
}

impl FlexItem {
    #[inline]
    fn outer_main(&self) -> i32 {
        self.main + self.main_margin.0 + self.main_margin.1
    }

    #[inline]
    fn outer_cross(&self) -> i32 {
        self.cross + self.cross_margin.0 + self.cross_margin.1
    }
}

impl LayoutPass<'_, '_> {
    pub(crate) fn layout_flex(&mut self, idx: usize, content: ContentBox) -> (i32, i32) {
        let style = self.style_of(idx);
        let children = self.in_flow_children(idx);
        if children.is_empty() {
            return (0, 0);
        }

        let is_row = style.flex_direction.is_row();
        let reverse = style.flex_direction.is_reverse();
        let (main_gap, cross_gap) = if is_row {
            (style.effective_column_gap(), style.effective_row_gap())
        } else {
            (style.effective_row_gap(), style.effective_column_gap())
        };
        let (main_gap, cross_gap) = (i32::from(main_gap), i32::from(cross_gap));

        // Definite sizes; a shrink-to-fit measurement leaves the width open.
        let width = (!content.shrink).then_some(content.width);
        let (main_size, cross_size) = if is_row {
            (width, content.height)
        } else {
            (content.height, width)
        };

        // 1. Hypothetical main sizes.
        let mut items: SmallVec<[FlexItem; 8]> = SmallVec::with_capacity(children.len());
        for &child in &children {
            let cs = self.style_of(child);
            let align = cs.align_self.unwrap_or(style.align_items);
            let (main_dim, min_dim, max_dim, cross_dim) = if is_row {
                (cs.width, cs.min_width, cs.max_width, cs.height)
            } else {
                (cs.height, cs.min_height, cs.max_height, cs.width)
            };
            let m = cs.margin;
            let (main_margin, cross_margin) = if is_row {
                ((m.left, m.right), (m.top, m.bottom))
            } else {
                ((m.top, m.bottom), (m.left, m.right))
            };
            let main_margin = (i32::from(main_margin.0), i32::from(main_margin.1));
            let cross_margin = (i32::from(cross_margin.0), i32::from(cross_margin.1));
            let stretch_width = !is_row && align == AlignItems::Stretch && cross_dim.is_auto();

            let basis = match cs.flex_basis.resolve(main_size).or(main_dim.resolve(main_size)) {
                Some(basis) => basis,
                None => {
                    let req = Request::new(self.item_constraints(&content, stretch_width));
                    let (w, h) = self.measure(child, req);
                    if is_row { w } else { h }
                }
            };
            let min_main = min_dim.resolve(main_size);
            let max_main = max_dim.resolve(main_size);
            items.push(FlexItem {
                slot: child,
                main: clamp_size(basis, min_main, max_main).max(0),
                cross: 0,
                main_margin,
                cross_margin,
                grow: cs.flex_grow.max(0.0),
                shrink: cs.flex_shrink.max(0.0),
                min_main,
                max_main,
                align,
                auto_cross: cross_dim.is_auto(),
            });
        }

        // 2. Lines.
        let lines = split_lines(&items, main_gap, main_size.filter(|_| style.flex_wrap == FlexWrap::Wrap));

        // 3. Flexible lengths.
        if let Some(limit) = main_size {
            for line in &lines {
                resolve_flexible_lengths(&mut items[line.clone()], limit, main_gap);
            }
        }

        // 4. Cross sizes.
        let mut line_cross: SmallVec<[i32; 4]> = SmallVec::with_capacity(lines.len());
        for line in &lines {
            let mut tallest = 0;
            for item in &mut items[line.clone()] {
                let stretch_width = !is_row && item.align == AlignItems::Stretch && item.auto_cross;
                let base = Request::new(self.item_constraints(&content, stretch_width));
                let req = if is_row {
                    base.with_width(item.main)
                } else {
                    base.with_height(item.main)
                };
                let (w, h) = self.place(item.slot, req);
                item.cross = if is_row { h } else { w };
                tallest = tallest.max(item.outer_cross());
            }
            line_cross.push(match cross_size {
                Some(size) if lines.len() == 1 => size,
                _ => tallest,
            });
        }
        for (line, &cross) in lines.iter().zip(&line_cross) {
            for item in &mut items[line.clone()] {
                if item.align != AlignItems::Stretch || !item.auto_cross {
                    continue;
                }
                let target = (cross - item.cross_margin.0 - item.cross_margin.1).max(0);
                if target == item.cross {
                    continue;
                }
                let base = Request::new(self.item_constraints(&content, !is_row));
                let req = if is_row {
                    base.with_width(item.main).with_height(target)
                } else {
                    base.with_width(target).with_height(item.main)
                };
                let (w, h) = self.place(item.slot, req);
                item.cross = if is_row { h } else { w };
            }
        }

        // 5. Positions.
        let mut extent = (0, 0);
        let mut cross_cursor: i32 = 0;
        for (line, &cross) in lines.iter().zip(&line_cross) {
            let line_items = &items[line.clone()];
            let used = line_used(line_items, main_gap);
            let container_main = main_size.unwrap_or(used);
            let (lead, between) = justify(style.justify_content, container_main.saturating_sub(used), line_items.len());

            let mut cursor = lead;
            for item in line_items {
                let main_pos = if reverse {
                    container_main
                        .saturating_sub(cursor)
                        .saturating_sub(item.main_margin.1)
                        .saturating_sub(item.main)
                } else {
                    cursor.saturating_add(item.main_margin.0)
                };
                let free_cross = cross - item.outer_cross();
                let cross_pos = cross_cursor
                    .saturating_add(item.cross_margin.0)
                    .saturating_add(match item.align {
                        AlignItems::Start | AlignItems::Stretch => 0,
                        AlignItems::Center => free_cross / 2,
                        AlignItems::End => free_cross,
                    });
                let (x, y, w, h) = if is_row {
                    (main_pos, cross_pos, item.main, item.cross)
                } else {
                    (cross_pos, main_pos, item.cross, item.main)
                };
                let far = self.style_of(item.slot).margin;
                extent.0 = extent.0.max(x.saturating_add(w).saturating_add(i32::from(far.right)));
                extent.1 = extent.1.max(y.saturating_add(h).saturating_add(i32::from(far.bottom)));
                self.set_flow_offset(item.slot, content.x.saturating_add(x), content.y.saturating_add(y));
                cursor = cursor
                    .saturating_add(item.outer_main())
                    .saturating_add(main_gap)
                    .saturating_add(between);
            }
            cross_cursor = cross_cursor.saturating_add(cross).saturating_add(cross_gap);
        }
        extent
    }

    /// Constraints for measuring or placing a flex item. Items shrink to fit
    /// on the row axis; in a column they fill the width only when stretched.
    fn item_constraints(&self, content: &ContentBox, fill_width: bool) -> Constraints {
        let width = to_u16(content.width);
        let height = content.height.map(to_u16);
        Constraints {
            max_width: width,
            max_height: height,
            available_width: (fill_width && !content.shrink).then_some(width),
            available_height: height,
        }
    }
}

fn split_lines(items: &[FlexItem], gap: i32, wrap_at: Option<i32>) -> SmallVec<[Range<usize>; 4]> {
    let mut lines = SmallVec::new();
    let Some(limit) = wrap_at else {
        lines.push(0..items.len());
        return lines;
    };
    let mut start = 0;
    let mut used: i32 = 0;
    for (i, item) in items.iter().enumerate() {
        let outer = item.outer_main();
        if i > start && used.saturating_add(gap).saturating_add(outer) > limit {
            lines.push(start..i);
            start = i;
            used = outer;
        } else if i == start {
            used = outer;
        } else {
            used = used.saturating_add(gap).saturating_add(outer);
        }
    }
    lines.push(start..items.len());
    lines
}

/// Main-axis space a line takes, margins and gaps included.
fn line_used(line: &[FlexItem], gap: i32) -> i32 {
    let gaps = gap.saturating_mul(line.len().saturating_sub(1) as i32);
    line.iter()
        .map(FlexItem::outer_main)
        .fold(gaps, i32::saturating_add)
}

fn resolve_flexible_lengths(line: &mut [FlexItem], limit: i32, gap: i32) {
    let used = line_used(line, gap);
    let free = limit.saturating_sub(used);
    if free > 0 {
        let total: f32 = line.iter().map(|i| i.grow).sum();
        if total <= 0.0 {
            return;
        }
        let mut handed = 0;
        let mut last = None;
        for (n, item) in line.iter_mut().enumerate() {
            if item.grow <= 0.0 {
                continue;
            }
            let share = ((free as f32 * item.grow / total).floor() as i32).clamp(0, free - handed);
            item.main = item.main.saturating_add(share);
            handed += share;
            last = Some(n);
        }
        if let Some(n) = last {
            line[n].main = line[n].main.saturating_add(free - handed);
        }
        for item in line.iter_mut() {
            item.main = clamp_size(item.main, item.min_main, item.max_main);
        }
    } else if free < 0 {
        // Shrink in proportion to factor times base size, so small items
        // give up less than large ones.
        let deficit = free.saturating_neg();
        let weight = |i: &FlexItem| i.shrink * i.main as f32;
        let total: f32 = line.iter().map(weight).sum();
        if total <= 0.0 {
            return;
        }
        let mut taken = 0;
        let mut last = None;
        for (n, item) in line.iter_mut().enumerate() {
            let w = weight(item);
            if w <= 0.0 {
                continue;
            }
            let share = ((deficit as f32 * w / total).floor() as i32).clamp(0, deficit - taken);
            item.main = item.main.saturating_sub(share);
            taken += share;
            last = Some(n);
        }
        if let Some(n) = last {
            line[n].main = line[n].main.saturating_sub(deficit - taken);
        }
        for item in line.iter_mut() {
            item.main = clamp_size(item.main, item.min_main, item.max_main).max(0);
        }
    }
}

/// Leading space and extra space between items for one line.
fn justify(mode: JustifyContent, remaining: i32, count: usize) -> (i32, i32) {
    let remaining = remaining.max(0);
    let n = count.max(1) as i32;
    match mode {
        JustifyContent::Start => (0, 0),
        JustifyContent::End => (remaining, 0),
        JustifyContent::Center => (remaining / 2, 0),
        JustifyContent::SpaceBetween if n > 1 => (0, remaining / (n - 1)),
        JustifyContent::SpaceBetween => (0, 0),
        JustifyContent::SpaceAround => {
            let around = remaining / n;
            (around / 2, around)
        }
        JustifyContent::SpaceEvenly => {
            let even = remaining / (n + 1);
            (even, even)
        }
    }
}

#[cfg(test)]
mod tests {
    use stratum_core::geometry::{Rect, Sides};
    use stratum_core::ids::NodeId;

    use super::justify;
    use crate::engine::{Constraints, Layout, LayoutEngine};
    use crate::node::Node;
    use crate::style::{AlignItems, FlexDirection, FlexWrap, JustifyContent, Style};

    fn boxes(n: u32, width: u16) -> impl Iterator<Item = Node> {
        (0..n).map(move |i| Node::new(NodeId(10 + i)).with_style(Style::new().width(width).height(1)))
    }

    fn row(style: Style, kids: impl IntoIterator<Item = Node>) -> Layout {
        let root = Node::new(NodeId(1))
            .with_style(style.flex_direction(FlexDirection::Row))
            .with_children(kids);
        LayoutEngine::new().compute_layout(&root, Constraints::viewport(20, 10))
    }

    fn xs(l: &Layout, n: u32) -> Vec<u16> {
        (0..n).filter_map(|i| l.bounds(NodeId(10 + i)).map(|r| r.x)).collect()
    }

    #[test]
    fn items_line_up_with_gap() {
        let l = row(Style::new().gap(1), boxes(3, 4));
        assert_eq!(xs(&l, 3), vec![0, 5, 10]);
        assert_eq!(l.dimensions(NodeId(1)).map(|s| s.height), Some(1));
    }

    #[test]
    fn justify_modes() {
        let cases = [
            (JustifyContent::Start, vec![0, 4, 8]),
            (JustifyContent::End, vec![8, 12, 16]),
            (JustifyContent::Center, vec![4, 8, 12]),
            (JustifyContent::SpaceBetween, vec![0, 8, 16]),
            (JustifyContent::SpaceAround, vec![1, 7, 13]),
            (JustifyContent::SpaceEvenly, vec![2, 8, 14]),
        ];
        for (mode, expected) in cases {
            let l = row(Style::new().justify_content(mode), boxes(3, 4));
            assert_eq!(xs(&l, 3), expected, "{mode:?}");
        }
    }

    #[test]
    fn grow_hands_remainder_to_last() {
        let kids = (0..3).map(|i| {
            Node::new(NodeId(10 + i)).with_style(Style::new().flex_grow(1.0).height(1))
        });
        let l = row(Style::new(), kids);
        let widths: Vec<u16> = (0..3)
            .filter_map(|i| l.dimensions(NodeId(10 + i)).map(|s| s.width))
            .collect();
        assert_eq!(widths, vec![6, 6, 8]);
        assert_eq!(xs(&l, 3), vec![0, 6, 12]);
    }

    #[test]
    fn shrink_takes_back_overflow() {
        let l = row(Style::new(), boxes(2, 15));
        let widths: Vec<u16> = (0..2)
            .filter_map(|i| l.dimensions(NodeId(10 + i)).map(|s| s.width))
            .collect();
        assert_eq!(widths, vec![10, 10]);
    }

    #[test]
    fn wrap_starts_new_lines() {
        let l = row(Style::new().flex_wrap(FlexWrap::Wrap).column_gap(1), boxes(3, 8));
        assert_eq!(l.bounds(NodeId(10)), Some(Rect::new(0, 0, 8, 1)));
        assert_eq!(l.bounds(NodeId(11)), Some(Rect::new(9, 0, 8, 1)));
        assert_eq!(l.bounds(NodeId(12)), Some(Rect::new(0, 1, 8, 1)));
        assert_eq!(l.dimensions(NodeId(1)).map(|s| s.height), Some(2));
    }

    #[test]
    fn row_reverse_starts_from_the_right() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().flex_direction(FlexDirection::RowReverse))
            .with_children(boxes(2, 4));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(20, 10));
        assert_eq!(xs(&l, 2), vec![16, 12]);
    }

    #[test]
    fn column_stacks_and_stretches_width() {
        let root = Node::new(NodeId(1))
            .with_style(Style::new().flex_direction(FlexDirection::Column).gap(1))
            .child(Node::new(NodeId(10)).with_style(Style::new().height(2)))
            .child(Node::text(NodeId(11), "abc"));
        let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(20, 10));
        assert_eq!(l.bounds(NodeId(10)), Some(Rect::new(0, 0, 20, 2)));
        assert_eq!(l.bounds(NodeId(11)), Some(Rect::new(0, 3, 20, 1)));
    }

    #[test]
    fn align_items_on_the_cross_axis() {
        let kids = [
            Node::new(NodeId(10)).with_style(Style::new().width(2).height(1)),
            Node::new(NodeId(11))
                .with_style(Style::new().width(2).height(1).align_self(AlignItems::End)),
            Node::new(NodeId(12)).with_style(Style::new().width(2)),
        ];
        let l = row(
            Style::new().height(5).align_items(AlignItems::Center),
            kids,
        );
        assert_eq!(l.bounds(NodeId(10)).map(|r| r.y), Some(2));
        assert_eq!(l.bounds(NodeId(11)).map(|r| r.y), Some(4));
        // Auto height, centered: zero-height box in the middle.
        assert_eq!(l.bounds(NodeId(12)).map(|r| (r.y, r.height)), Some((2, 0)));
    }

    #[test]
    fn stretch_fills_the_line() {
        let kids = [
            Node::new(NodeId(10)).with_style(Style::new().width(2).height(3)),
            Node::new(NodeId(11)).with_style(Style::new().width(2).margin(Sides::vertical(1))),
        ];
        let l = row(Style::new(), kids);
        assert_eq!(l.bounds(NodeId(11)), Some(Rect::new(2, 1, 2, 1)));
    }

    #[test]
    fn justify_helper_never_goes_negative() {
        assert_eq!(justify(JustifyContent::Center, -4, 2), (0, 0));
        assert_eq!(justify(JustifyContent::SpaceBetween, 9, 1), (0, 0));
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn grown_items_fill_the_row(count in 1u32..6, width in 10u16..80) {
                let root = Node::new(NodeId(1))
                    .with_style(Style::new().flex_direction(FlexDirection::Row))
                    .with_children((0..count).map(|i| {
                        Node::new(NodeId(10 + i)).with_style(Style::new().flex_grow(1.0).height(1))
                    }));
                let l = LayoutEngine::new().compute_layout(&root, Constraints::viewport(width, 5));
                let total: u32 = (0..count)
                    .filter_map(|i| l.dimensions(NodeId(10 + i)))
                    .map(|s| u32::from(s.width))
                    .sum();
                prop_assert_eq!(total, u32::from(width));
            }

            #[test]
            fn items_stay_in_order(count in 1u32..6, gap in 0u16..3) {
                let l = row(Style::new().gap(gap), boxes(count, 3));
                let xs = xs(&l, count);
                prop_assert!(xs.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
