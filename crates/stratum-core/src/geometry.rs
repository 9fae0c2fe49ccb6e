#![forbid(unsafe_code)]

//! Geometric primitives shared by layout, grids, and compositing.
//!
//! All coordinates are terminal cells (0-indexed, origin at top-left).
//! [`Rect`] is the bounding box used everywhere after layout; it is unsigned,
//! so anything computed with signed arithmetic is clamped on the way in.

/// A bounding box in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Build a rectangle from signed coordinates, clipping away the parts
    /// that lie left of or above the origin.
    pub fn from_signed(x: i32, y: i32, width: i32, height: i32) -> Self {
        let right = x.saturating_add(width.max(0));
        let bottom = y.saturating_add(height.max(0));
        let x0 = x.clamp(0, u16::MAX as i32);
        let y0 = y.clamp(0, u16::MAX as i32);
        let x1 = right.clamp(0, u16::MAX as i32);
        let y1 = bottom.clamp(0, u16::MAX as i32);
        Self {
            x: x0 as u16,
            y: y0 as u16,
            width: (x1 - x0).max(0) as u16,
            height: (y1 - y0).max(0) as u16,
        }
    }

    #[inline]
    pub const fn left(&self) -> u16 {
        self.x
    }

    #[inline]
    pub const fn top(&self) -> u16 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check if `other` lies entirely inside this rectangle.
    ///
    /// Empty rectangles are contained by everything.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Intersection, or an empty rectangle when there is no overlap.
    #[inline]
    pub fn intersection(&self, other: &Rect) -> Rect {
        self.intersection_opt(other).unwrap_or_default()
    }

    #[inline]
    pub fn intersection_opt(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Rect {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }

    /// True when the rectangles overlap or share an edge.
    ///
    /// Corner-only contact does not count: merging two diagonal neighbours
    /// would cover cells that neither of them marked.
    pub fn touches_or_overlaps(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let h_overlap = self.x < other.right() && other.x < self.right();
        let v_overlap = self.y < other.bottom() && other.y < self.bottom();
        let h_touch = self.x <= other.right() && other.x <= self.right();
        let v_touch = self.y <= other.bottom() && other.y <= self.bottom();
        (h_overlap && v_touch) || (v_overlap && h_touch)
    }

    /// Shrink by the given sides.
    pub fn inner(&self, sides: Sides) -> Rect {
        let x = self.x.saturating_add(sides.left);
        let y = self.y.saturating_add(sides.top);
        let width = self
            .width
            .saturating_sub(sides.left)
            .saturating_sub(sides.right);
        let height = self
            .height
            .saturating_sub(sides.top)
            .saturating_sub(sides.bottom);

        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow by the given sides, saturating at the origin.
    pub fn outer(&self, sides: Sides) -> Rect {
        Rect::from_signed(
            self.x as i32 - sides.left as i32,
            self.y as i32 - sides.top as i32,
            self.width as i32 + sides.horizontal_sum() as i32,
            self.height as i32 + sides.vertical_sum() as i32,
        )
    }

    /// Move by a signed offset, clipping at the origin.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::from_signed(
            self.x as i32 + dx,
            self.y as i32 + dy,
            self.width as i32,
            self.height as i32,
        )
    }

    /// Iterate over every `(x, y)` inside the rectangle in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        let (x0, x1) = (self.x, self.right());
        (self.y..self.bottom()).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

/// Width and height in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    #[inline]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }
}

impl From<(u16, u16)> for Size {
    fn from((width, height): (u16, u16)) -> Self {
        Self { width, height }
    }
}

/// Per-edge amounts for margin, border, and padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sides {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Sides {
    pub const ZERO: Self = Self::all(0);

    pub const fn all(val: u16) -> Self {
        Self {
            top: val,
            right: val,
            bottom: val,
            left: val,
        }
    }

    /// Left and right only.
    pub const fn horizontal(val: u16) -> Self {
        Self {
            top: 0,
            right: val,
            bottom: 0,
            left: val,
        }
    }

    /// Top and bottom only.
    pub const fn vertical(val: u16) -> Self {
        Self {
            top: val,
            right: 0,
            bottom: val,
            left: 0,
        }
    }

    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    #[inline]
    pub const fn horizontal_sum(&self) -> u16 {
        self.left.saturating_add(self.right)
    }

    #[inline]
    pub const fn vertical_sum(&self) -> u16 {
        self.top.saturating_add(self.bottom)
    }

    /// Edge-wise sum.
    pub const fn add(&self, other: Sides) -> Sides {
        Sides {
            top: self.top.saturating_add(other.top),
            right: self.right.saturating_add(other.right),
            bottom: self.bottom.saturating_add(other.bottom),
            left: self.left.saturating_add(other.left),
        }
    }
}

impl From<u16> for Sides {
    fn from(val: u16) -> Self {
        Self::all(val)
    }
}

impl From<(u16, u16)> for Sides {
    fn from((vertical, horizontal): (u16, u16)) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

impl From<(u16, u16, u16, u16)> for Sides {
    fn from((top, right, bottom, left): (u16, u16, u16, u16)) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Rect, Sides, Size};

    #[test]
    fn contains_is_half_open() {
        let cell_area = Rect::new(10, 4, 3, 2);
        let inside: Vec<_> = [(10, 4), (12, 5), (13, 4), (10, 6), (9, 4)]
            .into_iter()
            .map(|(x, y)| cell_area.contains(x, y))
            .collect();
        assert_eq!(inside, vec![true, true, false, false, false]);
    }

    #[test]
    fn disjoint_rects_have_no_overlap() {
        let left = Rect::new(0, 0, 4, 1);
        let right = Rect::new(5, 0, 4, 1);
        assert!(left.intersection_opt(&right).is_none());
        assert!(left.intersection(&right).is_empty());
    }

    #[test]
    fn union_ignores_empty_operand() {
        let a = Rect::new(4, 4, 2, 2);
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(Rect::default().union(&a), a);
        assert_eq!(
            a.union(&Rect::new(0, 0, 1, 1)),
            Rect::new(0, 0, 6, 6)
        );
    }

    #[test]
    fn from_signed_clips_negative_origin() {
        assert_eq!(Rect::from_signed(-3, 2, 10, 4), Rect::new(0, 2, 7, 4));
        assert_eq!(Rect::from_signed(-20, 0, 10, 4).width, 0);
        assert_eq!(Rect::from_signed(1, 1, -5, 3), Rect::new(1, 1, 0, 3));
    }

    #[test]
    fn translate_saturates_at_origin() {
        let r = Rect::new(5, 5, 3, 3);
        assert_eq!(r.translate(2, -1), Rect::new(7, 4, 3, 3));
        assert_eq!(r.translate(-6, 0), Rect::new(0, 5, 2, 3));
    }

    #[test]
    fn touching_requires_shared_edge() {
        let a = Rect::new(0, 0, 2, 2);
        assert!(a.touches_or_overlaps(&Rect::new(2, 0, 2, 2)));
        assert!(a.touches_or_overlaps(&Rect::new(0, 2, 2, 1)));
        assert!(a.touches_or_overlaps(&Rect::new(1, 1, 2, 2)));
        assert!(!a.touches_or_overlaps(&Rect::new(2, 2, 1, 1)));
        assert!(!a.touches_or_overlaps(&Rect::new(3, 0, 1, 1)));
    }

    #[test]
    fn inner_and_outer_are_inverse_away_from_origin() {
        let r = Rect::new(5, 5, 10, 6);
        let s = Sides::new(1, 2, 3, 4);
        assert_eq!(r.inner(s), Rect::new(9, 6, 4, 2));
        assert_eq!(r.inner(s).outer(s), r);
    }

    #[test]
    fn inner_saturates_to_empty() {
        let r = Rect::new(0, 0, 2, 2);
        assert!(r.inner(Sides::all(3)).is_empty());
    }

    #[test]
    fn contains_rect_handles_empty() {
        let r = Rect::new(2, 2, 4, 4);
        assert!(r.contains_rect(&Rect::new(3, 3, 2, 2)));
        assert!(!r.contains_rect(&Rect::new(3, 3, 4, 2)));
        assert!(r.contains_rect(&Rect::new(90, 90, 0, 0)));
    }

    #[test]
    fn positions_are_row_major() {
        let cells: Vec<_> = Rect::new(1, 1, 2, 2).positions().collect();
        assert_eq!(cells, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn sides_conversions_and_sums() {
        assert_eq!(Sides::from(3), Sides::all(3));
        assert_eq!(Sides::from((1, 2)), Sides::new(1, 2, 1, 2));
        let s = Sides::from((1, 2, 3, 4));
        assert_eq!(s.horizontal_sum(), 6);
        assert_eq!(s.vertical_sum(), 4);
        assert_eq!(s.add(Sides::all(1)), Sides::new(2, 3, 4, 5));
    }

    #[test]
    fn size_area() {
        assert_eq!(Size::new(80, 24).area(), 1920);
        assert_eq!(Rect::new(3, 3, 4, 2).size(), Size::from((4, 2)));
    }

    mod property {
        use super::super::Rect;
        use proptest::prelude::*;

        fn rect() -> impl Strategy<Value = Rect> {
            (0u16..60, 0u16..60, 0u16..40, 0u16..40)
                .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
        }

        proptest! {
            #[test]
            fn union_contains_both(a in rect(), b in rect()) {
                let u = a.union(&b);
                prop_assert!(u.contains_rect(&a));
                prop_assert!(u.contains_rect(&b));
            }

            #[test]
            fn intersection_is_inside_both(a in rect(), b in rect()) {
                let i = a.intersection(&b);
                prop_assert!(a.contains_rect(&i));
                prop_assert!(b.contains_rect(&i));
            }
        }
    }
}
