#![forbid(unsafe_code)]

//! Dirty-region tracking.
//!
//! Marked rectangles are coalesced eagerly: a new rectangle absorbs every
//! stored rectangle it overlaps or shares an edge with (bounding union), and
//! the absorption repeats until nothing touches. The stored set therefore
//! never overlaps, covers every marked cell, and stays small for the common
//! case of a few scattered updates. Coalescing may cover extra unmarked
//! cells; that only costs redundant compositing work.

use smallvec::SmallVec;
use stratum_core::geometry::Rect;

/// Above this many disjoint regions, collapse to a single bounding box.
const MAX_REGIONS: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyRegions {
    regions: SmallVec<[Rect; 4]>,
}

impl DirtyRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rectangle. Empty rectangles are ignored.
    pub fn mark(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut merged = rect;
        loop {
            let before = self.regions.len();
            self.regions.retain(|r| {
                if r.touches_or_overlaps(&merged) {
                    merged = merged.union(r);
                    false
                } else {
                    true
                }
            });
            if self.regions.len() == before {
                break;
            }
        }
        self.regions.push(merged);

        if self.regions.len() > MAX_REGIONS {
            let bounds = self.bounding_box();
            self.regions.clear();
            self.regions.push(bounds);
        }
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// Whether any stored region contains the cell.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        self.regions.iter().any(|r| r.contains(x, y))
    }

    /// Union of all regions.
    pub fn bounding_box(&self) -> Rect {
        self.regions
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r))
    }

    /// Drop everything outside `bounds` (used after shrinking a grid).
    pub fn clip_to(&mut self, bounds: Rect) {
        let clipped: SmallVec<[Rect; 4]> = self
            .regions
            .iter()
            .filter_map(|r| r.intersection_opt(&bounds))
            .collect();
        self.regions = clipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rect_is_ignored() {
        let mut d = DirtyRegions::new();
        d.mark(Rect::new(3, 3, 0, 5));
        assert!(d.is_empty());
    }

    #[test]
    fn disjoint_rects_stay_separate() {
        let mut d = DirtyRegions::new();
        d.mark(Rect::new(0, 0, 2, 2));
        d.mark(Rect::new(10, 10, 2, 2));
        assert_eq!(d.regions().len(), 2);
    }

    #[test]
    fn adjacent_cells_on_a_row_merge() {
        let mut d = DirtyRegions::new();
        for x in 0..5 {
            d.mark(Rect::new(x, 0, 1, 1));
        }
        assert_eq!(d.regions(), &[Rect::new(0, 0, 5, 1)]);
    }

    #[test]
    fn bridging_rect_merges_chain() {
        let mut d = DirtyRegions::new();
        d.mark(Rect::new(0, 0, 2, 1));
        d.mark(Rect::new(5, 0, 2, 1));
        d.mark(Rect::new(2, 0, 3, 1));
        assert_eq!(d.regions(), &[Rect::new(0, 0, 7, 1)]);
    }

    #[test]
    fn clip_drops_outside_parts() {
        let mut d = DirtyRegions::new();
        d.mark(Rect::new(0, 0, 10, 10));
        d.mark(Rect::new(30, 30, 2, 2));
        d.clip_to(Rect::new(0, 0, 5, 5));
        assert_eq!(d.regions(), &[Rect::new(0, 0, 5, 5)]);
    }

    #[test]
    fn many_scattered_regions_collapse() {
        let mut d = DirtyRegions::new();
        for i in 0..40u16 {
            d.mark(Rect::new(i * 3, i * 3, 1, 1));
        }
        assert!(d.regions().len() <= MAX_REGIONS);
        for i in 0..40u16 {
            assert!(d.contains(i * 3, i * 3));
        }
    }

    mod property {
        use super::super::*;
        use proptest::prelude::*;

        fn rect() -> impl Strategy<Value = Rect> {
            (0u16..40, 0u16..20, 1u16..8, 1u16..5)
                .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
        }

        proptest! {
            #[test]
            fn regions_cover_marks_and_never_overlap(
                marks in proptest::collection::vec(rect(), 1..20)
            ) {
                let mut d = DirtyRegions::new();
                for r in &marks {
                    d.mark(*r);
                }
                for r in &marks {
                    for (x, y) in r.positions() {
                        prop_assert!(d.contains(x, y));
                    }
                }
                let regions = d.regions();
                for (i, a) in regions.iter().enumerate() {
                    for b in &regions[i + 1..] {
                        prop_assert!(a.intersection_opt(b).is_none());
                    }
                }
            }
        }
    }
}
