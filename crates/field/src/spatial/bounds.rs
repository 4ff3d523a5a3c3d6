//! Axis-aligned bounding boxes.

use glam::Vec2;

/// Axis-aligned bounding box stored as center plus half-extent.
///
/// The min/max corners are kept in sync with center and half-extent so
/// containment and intersection tests stay cheap. The anchor is the rounded
/// center at construction time and only matters for rubber-band growth via
/// [`BoundingBox::grow_to`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    center: Vec2,
    half: Vec2,
    min: Vec2,
    max: Vec2,
    anchor: Vec2,
}

impl BoundingBox {
    /// Create a box from its center and half-extent.
    pub fn new(center: Vec2, half: Vec2) -> Self {
        Self {
            center,
            half,
            min: center - half,
            max: center + half,
            anchor: center.round(),
        }
    }

    /// Create a zero-size box anchored at `coord`, ready to be dragged out
    /// with [`BoundingBox::grow_to`].
    pub fn anchored(coord: Vec2) -> Self {
        Self::new(coord, Vec2::ZERO)
    }

    /// Get the center.
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Get the half-extent. The two axes may differ after growth.
    #[inline]
    pub fn half_extent(&self) -> Vec2 {
        self.half
    }

    /// Get the minimum corner.
    #[inline]
    pub fn min_corner(&self) -> Vec2 {
        self.min
    }

    /// Get the maximum corner.
    #[inline]
    pub fn max_corner(&self) -> Vec2 {
        self.max
    }

    /// Half-open containment test: `min <= coord < max` on both axes.
    ///
    /// A coordinate exactly on the max edge belongs to the neighboring box,
    /// never to this one.
    #[inline]
    pub fn contains(&self, coord: Vec2) -> bool {
        coord.cmpge(self.min).all() && coord.cmplt(self.max).all()
    }

    /// Check if two boxes intersect. Boxes sharing only an edge count as
    /// intersecting.
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if self.min.x > other.max.x {
            return false;
        }
        if self.min.y > other.max.y {
            return false;
        }
        if self.max.x < other.min.x {
            return false;
        }
        if self.max.y < other.min.y {
            return false;
        }
        true
    }

    /// Grow the box toward `coord`, keeping the anchor fixed.
    ///
    /// Per axis, a coordinate beyond the anchor moves the max corner and any
    /// other moves the min corner, so a pointer drag can grow the box in any
    /// direction. Center and half-extent are recomputed from the corners.
    pub fn grow_to(&mut self, coord: Vec2) {
        if coord.x > self.anchor.x {
            self.max.x = coord.x;
        } else {
            self.min.x = coord.x;
        }
        if coord.y > self.anchor.y {
            self.max.y = coord.y;
        } else {
            self.min.y = coord.y;
        }
        self.half = (self.max - self.min) / 2.0;
        self.center = self.min + self.half;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_half_open() {
        let bb = BoundingBox::new(Vec2::splat(5.0), Vec2::splat(5.0));

        assert!(bb.contains(Vec2::new(0.0, 0.0))); // min edge is inside
        assert!(bb.contains(Vec2::new(9.9, 9.9)));
        assert!(!bb.contains(Vec2::new(10.0, 10.0))); // max edge is outside
        assert!(!bb.contains(Vec2::new(5.0, 10.0)));
        assert!(!bb.contains(Vec2::new(-0.1, 5.0)));
    }

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new(Vec2::splat(5.0), Vec2::splat(5.0));
        let b = BoundingBox::new(Vec2::splat(8.0), Vec2::splat(5.0));
        let c = BoundingBox::new(Vec2::splat(30.0), Vec2::splat(5.0));

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn test_intersects_shared_edge() {
        let a = BoundingBox::new(Vec2::new(5.0, 5.0), Vec2::splat(5.0));
        let b = BoundingBox::new(Vec2::new(15.0, 5.0), Vec2::splat(5.0));

        // a.max.x == b.min.x: still counts as intersecting
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_grow_to_any_direction() {
        let mut bb = BoundingBox::anchored(Vec2::new(10.0, 10.0));

        bb.grow_to(Vec2::new(20.0, 15.0));
        assert_eq!(bb.max_corner(), Vec2::new(20.0, 15.0));

        bb.grow_to(Vec2::new(5.0, 2.0));
        assert_eq!(bb.min_corner(), Vec2::new(5.0, 2.0));
        assert_eq!(bb.max_corner(), Vec2::new(20.0, 15.0));
        assert_eq!(bb.half_extent(), Vec2::new(7.5, 6.5));
        assert_eq!(bb.center(), Vec2::new(12.5, 8.5));
    }
}
