//! Axis-aligned bounds and the proximity tests used by bounce arbitration
//!
//! Bounces trigger on proximity, not penetration: a fast-falling player covers
//! more than a thin hazard's height per tick, so waiting for overlap would let
//! it tunnel straight through.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box stored as centre + half extents (+y is down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec2,
    pub half: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            half: size * 0.5,
        }
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.center.y - self.half.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.center.y + self.half.y
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.center.x - self.half.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.center.x + self.half.x
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.half * 2.0
    }

    /// Inclusive rectangle intersection (touching edges count)
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.right() < other.left()
            || self.bottom() < other.top()
            || self.left() > other.right()
            || self.top() > other.bottom())
    }

    /// Strict overlap with positive area on both axes
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Horizontal overlap as arbitration defines it: the centre lies inside
    /// the other span, or the open intervals overlap
    pub fn overlaps_horizontally(&self, other: &Aabb) -> bool {
        let cx = self.center.x;
        (cx >= other.left() && cx <= other.right())
            || (self.left() < other.right() && self.right() > other.left())
    }
}

/// Vertical gap from the mover's lower edge down to the target's top edge.
///
/// `None` when the target's top is above the mover's bottom: anything the
/// player has already passed is never a bounce candidate.
#[inline]
pub fn gap_below(mover: &Aabb, target: &Aabb) -> Option<f32> {
    let gap = target.top() - mover.bottom();
    (gap >= 0.0).then_some(gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_edges() {
        let r = rect(100.0, 50.0, 80.0, 16.0);
        assert_eq!(r.left(), 60.0);
        assert_eq!(r.right(), 140.0);
        assert_eq!(r.top(), 42.0);
        assert_eq!(r.bottom(), 58.0);
    }

    #[test]
    fn test_intersects_includes_touching_edges() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.overlaps(&b));
        let c = rect(10.5, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_horizontal_overlap_by_centre_or_interval() {
        let platform = rect(100.0, 0.0, 80.0, 16.0);
        // Centre inside the span
        assert!(rect(139.0, -30.0, 24.0, 24.0).overlaps_horizontally(&platform));
        // Only the edge pokes in
        assert!(rect(150.0, -30.0, 24.0, 24.0).overlaps_horizontally(&platform));
        // Just touching is not an interval overlap and the centre is outside
        assert!(!rect(152.0, -30.0, 24.0, 24.0).overlaps_horizontally(&platform));
    }

    #[test]
    fn test_gap_below_rejects_targets_above() {
        let player = rect(0.0, 0.0, 24.0, 24.0); // bottom = 12
        assert_eq!(gap_below(&player, &rect(0.0, 20.0, 80.0, 16.0)), Some(0.0));
        assert_eq!(gap_below(&player, &rect(0.0, 30.0, 80.0, 16.0)), Some(10.0));
        assert_eq!(gap_below(&player, &rect(0.0, 19.0, 80.0, 16.0)), None);
    }
}
