//! Segment and circle geometry
//!
//! Weapons are thick line segments anchored to their ball; bodies are circles.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::EPS;

/// A thickened line segment (a capsule) in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: DVec2,
    pub end: DVec2,
    /// Full thickness of the capsule
    pub thickness: f64,
}

impl Segment {
    pub fn new(start: DVec2, end: DVec2, thickness: f64) -> Self {
        Self {
            start,
            end,
            thickness,
        }
    }

    #[inline]
    pub fn half_thickness(&self) -> f64 {
        self.thickness / 2.0
    }

    /// Closest point on the centerline to `p`
    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        closest_point_on_segment(p, self.start, self.end)
    }

    /// Does a circle touch this capsule?
    pub fn touches_circle(&self, center: DVec2, radius: f64) -> bool {
        dist_to_segment(center, self.start, self.end) <= self.half_thickness() + radius
    }

    /// Capsule-capsule proximity, symmetric in its arguments
    pub fn touches_segment(&self, other: &Segment) -> bool {
        segment_distance(self.start, self.end, other.start, other.end)
            <= self.half_thickness() + other.half_thickness()
    }
}

/// Shortest distance between segments `a0`-`a1` and `b0`-`b1`
pub fn segment_distance(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> f64 {
    if segments_cross(a0, a1, b0, b1) {
        return 0.0;
    }
    dist_to_segment(a0, b0, b1)
        .min(dist_to_segment(a1, b0, b1))
        .min(dist_to_segment(b0, a0, a1))
        .min(dist_to_segment(b1, a0, a1))
}

/// Proper crossing test (collinear overlaps fall through to endpoint distances)
fn segments_cross(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> bool {
    let d1 = (a1 - a0).perp_dot(b0 - a0);
    let d2 = (a1 - a0).perp_dot(b1 - a0);
    let d3 = (b1 - b0).perp_dot(a0 - b0);
    let d4 = (b1 - b0).perp_dot(a1 - b0);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Closest point on segment `a`-`b` to `p`. A degenerate segment collapses to `a`.
pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let l2 = ab.length_squared();
    if l2 < EPS {
        return a;
    }
    let t = ((p - a).dot(ab) / l2).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `p` to segment `a`-`b`
#[inline]
pub fn dist_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    (p - closest_point_on_segment(p, a, b)).length()
}

/// Strict overlap of two circles (touching is not overlapping)
#[inline]
pub fn circles_overlap(c1: DVec2, r1: f64, c2: DVec2, r2: f64) -> bool {
    (c2 - c1).length() < r1 + r2
}

/// Unit normal from `from` toward `to`, `None` when the points coincide
pub fn contact_normal(from: DVec2, to: DVec2) -> Option<DVec2> {
    let d = to - from;
    let len = d.length();
    (len > EPS).then(|| d / len)
}
