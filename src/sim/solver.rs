//! Continuous collision solver
//!
//! Exact contact times for circles under constant acceleration. Bodies with
//! matching acceleration use the relative-motion quadratic (gravity cancels);
//! anything else falls back to sampling plus bisection on the squared gap.
//! Walls are solved per axis.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::EPS;

/// Distance tolerance for "already touching"
pub const CONTACT_SLOP: f64 = 1e-6;
/// Samples used to bracket the first contact when no closed form exists
pub const BRACKET_SAMPLES: u32 = 16;
/// Bisection refinements inside the bracket
pub const BISECTION_ITERS: u32 = 20;

/// Kinematic state of a circle over one step: `p(t) = pos + vel·t + ½·accel·t²`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub pos: DVec2,
    pub vel: DVec2,
    pub accel: DVec2,
    pub radius: f64,
}

impl Motion {
    /// A body that does not move this step
    pub fn stationary(pos: DVec2, radius: f64) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
            accel: DVec2::ZERO,
            radius,
        }
    }

    #[inline]
    pub fn position_at(&self, t: f64) -> DVec2 {
        self.pos + self.vel * t + self.accel * (0.5 * t * t)
    }
}

/// Arena walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

impl Wall {
    /// Inward-facing unit normal
    pub fn normal(self) -> DVec2 {
        match self {
            Wall::Left => DVec2::X,
            Wall::Right => -DVec2::X,
            Wall::Top => DVec2::Y,
            Wall::Bottom => -DVec2::Y,
        }
    }
}

/// Earliest wall contact of one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub t: f64,
    pub wall: Wall,
}

/// Earliest time in `[0, dt]` at which two circles touch.
///
/// Returns `None` when they never touch within the budget, are separating,
/// or already overlap. Touching-and-approaching yields `Some(0.0)`.
pub fn time_to_contact(a: &Motion, b: &Motion, dt: f64) -> Option<f64> {
    let reach = a.radius + b.radius;
    let dp = b.pos - a.pos;
    if dp.length() < reach - CONTACT_SLOP {
        return None;
    }

    if (b.accel - a.accel).length_squared() < EPS * EPS {
        quadratic_contact(dp, b.vel - a.vel, reach, dt)
    } else {
        bisect_contact(a, b, reach, dt)
    }
}

/// Relative-motion quadratic: `|dv|²t² + 2(dp·dv)t + (|dp|² − R²) = 0`
fn quadratic_contact(dp: DVec2, dv: DVec2, reach: f64, dt: f64) -> Option<f64> {
    let a = dv.length_squared();
    let b = 2.0 * dp.dot(dv);
    let c = dp.length_squared() - reach * reach;

    if a < EPS || b >= 0.0 {
        return None;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    let t = ((-b - disc.sqrt()) / (2.0 * a)).max(0.0);
    (t <= dt).then_some(t)
}

/// No closed form when accelerations differ: bracket the first sign change
/// of `f(t) = |p2(t) − p1(t)|² − R²` and bisect it.
///
/// A touching pair that is separating can still be pulled back together
/// within the step, so the search runs on past `t = 0` until the gap has
/// opened and closed again, or the pair turns around while still touching.
fn bisect_contact(a: &Motion, b: &Motion, reach: f64, dt: f64) -> Option<f64> {
    let gap = |t: f64| (b.position_at(t) - a.position_at(t)).length_squared() - reach * reach;
    let closing = |t: f64| {
        let dp = b.position_at(t) - a.position_at(t);
        let dv = (b.vel - a.vel) + (b.accel - a.accel) * t;
        dp.dot(dv) < 0.0
    };

    let dp = b.pos - a.pos;
    let touching = dp.length() <= reach + CONTACT_SLOP;
    if touching && closing(0.0) {
        return Some(0.0);
    }

    let mut separated = gap(0.0) > 0.0;
    let mut lo = 0.0;
    let mut hi = None;
    for k in 1..=BRACKET_SAMPLES {
        let t = dt * k as f64 / BRACKET_SAMPLES as f64;
        if gap(t) > 0.0 {
            separated = true;
        } else if separated {
            hi = Some(t);
            break;
        } else if closing(t) {
            return Some(turnaround(&closing, lo, t));
        }
        lo = t;
    }
    let mut hi = hi?;

    for _ in 0..BISECTION_ITERS {
        let mid = 0.5 * (lo + hi);
        if gap(mid) <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    // Stop just short of contact so the pair never starts the next event overlapping
    Some(lo)
}

/// First time in `(lo, hi]` at which a touching pair starts closing again
fn turnaround(closing: &impl Fn(f64) -> bool, mut lo: f64, mut hi: f64) -> f64 {
    for _ in 0..BISECTION_ITERS {
        let mid = 0.5 * (lo + hi);
        if closing(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

/// Earliest wall contact within `[0, dt]`.
///
/// Horizontal walls are linear in `vx`. Vertical walls solve
/// `½a·t² + vy·t + (y − boundary) = 0` when the body accelerates vertically
/// (top takes the "−" root, bottom the "+" root) and are linear otherwise.
/// A body already at or past a wall and moving into it hits at `t = 0`.
pub fn time_to_wall(m: &Motion, width: f64, height: f64, dt: f64) -> Option<WallHit> {
    let r = m.radius;
    let mut best: Option<WallHit> = None;
    let mut consider = |t: f64, wall: Wall| {
        if t <= dt && best.is_none_or(|b| t < b.t) {
            best = Some(WallHit { t, wall });
        }
    };

    // Left wall
    if m.vel.x < 0.0 {
        let gap = m.pos.x - r;
        consider(if gap <= CONTACT_SLOP { 0.0 } else { gap / -m.vel.x }, Wall::Left);
    }

    // Right wall
    if m.vel.x > 0.0 {
        let gap = width - r - m.pos.x;
        consider(if gap <= CONTACT_SLOP { 0.0 } else { gap / m.vel.x }, Wall::Right);
    }

    let a = m.accel.y;
    let vy = m.vel.y;
    let top_gap = m.pos.y - r;
    let bottom_gap = height - r - m.pos.y;

    if a.abs() < EPS {
        // Top wall
        if vy < 0.0 {
            consider(if top_gap <= CONTACT_SLOP { 0.0 } else { top_gap / -vy }, Wall::Top);
        }
        // Bottom wall
        if vy > 0.0 {
            consider(
                if bottom_gap <= CONTACT_SLOP { 0.0 } else { bottom_gap / vy },
                Wall::Bottom,
            );
        }
        return best;
    }

    // Top wall
    if top_gap <= CONTACT_SLOP {
        if vy < 0.0 {
            consider(0.0, Wall::Top);
        }
    } else {
        let disc = vy * vy - 2.0 * a * top_gap;
        if disc >= 0.0 {
            let t = (-vy - disc.sqrt()) / a;
            if t > EPS {
                consider(t, Wall::Top);
            }
        }
    }

    // Bottom wall
    if bottom_gap <= CONTACT_SLOP {
        if vy > 0.0 {
            consider(0.0, Wall::Bottom);
        }
    } else {
        let disc = vy * vy + 2.0 * a * bottom_gap;
        if disc >= 0.0 {
            let t = (-vy + disc.sqrt()) / a;
            if t > EPS {
                consider(t, Wall::Bottom);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mover(x: f64, y: f64, vx: f64, vy: f64, r: f64) -> Motion {
        Motion {
            pos: DVec2::new(x, y),
            vel: DVec2::new(vx, vy),
            accel: DVec2::ZERO,
            radius: r,
        }
    }

    #[test]
    fn test_head_on_contact_time() {
        // Gap of 10 closing at 4/tick
        let a = mover(0.0, 0.0, 2.0, 0.0, 5.0);
        let b = mover(20.0, 0.0, -2.0, 0.0, 5.0);
        let t = time_to_contact(&a, &b, 5.0).unwrap();
        assert!((t - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_contact_outside_budget() {
        let a = mover(0.0, 0.0, 2.0, 0.0, 5.0);
        let b = mover(20.0, 0.0, -2.0, 0.0, 5.0);
        assert!(time_to_contact(&a, &b, 2.0).is_none());
    }

    #[test]
    fn test_gravity_cancels_for_matching_bodies() {
        let g = DVec2::new(0.0, 0.1);
        let a = Motion {
            accel: g,
            ..mover(0.0, 0.0, 1.0, 0.0, 5.0)
        };
        let b = Motion {
            accel: g,
            ..mover(20.0, 0.0, -1.0, 0.0, 5.0)
        };
        let t = time_to_contact(&a, &b, 10.0).unwrap();
        assert!((t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_separating_and_overlapping_pairs() {
        let a = mover(0.0, 0.0, -1.0, 0.0, 5.0);
        let b = mover(20.0, 0.0, 1.0, 0.0, 5.0);
        assert!(time_to_contact(&a, &b, 100.0).is_none());

        let a = mover(0.0, 0.0, 1.0, 0.0, 5.0);
        let b = mover(6.0, 0.0, -1.0, 0.0, 5.0);
        assert!(time_to_contact(&a, &b, 100.0).is_none());
    }

    #[test]
    fn test_touching_and_approaching_is_immediate() {
        let a = mover(0.0, 0.0, 1.0, 0.0, 5.0);
        let b = mover(10.0, 0.0, -1.0, 0.0, 5.0);
        assert_eq!(time_to_contact(&a, &b, 1.0), Some(0.0));
    }

    #[test]
    fn test_bisection_against_stationary_body() {
        // Falling body onto a stationary one directly below: gap 10, v0 = 1, a = 0.1
        // 0.05t² + t − 10 = 0  →  t = (−1 + √3) / 0.1
        let falling = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(0.0, 0.0, 0.0, 1.0, 5.0)
        };
        let rock = Motion::stationary(DVec2::new(0.0, 20.0), 5.0);
        let t = time_to_contact(&falling, &rock, 20.0).unwrap();
        let expected = (-1.0 + 3.0_f64.sqrt()) / 0.1;
        assert!((t - expected).abs() < 1e-4, "t = {t}, expected {expected}");
        assert!(t <= expected);
    }

    #[test]
    fn test_touching_pair_pulled_back_by_gravity() {
        // Drifting off at 0.01 while gravity pulls back: y(t) = −0.01t + 0.05t²
        let rising = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(0.0, 0.0, 0.0, -0.01, 10.0)
        };
        let rock = Motion::stationary(DVec2::new(0.0, 20.0), 10.0);
        let t = time_to_contact(&rising, &rock, 1.0).unwrap();
        assert!((t - 0.2).abs() < 1e-4, "t = {t}");
        assert!(t <= 0.2);
    }

    #[test]
    fn test_touching_pair_at_rest_turns_into_contact() {
        let resting = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(0.0, 0.0, 0.0, 0.0, 10.0)
        };
        let rock = Motion::stationary(DVec2::new(0.0, 20.0), 10.0);
        let t = time_to_contact(&resting, &rock, 1.0).unwrap();
        assert!(t > 0.0 && t < 1e-6, "t = {t}");
    }

    #[test]
    fn test_horizontal_wall_linear() {
        let m = mover(50.0, 200.0, -5.0, 0.0, 25.0);
        let hit = time_to_wall(&m, 400.0, 400.0, 10.0).unwrap();
        assert_eq!(hit.wall, Wall::Left);
        assert!((hit.t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_floor_with_gravity_takes_plus_root() {
        // y(t) = 300 + 0·t + 0.05t², floor contact at y = 375
        let m = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(200.0, 300.0, 0.0, 0.0, 25.0)
        };
        let hit = time_to_wall(&m, 400.0, 400.0, 100.0).unwrap();
        assert_eq!(hit.wall, Wall::Bottom);
        assert!((hit.t - 1500.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_with_gravity_takes_minus_root() {
        // y(t) = 100 − 10t + 0.05t², ceiling contact at y = 25
        let m = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(200.0, 100.0, 0.0, -10.0, 25.0)
        };
        let hit = time_to_wall(&m, 400.0, 400.0, 100.0).unwrap();
        assert_eq!(hit.wall, Wall::Top);
        let expected = (10.0 - (100.0_f64 - 15.0).sqrt()) / 0.1;
        assert!((hit.t - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_unreachable_under_gravity() {
        let m = Motion {
            accel: DVec2::new(0.0, 0.1),
            ..mover(200.0, 200.0, 0.0, -1.0, 25.0)
        };
        assert!(time_to_wall(&m, 400.0, 400.0, 100.0).is_none());
    }

    #[test]
    fn test_penetrating_body_moving_outward_hits_now() {
        let m = mover(420.0, 200.0, 1.0, 0.0, 25.0);
        let hit = time_to_wall(&m, 400.0, 400.0, 1.0).unwrap();
        assert_eq!(hit.wall, Wall::Right);
        assert_eq!(hit.t, 0.0);
    }
}
