//! Collision response
//!
//! Impulse exchange along the contact normal between two bodies, and wall
//! reflection. Contact hooks fire on every resolved contact, even when the
//! pair does not bounce.

use glam::DVec2;

use super::archetype;
use super::context::FrameContext;
use super::geometry::contact_normal;
use super::solver::Wall;
use super::state::Body;
use crate::consts::EPS;

/// Reflect velocity about a surface normal: v' = v - (1 + e)(v·n)n
pub fn reflect_velocity(velocity: DVec2, normal: DVec2, restitution: f64) -> DVec2 {
    velocity - (1.0 + restitution) * velocity.dot(normal) * normal
}

/// Velocity without the banked boost along the direction of travel
pub fn strip_boost(vel: DVec2, boost: f64) -> DVec2 {
    let speed = vel.length();
    if boost <= 0.0 || speed < EPS {
        return vel;
    }
    vel * ((speed - boost).max(0.0) / speed)
}

/// Re-add banked boost along the new direction of travel
pub fn restore_boost(vel: DVec2, boost: f64, fallback: DVec2) -> DVec2 {
    if boost <= 0.0 {
        return vel;
    }
    vel + vel.try_normalize().unwrap_or(fallback) * boost
}

/// Keep a boosted body from driving into the body it just hit
fn clamp_chase(vel: DVec2, other_vel: DVec2, n: DVec2) -> DVec2 {
    let closing = (vel - other_vel).dot(n);
    if closing <= 0.0 {
        return vel;
    }
    let along = vel.dot(n);
    if along > 0.0 {
        vel - 2.0 * along * n
    } else {
        vel - closing * n
    }
}

/// How an exchange between two inverse masses splits: a massless side
/// takes everything, a frozen side (zero inverse mass) nothing.
/// `None` when neither side can move.
pub fn exchange_shares(inv_a: f64, inv_b: f64) -> Option<(f64, f64)> {
    match (inv_a.is_infinite(), inv_b.is_infinite()) {
        (true, true) => None,
        (true, false) => Some((1.0, 0.0)),
        (false, true) => Some((0.0, 1.0)),
        _ if inv_a + inv_b < EPS => None,
        _ => Some((inv_a / (inv_a + inv_b), inv_b / (inv_a + inv_b))),
    }
}

/// Resolve a contact between `a` and `b` at the current instant.
///
/// `a_frozen`/`b_frozen` come from the frame's status snapshot: a frozen
/// side has zero velocity and infinite mass for the exchange.
pub fn resolve_bodies(
    a: &mut Body,
    a_frozen: bool,
    b: &mut Body,
    b_frozen: bool,
    ctx: &mut FrameContext,
) {
    archetype::on_body_contact(a, b, ctx);
    archetype::on_body_contact(b, a, ctx);

    if !a.flags.bounces || !b.flags.bounces {
        return;
    }

    let inv_a = a.inverse_mass(a_frozen);
    let inv_b = b.inverse_mass(b_frozen);
    let Some((share_a, share_b)) = exchange_shares(inv_a, inv_b) else {
        return;
    };

    let n = contact_normal(a.pos, b.pos);
    debug_assert!(n.is_some(), "resolving coincident bodies {} and {}", a.id, b.id);
    let Some(n) = n else {
        return;
    };

    let va = if a_frozen { DVec2::ZERO } else { strip_boost(a.vel, a.boost) };
    let vb = if b_frozen { DVec2::ZERO } else { strip_boost(b.vel, b.boost) };

    // Only exchange along the normal when closing
    let vn = (vb - va).dot(n);
    if vn > 0.0 {
        return;
    }

    let impulse = (1.0 + ctx.config.restitution) * vn;
    let va = va + n * (impulse * share_a);
    let vb = vb - n * (impulse * share_b);

    if !a_frozen {
        a.vel = restore_boost(va, a.boost, -n);
    }
    if !b_frozen {
        b.vel = restore_boost(vb, b.boost, n);
    }

    let vb_now = if b_frozen { DVec2::ZERO } else { b.vel };
    if !a_frozen && a.boost > 0.0 {
        a.vel = clamp_chase(a.vel, vb_now, n);
    }
    let va_now = if a_frozen { DVec2::ZERO } else { a.vel };
    if !b_frozen && b.boost > 0.0 {
        b.vel = clamp_chase(b.vel, va_now, -n);
    }
}

/// Reflect a body off a wall, then run its wall hooks
pub fn resolve_wall(body: &mut Body, wall: Wall, restitution: f64) {
    body.vel = reflect_velocity(body.vel, wall.normal(), restitution);
    archetype::on_wall(body);
}
