//! Frame stepper
//!
//! Advances every free body through one frame of exact-time events: find the
//! earliest ball-ball contact and the earliest wall contacts, fly everyone to
//! that instant, resolve, repeat until the frame budget is spent.

use std::collections::BTreeSet;

use glam::DVec2;

use super::collision::{exchange_shares, resolve_bodies, resolve_wall};
use super::context::FrameContext;
use super::geometry::{circles_overlap, contact_normal};
use super::solver::{CONTACT_SLOP, Wall, time_to_contact, time_to_wall};
use super::state::{Body, BodyId};
use crate::consts::EPS;
use crate::settings::ArenaConfig;

/// Penetration beyond which the out-of-bounds guard warns instead of
/// quietly correcting resting contact
const OOB_WARN_DEPTH: f64 = 1.0;
/// Gauss-Seidel passes over leftover ball-ball overlap at frame end
const SEPARATION_PASSES: u32 = 8;

/// What happened during one physics frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicsReport {
    pub ball_events: u32,
    pub wall_events: u32,
    /// The event cap was hit and the frame finished in free flight
    pub capped: bool,
    /// Bodies pulled back inside the arena after the frame
    pub corrections: u32,
    /// Overlapping pairs pushed apart after the frame
    pub separations: u32,
}

/// Status snapshot taken when the frame starts
#[derive(Debug, Clone, Copy)]
struct Status {
    frozen: bool,
    scale: f64,
}

/// Two distinct mutable elements of a slice
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "pair_mut needs distinct indices");
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

/// Bodies that pass through each other because they share a team
pub fn phases(a: &Body, b: &Body) -> bool {
    a.team == b.team && (a.flags.phases_through_team || b.flags.phases_through_team)
}

/// Pairs the solver never schedules
fn exempt(a: &Body, b: &Body) -> bool {
    !a.is_alive() || !b.is_alive() || a.inert || b.inert || phases(a, b)
}

fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    (a.min(b), a.max(b))
}

/// A body's velocity changed: its earlier pairs may meet again this frame
fn forget_pairs(resolved: &mut BTreeSet<(BodyId, BodyId)>, id: BodyId) {
    resolved.retain(|&(a, b)| a != id && b != id);
}

/// Clear `inert` on bodies no longer overlapping anything they could collide with
pub fn reactivate_inert(bodies: &mut [Body]) {
    for i in 0..bodies.len() {
        if !bodies[i].inert || !bodies[i].is_alive() {
            continue;
        }
        let me = &bodies[i];
        let clear = bodies.iter().enumerate().all(|(j, other)| {
            j == i
                || !other.is_alive()
                || phases(me, other)
                || !circles_overlap(me.pos, me.radius, other.pos, other.radius)
        });
        if clear {
            log::trace!("Body {} is clear and no longer inert", bodies[i].id);
            bodies[i].inert = false;
        }
    }
}

/// Advance every free body through one frame
pub fn step_physics(bodies: &mut [Body], ctx: &mut FrameContext) -> PhysicsReport {
    let config = ctx.config;
    let status: Vec<Status> = bodies
        .iter()
        .map(|b| Status {
            frozen: b.is_frozen(),
            scale: b.time_scale(config.slow_factor),
        })
        .collect();
    let free: Vec<usize> = (0..bodies.len()).filter(|&i| !status[i].frozen).collect();
    let frozen: Vec<usize> = (0..bodies.len()).filter(|&i| status[i].frozen).collect();

    reactivate_inert(bodies);

    let mut report = PhysicsReport::default();
    let mut resolved = BTreeSet::new();
    let mut remaining = config.dt;
    let mut events = 0u32;

    while remaining > EPS {
        if events >= config.max_events_per_frame {
            log::warn!(
                "Event cap of {} reached with {:.3} of the frame left; finishing in free flight",
                config.max_events_per_frame,
                remaining
            );
            report.capped = true;
            advance_free(bodies, &free, &status, remaining, config.gravity);
            break;
        }

        let ball = earliest_pair(bodies, &free, &frozen, &status, &resolved, remaining, config);
        let walls = earliest_walls(bodies, &free, &status, remaining, config);

        let t_ball = ball.map(|(t, _, _)| t);
        let t_wall = walls.first().map(|&(t, _, _)| t);
        let t_next = match (t_ball, t_wall) {
            (Some(a), Some(b)) => a.min(b),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => {
                advance_free(bodies, &free, &status, remaining, config.gravity);
                break;
            }
        };

        advance_free(bodies, &free, &status, t_next, config.gravity);
        remaining -= t_next;

        if let Some((t, i, j)) = ball {
            if t <= t_next + EPS {
                let (a, b) = pair_mut(bodies, i, j);
                resolve_bodies(a, status[i].frozen, b, status[j].frozen, ctx);
                forget_pairs(&mut resolved, a.id);
                forget_pairs(&mut resolved, b.id);
                resolved.insert(pair_key(a.id, b.id));
                report.ball_events += 1;
                events += 1;
            }
        }

        for &(t, i, wall) in &walls {
            if t > t_next + EPS {
                break;
            }
            resolve_wall(&mut bodies[i], wall, config.restitution);
            forget_pairs(&mut resolved, bodies[i].id);
            report.wall_events += 1;
            events += 1;
        }
    }

    report.corrections = correct_out_of_bounds(bodies, &free, config);
    report.separations = separate_overlaps(bodies, &status, config);
    report.wall_events += report.corrections;
    report
}

fn advance_free(bodies: &mut [Body], free: &[usize], status: &[Status], t: f64, gravity: f64) {
    if t <= 0.0 {
        return;
    }
    for &i in free {
        bodies[i].advance(t, status[i].scale, gravity);
    }
}

/// Earliest schedulable ball-ball contact: `(t, i, j)`
fn earliest_pair(
    bodies: &[Body],
    free: &[usize],
    frozen: &[usize],
    status: &[Status],
    resolved: &BTreeSet<(BodyId, BodyId)>,
    budget: f64,
    config: &ArenaConfig,
) -> Option<(f64, usize, usize)> {
    let motion = |i: usize| bodies[i].motion(status[i].frozen, status[i].scale, config.gravity);
    let mut best: Option<(f64, usize, usize)> = None;

    for (n, &i) in free.iter().enumerate() {
        let others = free[n + 1..].iter().chain(frozen.iter());
        for &j in others {
            let (a, b) = (&bodies[i], &bodies[j]);
            if exempt(a, b) {
                continue;
            }
            // A pair resolved this frame only meets again after time has passed
            let repeat = resolved.contains(&pair_key(a.id, b.id));
            if let Some(t) = time_to_contact(&motion(i), &motion(j), budget) {
                if repeat && t <= EPS {
                    continue;
                }
                if best.is_none_or(|(bt, _, _)| t < bt) {
                    best = Some((t, i, j));
                }
            }
        }
    }
    best
}

/// Wall contacts tied for earliest within `EPS`, sorted by time: `(t, i, wall)`
fn earliest_walls(
    bodies: &[Body],
    free: &[usize],
    status: &[Status],
    budget: f64,
    config: &ArenaConfig,
) -> Vec<(f64, usize, Wall)> {
    let mut hits: Vec<(f64, usize, Wall)> = free
        .iter()
        .filter(|&&i| bodies[i].is_alive())
        .filter_map(|&i| {
            let m = bodies[i].motion(false, status[i].scale, config.gravity);
            time_to_wall(&m, config.width, config.height, budget).map(|hit| (hit.t, i, hit.wall))
        })
        .collect();

    let Some(t_min) = hits.iter().map(|h| h.0).min_by(f64::total_cmp) else {
        return hits;
    };
    hits.retain(|h| h.0 <= t_min + EPS);
    hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    hits
}

fn clamp_inside(pos: DVec2, r: f64, w: f64, h: f64) -> DVec2 {
    DVec2::new(pos.x.clamp(r, w - r), pos.y.clamp(r, h - r))
}

/// Push apart pairs still overlapping after the event loop, which happens
/// when resting contact against a frozen body exhausts the event cap.
/// Frozen bodies hold still and nobody is pushed through a wall.
fn separate_overlaps(bodies: &mut [Body], status: &[Status], config: &ArenaConfig) -> u32 {
    let (w, h) = (config.width, config.height);
    let mut separations = 0;

    for _ in 0..SEPARATION_PASSES {
        let mut moved = false;
        for i in 0..bodies.len() {
            for j in i + 1..bodies.len() {
                if status[i].frozen && status[j].frozen {
                    continue;
                }
                let (a, b) = pair_mut(bodies, i, j);
                if exempt(a, b) || !a.flags.bounces || !b.flags.bounces {
                    continue;
                }
                let reach = a.radius + b.radius;
                let depth = reach - a.pos.distance(b.pos);
                if depth <= CONTACT_SLOP {
                    continue;
                }
                let Some(n) = contact_normal(a.pos, b.pos) else {
                    continue;
                };
                let inv_a = a.inverse_mass(status[i].frozen);
                let inv_b = b.inverse_mass(status[j].frozen);
                let Some((share_a, _)) = exchange_shares(inv_a, inv_b) else {
                    continue;
                };

                if depth > OOB_WARN_DEPTH {
                    log::warn!("Bodies {} and {} overlap by {:.3}; separating", a.id, b.id, depth);
                } else {
                    log::trace!("Bodies {} and {} settled {:.2e} together", a.id, b.id, depth);
                }

                if !status[i].frozen {
                    a.pos = clamp_inside(a.pos - n * (depth * share_a), a.radius, w, h);
                }
                // Whatever `a` could not take, `b` takes
                let remain = reach - a.pos.distance(b.pos);
                if !status[j].frozen && remain > 0.0 {
                    if let Some(n) = contact_normal(a.pos, b.pos) {
                        b.pos = clamp_inside(b.pos + n * remain, b.radius, w, h);
                    }
                }
                separations += 1;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    separations
}

/// Pull escaped bodies back inside and send them inward
fn correct_out_of_bounds(bodies: &mut [Body], free: &[usize], config: &ArenaConfig) -> u32 {
    let (w, h) = (config.width, config.height);
    let mut corrections = 0;

    for &i in free {
        let body = &mut bodies[i];
        if !body.is_alive() || body.in_bounds(w, h, CONTACT_SLOP) {
            continue;
        }
        let r = body.radius;
        let clamped = clamp_inside(body.pos, r, w, h);
        let depth = (clamped - body.pos).length();
        if depth > OOB_WARN_DEPTH {
            log::warn!(
                "Body {} escaped the arena by {:.3} at ({:.2}, {:.2}); clamped",
                body.id,
                depth,
                body.pos.x,
                body.pos.y
            );
        } else {
            log::trace!("Body {} settled {:.2e} into a wall", body.id, depth);
        }

        let outward = [
            (body.pos.x < r && body.vel.x < 0.0, Wall::Left),
            (body.pos.x > w - r && body.vel.x > 0.0, Wall::Right),
            (body.pos.y < r && body.vel.y < 0.0, Wall::Top),
            (body.pos.y > h - r && body.vel.y > 0.0, Wall::Bottom),
        ];
        body.pos = clamped;
        for (moving_out, wall) in outward {
            if moving_out {
                resolve_wall(body, wall, config.restitution);
            }
        }
        corrections += 1;
    }
    corrections
}
