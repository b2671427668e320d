//! Fixed timestep battle orchestrator
//!
//! One `update()` is one frame: physics events, behavior ticks, the
//! substepped weapon sweep, then the death sweep.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::archetype::{self, Target};
use super::context::{self, Credit, FrameContext};
use super::physics::{pair_mut, step_physics};
use super::state::{Body, BodyId, Team};
use crate::settings::ArenaConfig;

/// Hard ceiling on weapon substeps in one frame
pub const MAX_WEAPON_SUBSTEPS: u32 = 512;

/// Summary of the most recent frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub tick: u64,
    /// Live combatants per team
    pub team_counts: BTreeMap<Team, u32>,
    pub ball_events: u32,
    pub wall_events: u32,
    /// Weapon substeps sampled this frame
    pub substeps: u32,
    pub spawned: u32,
    pub removed: u32,
}

/// Status snapshot taken at frame start for the weapon phase
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    /// In hit-stop; anchored bodies still take part as targets
    hit_stopped: bool,
    scale: f64,
}

/// An arena full of bodies, advanced one frame at a time
#[derive(Debug, Clone)]
pub struct BallBattle {
    config: ArenaConfig,
    /// Seed for reproducibility
    seed: u64,
    rng: Pcg32,
    /// Sorted by id
    bodies: Vec<Body>,
    time_ticks: u64,
    next_id: BodyId,
    stats: FrameStats,
}

impl BallBattle {
    pub fn new(config: ArenaConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            bodies: Vec::new(),
            time_ticks: 0,
            next_id: 1,
            stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        index_of(&self.bodies, id).map(|i| &self.bodies[i])
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        index_of(&self.bodies, id).map(|i| &mut self.bodies[i])
    }

    /// Live combatants
    pub fn balls(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_combatant())
    }

    /// Add a body, assigning it the next id
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        body.id = self.next_id;
        self.next_id += 1;
        body.prev_pos = body.pos;
        log::debug!(
            "Added {:?} {} ({}) for team {}",
            body.kind,
            body.id,
            body.archetype.map_or("plain", |a| a.name()),
            body.team
        );
        let id = body.id;
        self.bodies.push(body);
        id
    }

    /// Random launch velocity from the battle's seeded generator
    pub fn random_velocity(&mut self, speed: f64) -> DVec2 {
        context::random_velocity(&mut self.rng, speed)
    }

    pub fn team_alive(&self, team: Team) -> u32 {
        self.balls().filter(|b| b.team == team).count() as u32
    }

    /// Live combatants per team
    pub fn teams_alive(&self) -> BTreeMap<Team, u32> {
        let mut counts = BTreeMap::new();
        for b in self.balls() {
            *counts.entry(b.team).or_insert(0) += 1;
        }
        counts
    }

    /// Kinetic plus gravitational potential energy of every live body
    pub fn total_energy(&self) -> f64 {
        let (g, h) = (self.config.gravity, self.config.height);
        self.bodies
            .iter()
            .filter(|b| b.is_alive())
            .map(|b| b.kinetic_energy() + b.potential_energy(g, h))
            .sum()
    }

    /// Advance the battle by one frame
    pub fn update(&mut self) -> &FrameStats {
        self.time_ticks += 1;
        for body in &mut self.bodies {
            body.prev_pos = body.pos;
        }
        let snapshot: Vec<Snapshot> = self
            .bodies
            .iter()
            .map(|b| Snapshot {
                hit_stopped: b.freeze_ticks > 0,
                scale: b.time_scale(self.config.slow_factor),
            })
            .collect();

        let Self {
            config,
            rng,
            bodies,
            next_id,
            ..
        } = self;
        let mut ctx = FrameContext::new(config, rng, next_id, bodies);

        let physics = step_physics(bodies, &mut ctx);

        let targets: Vec<Target> = bodies
            .iter()
            .filter(|b| b.is_alive())
            .map(Target::of)
            .collect();
        for body in bodies.iter_mut().filter(|b| b.is_alive()) {
            archetype::on_update(body, &targets, &mut ctx);
        }

        let substeps = sweep_weapons(bodies, &snapshot, &mut ctx);

        let (spawns, credits) = ctx.finish();
        for credit in credits {
            let Credit::ProjectileHit { owner } = credit;
            if let Some(i) = index_of(bodies, owner) {
                archetype::apply_credit(&mut bodies[i], credit);
            }
        }
        let spawned = spawns.len() as u32;
        bodies.extend(spawns);

        let removed = remove_dead(bodies);

        self.stats = FrameStats {
            tick: self.time_ticks,
            team_counts: self.teams_alive(),
            ball_events: physics.ball_events,
            wall_events: physics.wall_events,
            substeps,
            spawned,
            removed,
        };
        &self.stats
    }
}

fn index_of(bodies: &[Body], id: BodyId) -> Option<usize> {
    bodies.binary_search_by_key(&id, |b| b.id).ok()
}

/// Substepped weapon contact sweep over bodies active this frame.
/// Returns the number of substeps sampled.
fn sweep_weapons(bodies: &mut [Body], snapshot: &[Snapshot], ctx: &mut FrameContext) -> u32 {
    let config = ctx.config;

    // Hit-stop counts down instead of fighting
    for (body, status) in bodies.iter_mut().zip(snapshot) {
        if status.hit_stopped {
            body.freeze_ticks = body.freeze_ticks.saturating_sub(1);
        }
    }

    let active: Vec<usize> = (0..snapshot.len())
        .filter(|&i| !snapshot[i].hit_stopped && bodies[i].is_alive() && !bodies[i].inert)
        .collect();
    if active.is_empty() {
        return 0;
    }

    let max_spin = active
        .iter()
        .flat_map(|&i| bodies[i].weapons.iter().map(move |w| w.ang_vel.abs() * snapshot[i].scale))
        .fold(0.0, f64::max);
    let mut substeps = (max_spin * config.dt / config.angular_substep_budget).ceil() as u32;
    for &i in &active {
        let body = &bodies[i];
        if body.weapons.iter().any(|w| w.linear_sweep) {
            let travel = (body.pos - body.prev_pos).length();
            substeps = substeps.max((travel / config.linear_substep_budget).ceil() as u32);
        }
    }
    let substeps = substeps.clamp(1, MAX_WEAPON_SUBSTEPS);
    let sub_dt = config.dt / substeps as f64;

    for k in 0..substeps {
        let frac = (k + 1) as f64 / substeps as f64;

        for &i in &active {
            let body = &mut bodies[i];
            let (vel, dt) = (body.vel, sub_dt * snapshot[i].scale);
            for w in &mut body.weapons {
                w.update(vel, dt);
            }
        }

        for (n, &i) in active.iter().enumerate() {
            for &j in &active[n + 1..] {
                let (a, b) = pair_mut(bodies, i, j);
                if !a.is_alive() || !b.is_alive() || a.team == b.team {
                    continue;
                }
                let (pa, pb) = (a.anchor(frac), b.anchor(frac));
                strike(a, pa, b, pb, ctx);
                strike(b, pb, a, pa, ctx);
                clash(a, pa, b, pb);
            }
        }
    }

    for &i in &active {
        for w in &mut bodies[i].weapons {
            w.tick_iframes();
        }
    }
    substeps
}

/// Weapons of `a` against the body of `b`
fn strike(a: &mut Body, pa: DVec2, b: &mut Body, pb: DVec2, ctx: &mut FrameContext) {
    if a.weapons.is_empty() || !a.is_alive() {
        return;
    }
    let mut weapons = std::mem::take(&mut a.weapons);
    for w in weapons.iter_mut().filter(|w| w.deals_hits()) {
        let seg = w.hit_segment(pa, a.radius);
        if !seg.touches_circle(pb, b.radius) {
            continue;
        }
        w.contacts.insert(b.id);
        if w.colliding_with.contains_key(&b.id) {
            continue;
        }
        w.colliding_with.insert(b.id, w.iframes);
        let contact = seg.closest_point(pb);
        archetype::fire_hit_hooks(w, a, b, contact, ctx);
        if !b.is_alive() {
            break;
        }
    }
    a.weapons = weapons;
}

/// Weapon-on-weapon contact between `a` and `b`
fn clash(a: &mut Body, pa: DVec2, b: &mut Body, pb: DVec2) {
    if !a.weapons.iter().any(|w| w.parries()) || !b.weapons.iter().any(|w| w.parries()) {
        return;
    }
    let mut wa = std::mem::take(&mut a.weapons);
    let mut wb = std::mem::take(&mut b.weapons);
    for x in wa.iter_mut().filter(|w| w.parries()) {
        for y in wb.iter_mut().filter(|w| w.parries()) {
            let sa = x.hit_segment(pa, a.radius);
            let sb = y.hit_segment(pb, b.radius);
            if sa.touches_segment(&sb) {
                archetype::fire_parry_hooks(x, a, pa, b, pb);
                archetype::fire_parry_hooks(y, b, pb, a, pa);
            }
        }
    }
    a.weapons = wa;
    b.weapons = wb;
}

/// Owner cascade, then removal of dead bodies and their bookkeeping.
/// Returns how many bodies were removed.
fn remove_dead(bodies: &mut Vec<Body>) -> u32 {
    loop {
        let alive: BTreeSet<BodyId> = bodies.iter().filter(|b| b.is_alive()).map(|b| b.id).collect();
        let mut cascaded = false;
        for body in bodies.iter_mut().filter(|b| b.is_alive() && b.flags.owner_bound) {
            if let Some(owner) = body.owner.filter(|o| !alive.contains(o)) {
                log::debug!("Body {} dies with its owner {}", body.id, owner);
                body.hp = 0;
                cascaded = true;
            }
        }
        if !cascaded {
            break;
        }
    }

    let dead: Vec<BodyId> = bodies.iter().filter(|b| !b.is_alive()).map(|b| b.id).collect();
    if dead.is_empty() {
        return 0;
    }
    for id in &dead {
        log::debug!("Body {} removed", id);
    }
    bodies.retain(|b| b.is_alive());
    for body in bodies.iter_mut() {
        for w in &mut body.weapons {
            for &id in &dead {
                w.forget(id);
            }
        }
    }
    dead.len() as u32
}
