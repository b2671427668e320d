//! Per-frame mutation context
//!
//! Hooks never reach back into the arena. Anything that would mutate it
//! (spawning, crediting an owner, reading live populations) goes through a
//! [`FrameContext`], which the orchestrator drains at the end of the frame.

use std::collections::BTreeMap;

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Behavior, Body, BodyId, BodyKind, Team};
use crate::settings::ArenaConfig;

/// Live-population counters used by spawn caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Population {
    /// Duplicators alive on a team
    Duplicators(Team),
    /// Turrets owned by a body
    Turrets(BodyId),
    /// Minions owned by a body
    Minions(BodyId),
}

/// Effects owed to another body, applied after the frame's hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    /// A projectile owned by `owner` connected
    ProjectileHit { owner: BodyId },
}

pub struct FrameContext<'a> {
    pub config: &'a ArenaConfig,
    rng: &'a mut Pcg32,
    next_id: &'a mut BodyId,
    spawns: Vec<Body>,
    credits: Vec<Credit>,
    populations: BTreeMap<Population, u32>,
}

impl<'a> FrameContext<'a> {
    /// Build a context, counting live populations in `bodies`
    pub fn new(
        config: &'a ArenaConfig,
        rng: &'a mut Pcg32,
        next_id: &'a mut BodyId,
        bodies: &[Body],
    ) -> Self {
        let mut ctx = Self {
            config,
            rng,
            next_id,
            spawns: Vec::new(),
            credits: Vec::new(),
            populations: BTreeMap::new(),
        };
        for body in bodies.iter().filter(|b| b.is_alive()) {
            ctx.tally(body);
        }
        ctx
    }

    fn tally(&mut self, body: &Body) {
        if matches!(body.behavior, Behavior::Duplicator { .. }) {
            self.count(Population::Duplicators(body.team));
        }
        if let Some(owner) = body.owner.filter(|_| body.flags.owner_bound) {
            match body.kind {
                BodyKind::Turret => self.count(Population::Turrets(owner)),
                BodyKind::Ball => self.count(Population::Minions(owner)),
                BodyKind::Projectile => {}
            }
        }
    }

    pub fn population(&self, key: Population) -> u32 {
        self.populations.get(&key).copied().unwrap_or(0)
    }

    pub fn count(&mut self, key: Population) {
        *self.populations.entry(key).or_insert(0) += 1;
    }

    /// Queue a body for insertion at the end of the frame; returns its id.
    /// Populations are updated immediately so later hooks see the new count.
    pub fn spawn(&mut self, mut body: Body) -> BodyId {
        body.id = *self.next_id;
        *self.next_id += 1;
        body.prev_pos = body.pos;
        self.tally(&body);
        log::debug!(
            "Spawned {:?} {} for team {} at ({:.1}, {:.1})",
            body.kind,
            body.id,
            body.team,
            body.pos.x,
            body.pos.y
        );
        let id = body.id;
        self.spawns.push(body);
        id
    }

    pub fn credit(&mut self, credit: Credit) {
        self.credits.push(credit);
    }

    /// Random direction at fixed speed
    pub fn random_velocity(&mut self, speed: f64) -> DVec2 {
        random_velocity(self.rng, speed)
    }

    /// Drain queued spawns and credits
    pub fn finish(self) -> (Vec<Body>, Vec<Credit>) {
        (self.spawns, self.credits)
    }
}

/// Random direction at fixed speed from a seeded generator
pub fn random_velocity(rng: &mut Pcg32, speed: f64) -> DVec2 {
    let theta = rng.random_range(0.0..std::f64::consts::TAU);
    DVec2::new(theta.cos(), theta.sin()) * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_populations_and_spawn_ids() {
        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 10;

        let mut dup = Body::ball(DVec2::new(50.0, 50.0), DVec2::ZERO, 20.0, 50).with_team(1);
        dup.behavior = Behavior::Duplicator { cooldown: 0 };
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[dup.clone()]);
        assert_eq!(ctx.population(Population::Duplicators(1)), 1);
        assert_eq!(ctx.population(Population::Duplicators(2)), 0);

        let id = ctx.spawn(dup);
        assert_eq!(id, 10);
        assert_eq!(ctx.population(Population::Duplicators(1)), 2);

        ctx.credit(Credit::ProjectileHit { owner: 3 });
        let (spawns, credits) = ctx.finish();
        assert_eq!(spawns.len(), 1);
        assert_eq!(credits, vec![Credit::ProjectileHit { owner: 3 }]);
        assert_eq!(next_id, 11);
    }

    #[test]
    fn test_random_velocity_is_deterministic() {
        let mut a = Pcg32::seed_from_u64(42);
        let mut b = Pcg32::seed_from_u64(42);
        let va = random_velocity(&mut a, 5.0);
        let vb = random_velocity(&mut b, 5.0);
        assert_eq!(va, vb);
        assert!((va.length() - 5.0).abs() < 1e-12);
    }
}
