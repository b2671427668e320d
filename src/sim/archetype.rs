//! Fighter archetypes and their behavior
//!
//! Construction of every archetype, plus the dispatch for weapon hit/parry
//! hooks, body-contact and wall hooks, and per-frame behavior ticks.

use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::context::{Credit, FrameContext, Population};
use super::state::{Behavior, Body, BodyId, BodyKind, Team};
use super::weapon::{HitHook, ParryHook, Sprite, Weapon};
use crate::consts::SPAWN_SPEED;
use crate::{direction, polar_offset};

// === Fighters ===
pub const BALL_RADIUS: f64 = 25.0;
pub const BALL_HP: i32 = 100;
/// Hit-stop applied to both balls when weapons clash
pub const PARRY_FREEZE: u32 = 15;

// === Duplicator ===
pub const DUPLICATOR_RADIUS: f64 = 20.0;
pub const DUPLICATOR_HP: i32 = 50;
pub const DUPLICATE_COOLDOWN: u32 = 30;

// === Lance ===
/// Ticks without a hit before the combo lapses
pub const LANCE_LENIENCY: u32 = 90;
pub const LANCE_BOOST_PER_COMBO: f64 = 1.0;
pub const LANCE_MAX_BOOST: f64 = 6.0;
pub const LANCE_HITSTOP: u32 = 10;
pub const LANCE_IFRAMES: u32 = 20;

// === Machine gun ===
pub const GUN_RELOAD_TICKS: f64 = 60.0;
/// A burst spreads its rounds evenly over this many ticks
pub const GUN_BURST_TICKS: f64 = 30.0;
pub const GUN_START_ROUNDS: f64 = 6.0;
pub const GUN_ROUNDS_PER_HIT: f64 = 0.5;
pub const BULLET_RADIUS: f64 = 4.0;
pub const BULLET_SPEED: f64 = 7.0;
pub const BULLET_RICOCHETS: u32 = 1;

// === Wrench turrets ===
pub const TURRET_RADIUS: f64 = 10.0;
pub const TURRET_HP: i32 = 5;
pub const TURRET_FIRE_INTERVAL: f64 = 60.0;
pub const TURRET_BULLET_SPEED: f64 = 2.5;
pub const TURRET_SLOW: u32 = 30;
pub const TURRET_CAP: u32 = 3;

// === Grimoire minions ===
pub const MINION_SCALE: f64 = 0.6;
pub const MINION_HP: i32 = 15;
pub const MINION_CAP: u32 = 3;

/// Every fighter the arena knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Dagger,
    Sword,
    Hammer,
    Lance,
    MachineGun,
    Duplicator,
    Wrench,
    Grimoire,
}

impl Archetype {
    pub const ALL: [Archetype; 8] = [
        Archetype::Dagger,
        Archetype::Sword,
        Archetype::Hammer,
        Archetype::Lance,
        Archetype::MachineGun,
        Archetype::Duplicator,
        Archetype::Wrench,
        Archetype::Grimoire,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Archetype::Dagger => "dagger",
            Archetype::Sword => "sword",
            Archetype::Hammer => "hammer",
            Archetype::Lance => "lance",
            Archetype::MachineGun => "machinegun",
            Archetype::Duplicator => "duplicator",
            Archetype::Wrench => "wrench",
            Archetype::Grimoire => "grimoire",
        }
    }

    pub fn color(self) -> [f32; 4] {
        match self {
            Archetype::Dagger => [0.30, 0.80, 0.40, 1.0],
            Archetype::Sword => [0.90, 0.30, 0.30, 1.0],
            Archetype::Hammer => [0.60, 0.50, 0.40, 1.0],
            Archetype::Lance => [0.90, 0.80, 0.30, 1.0],
            Archetype::MachineGun => [0.50, 0.50, 0.60, 1.0],
            Archetype::Duplicator => [0.70, 0.40, 0.90, 1.0],
            Archetype::Wrench => [0.95, 0.60, 0.20, 1.0],
            Archetype::Grimoire => [0.40, 0.50, 0.95, 1.0],
        }
    }

    /// Build a fresh fighter of this archetype
    pub fn build(self, team: Team, pos: DVec2, vel: DVec2, theta: f64) -> Body {
        let mut body = match self {
            Archetype::Duplicator => {
                let mut body = Body::ball(pos, vel, DUPLICATOR_RADIUS, DUPLICATOR_HP);
                body.flags.halved_hitstop = true;
                body.behavior = Behavior::Duplicator { cooldown: 0 };
                body
            }
            _ => Body::ball(pos, vel, BALL_RADIUS, BALL_HP),
        };
        body.team = team;
        body.archetype = Some(self);
        body.color = self.color();

        match self {
            Archetype::Dagger => body.weapons.push(
                Weapon::new(theta, Sprite::Dagger)
                    .draw(2.0, -6.0, FRAC_PI_4)
                    .collider(20.0, 4.0)
                    .spin(0.1257)
                    .parry(PARRY_FREEZE)
                    .damage(1, 0, 6)
                    .on_hit(HitHook::SpinUp {
                        step: 0.0628,
                        retrigger: 0,
                    }),
            ),
            Archetype::Sword => {
                let mut sword = Weapon::new(theta, Sprite::Sword)
                    .draw(3.0, -5.0, FRAC_PI_4)
                    .collider(50.0, 7.0)
                    .spin(0.0628)
                    .parry(PARRY_FREEZE)
                    .damage(1, 15, 20)
                    .on_hit(HitHook::DamageUp {
                        step: 1,
                        retrigger: 0,
                    })
                    .on_hit(HitHook::Reflect);
                sword.reflects_projectiles = true;
                body.weapons.push(sword);
            }
            Archetype::Hammer => body.weapons.push(
                Weapon::new(theta, Sprite::Hammer)
                    .draw(2.5, -4.0, FRAC_PI_4)
                    .collider(40.0, 12.0)
                    .spin(0.04)
                    .parry(PARRY_FREEZE)
                    .damage(3, 20, 25)
                    .on_hit(HitHook::SpinUp {
                        step: 0.015,
                        retrigger: 30,
                    }),
            ),
            Archetype::Lance => {
                let mut lance = Weapon::new(theta, Sprite::Lance)
                    .draw(3.0, -10.0, FRAC_PI_4)
                    .collider(45.0, 6.0)
                    .align_to_velocity()
                    .on_hit(HitHook::LanceCombo);
                lance.dmg = 1;
                lance.iframes = LANCE_IFRAMES;
                lance.linear_sweep = true;
                body.weapons.push(lance);
                body.behavior = Behavior::Lance(LanceState::default());
            }
            Archetype::MachineGun => {
                let mut gun = Weapon::new(theta, Sprite::Gun).draw(1.5, -2.0, 0.0).spin(0.05);
                gun.dmg = 1;
                body.weapons.push(gun);
                body.behavior = Behavior::MachineGun(GunState::default());
            }
            Archetype::Duplicator => {}
            Archetype::Wrench => body.weapons.push(
                Weapon::new(theta, Sprite::Wrench)
                    .draw(2.0, -5.0, FRAC_PI_4)
                    .collider(35.0, 6.0)
                    .spin(0.08)
                    .parry(PARRY_FREEZE)
                    .damage(1, 15, 15)
                    .on_hit(HitHook::SpinUp {
                        step: 0.02,
                        retrigger: 0,
                    })
                    .on_hit(HitHook::SpawnTurret),
            ),
            Archetype::Grimoire => body.weapons.push(
                Weapon::new(theta, Sprite::Grimoire)
                    .draw(1.5, 0.0, 0.0)
                    .collider(30.0, 8.0)
                    .spin(0.07)
                    .parry(PARRY_FREEZE)
                    .damage(1, 15, 15)
                    .on_hit(HitHook::SummonMinion),
            ),
        }
        body
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match key.as_str() {
            "gun" => return Ok(Archetype::MachineGun),
            "dup" => return Ok(Archetype::Duplicator),
            _ => {}
        }
        Archetype::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| {
                let names: Vec<_> = Archetype::ALL.iter().map(|a| a.name()).collect();
                format!("unknown archetype '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

// === Behavior state ===

/// Lance combo tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanceState {
    pub combo: u32,
    /// Ticks since the last combo hit
    pub since_hit: u32,
}

impl Default for LanceState {
    fn default() -> Self {
        Self {
            combo: 0,
            since_hit: LANCE_LENIENCY + 1,
        }
    }
}

impl LanceState {
    /// Combo still counts toward the next hit
    pub fn is_live(&self) -> bool {
        self.since_hit <= LANCE_LENIENCY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GunPhase {
    Reloading { left: f64 },
    Firing { shots_left: u32, interval: f64, clock: f64 },
}

/// Machine-gun magazine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GunState {
    pub phase: GunPhase,
    /// Bullets per burst; fractional rounds accumulate from hits
    pub rounds: f64,
}

impl Default for GunState {
    fn default() -> Self {
        Self {
            phase: GunPhase::Reloading {
                left: GUN_RELOAD_TICKS,
            },
            rounds: GUN_START_ROUNDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurretState {
    pub fire_timer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub damage: i32,
    /// Wall bounces left before the projectile dies on a wall
    pub ricochets: u32,
    /// Slow applied to whatever it hits
    pub slow: u32,
    /// Turned around by an enemy weapon
    pub reflected: bool,
}

/// What a behavior tick may know about other bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: BodyId,
    pub team: Team,
    pub pos: DVec2,
    pub combatant: bool,
}

impl Target {
    pub fn of(body: &Body) -> Self {
        Self {
            id: body.id,
            team: body.team,
            pos: body.pos,
            combatant: body.is_combatant(),
        }
    }
}

/// n-th triangular number
pub fn triangular(n: u32) -> i32 {
    (n * (n + 1) / 2) as i32
}

fn hitstop(freeze: u32, target: &Body) -> u32 {
    if target.flags.halved_hitstop {
        freeze.div_ceil(2)
    } else {
        freeze
    }
}

// === Weapon hooks ===

/// Run a weapon's hit hooks for its first contact with `target`.
/// The weapon is detached from `me` while its hooks run.
pub fn fire_hit_hooks(
    w: &mut Weapon,
    me: &mut Body,
    target: &mut Body,
    contact: DVec2,
    ctx: &mut FrameContext,
) {
    let flash = ctx.config.flash_ticks;
    for i in 0..w.hit_hooks.len() {
        match w.hit_hooks[i] {
            HitHook::Damage { freeze } => {
                if target.kind == BodyKind::Projectile && w.reflects_projectiles {
                    continue;
                }
                target.damage(w.dmg, flash);
                if target.kind == BodyKind::Ball {
                    let stop = hitstop(freeze, target);
                    me.freeze(stop);
                    target.freeze(stop);
                }
                log::debug!("{} hit {} for {} (hp {})", me.id, target.id, w.dmg, target.hp);
            }
            HitHook::SpinUp { step, retrigger } => {
                if target.kind == BodyKind::Ball && w.retrigger_ready(target.id, retrigger) {
                    w.ang_vel = (w.ang_vel.abs() + step) * w.ang_vel.signum();
                }
            }
            HitHook::DamageUp { step, retrigger } => {
                if target.kind == BodyKind::Ball && w.retrigger_ready(target.id, retrigger) {
                    w.dmg += step;
                }
            }
            HitHook::LanceCombo => lance_strike(w, me, target, ctx),
            HitHook::SpawnTurret => spawn_turret(me, target, contact, ctx),
            HitHook::SummonMinion => summon_minion(me, target, ctx),
            HitHook::Reflect => reflect_projectile(me, target),
        }
    }
}

/// Run a weapon's parry hooks against `other`'s weapon
pub fn fire_parry_hooks(
    w: &mut Weapon,
    me: &mut Body,
    me_anchor: DVec2,
    other: &mut Body,
    other_anchor: DVec2,
) {
    for i in 0..w.parry_hooks.len() {
        match w.parry_hooks[i] {
            ParryHook::Reverse { freeze } => {
                let to_other = other_anchor - me_anchor;
                let heading = to_other.y.atan2(to_other.x);
                if (heading - w.theta).sin() * w.ang_vel > 0.0 {
                    w.ang_vel = -w.ang_vel;
                    w.flipped = w.ang_vel < 0.0;
                    me.freeze(freeze);
                    other.freeze(freeze);
                    log::debug!("{} parried {}", me.id, other.id);
                }
            }
        }
    }
}

/// Every strike that clears the weapon's per-target iframes counts as a new
/// approach and raises the combo. Holding the tip against a target does not,
/// since iframes stay pinned while contact lasts, so one opponent builds the
/// combo only by being struck again after contact breaks.
fn lance_strike(w: &mut Weapon, me: &mut Body, target: &mut Body, ctx: &mut FrameContext) {
    let flash = ctx.config.flash_ticks;
    if target.kind != BodyKind::Ball {
        target.damage(w.dmg, flash);
        return;
    }
    let Behavior::Lance(lance) = &mut me.behavior else {
        target.damage(w.dmg, flash);
        return;
    };

    // Lapsed combos reset on the next hit
    if !lance.is_live() {
        lance.combo = 0;
    }
    lance.combo += 1;
    lance.since_hit = 0;
    let combo = lance.combo;

    target.damage(triangular(combo) * w.dmg, flash);
    let stop = hitstop(LANCE_HITSTOP, target);
    me.freeze(stop);
    target.freeze(stop);

    let gained = LANCE_BOOST_PER_COMBO.min(LANCE_MAX_BOOST - me.boost).max(0.0);
    if gained > 0.0 {
        let dir = me.vel.try_normalize().unwrap_or_else(|| direction(w.theta));
        me.vel += dir * gained;
        me.boost += gained;
    }
    log::debug!("Lance {} combo {} on {} (boost {:.1})", me.id, combo, target.id, me.boost);
}

fn spawn_turret(me: &Body, target: &Body, contact: DVec2, ctx: &mut FrameContext) {
    if target.kind != BodyKind::Ball || target.team == me.team {
        return;
    }
    if ctx.population(Population::Turrets(me.id)) >= TURRET_CAP {
        return;
    }
    let (w, h) = (ctx.config.width, ctx.config.height);
    let r = TURRET_RADIUS;
    if contact.x < r || contact.x > w - r || contact.y < r || contact.y > h - r {
        return;
    }

    let mut turret = Body::new(BodyKind::Turret, contact, DVec2::ZERO, r, TURRET_HP);
    turret.team = me.team;
    turret.owner = Some(me.id);
    turret.gravity = false;
    turret.inert = true;
    turret.z_index = -1;
    turret.color = [me.color[0] * 0.7, me.color[1] * 0.7, me.color[2] * 0.7, 1.0];
    turret.behavior = Behavior::Turret(TurretState {
        fire_timer: TURRET_FIRE_INTERVAL,
    });
    ctx.spawn(turret);
}

fn summon_minion(me: &Body, target: &Body, ctx: &mut FrameContext) {
    if target.kind != BodyKind::Ball || target.team == me.team {
        return;
    }
    let Some(archetype) = target.archetype else {
        return;
    };
    if ctx.population(Population::Minions(me.id)) >= MINION_CAP {
        return;
    }

    let vel = ctx.random_velocity(SPAWN_SPEED);
    let mut minion = archetype.build(me.team, me.pos, vel, 0.0);
    minion.radius *= MINION_SCALE;
    minion.mass = minion.radius * minion.radius;
    minion.hp = MINION_HP;
    minion.max_hp = MINION_HP;
    minion.owner = Some(me.id);
    minion.flags.owner_bound = true;
    minion.inert = true;
    minion.z_index = -1;

    minion.weapons = std::mem::take(&mut minion.weapons)
        .into_iter()
        .map(|w| w.scaled(MINION_SCALE))
        .collect();
    for (mine, theirs) in minion.weapons.iter_mut().zip(&target.weapons) {
        mine.dmg = ((theirs.dmg + 1) / 2).max(1);
    }

    if target.boost > 0.0 {
        minion.boost = target.boost / 2.0;
        minion.vel += vel / SPAWN_SPEED * minion.boost;
    }
    if let (Behavior::MachineGun(mine), Behavior::MachineGun(theirs)) =
        (&mut minion.behavior, &target.behavior)
    {
        mine.rounds = (theirs.rounds * 0.5).max(1.0);
    }

    ctx.spawn(minion);
}

fn reflect_projectile(me: &Body, target: &mut Body) {
    if target.kind != BodyKind::Projectile || target.team == me.team {
        return;
    }
    let away = (target.pos - me.pos).try_normalize().unwrap_or(DVec2::X);
    if target.vel.dot(away) < 0.0 {
        target.vel = super::collision::reflect_velocity(target.vel, away, 1.0);
    }
    target.team = me.team;
    target.owner = Some(me.id);
    if let Behavior::Projectile(shot) = &mut target.behavior {
        shot.reflected = true;
    }
    log::debug!("{} reflected projectile {}", me.id, target.id);
}

// === Contact hooks ===

/// Physics contact hook for `me` touching `other`
pub fn on_body_contact(me: &mut Body, other: &mut Body, ctx: &mut FrameContext) {
    if !me.is_alive() {
        return;
    }
    match me.behavior {
        Behavior::Duplicator { .. } => duplicator_contact(me, other, ctx),
        Behavior::Projectile(_) => projectile_contact(me, other, ctx),
        _ => {}
    }
}

fn duplicator_contact(me: &mut Body, other: &mut Body, ctx: &mut FrameContext) {
    if me.inert
        || other.team == me.team
        || other.kind != BodyKind::Ball
        || !other.is_alive()
        || other.is_frozen()
    {
        return;
    }
    let Behavior::Duplicator { cooldown } = &mut me.behavior else {
        return;
    };
    if *cooldown > 0 {
        return;
    }
    *cooldown = DUPLICATE_COOLDOWN;
    other.damage(1, ctx.config.flash_ticks);

    if ctx.population(Population::Duplicators(me.team)) >= ctx.config.duplicate_cap {
        log::debug!("Team {} at duplicate cap, {} does not split", me.team, me.id);
        return;
    }
    let vel = ctx.random_velocity(SPAWN_SPEED);
    let mut child = Archetype::Duplicator.build(me.team, me.pos, vel, 0.0);
    child.hp = (me.hp + 1) / 2;
    child.inert = true;
    child.color = me.color;
    child.behavior = Behavior::Duplicator {
        cooldown: DUPLICATE_COOLDOWN,
    };
    ctx.spawn(child);
}

fn projectile_contact(me: &mut Body, other: &mut Body, ctx: &mut FrameContext) {
    let Behavior::Projectile(shot) = me.behavior else {
        return;
    };
    if other.team == me.team || !other.is_alive() {
        return;
    }
    other.damage(shot.damage, ctx.config.flash_ticks);
    if shot.slow > 0 {
        other.slow(shot.slow);
    }
    me.hp = 0;
    if let Some(owner) = me.owner {
        ctx.credit(Credit::ProjectileHit { owner });
    }
}

/// Wall contact hook: projectiles spend a ricochet or die
pub fn on_wall(me: &mut Body) {
    if let Behavior::Projectile(shot) = &mut me.behavior {
        if shot.ricochets == 0 {
            me.hp = 0;
        } else {
            shot.ricochets -= 1;
        }
    }
}

/// Apply a deferred credit to its owner
pub fn apply_credit(owner: &mut Body, credit: Credit) {
    match credit {
        Credit::ProjectileHit { .. } => {
            if let Behavior::MachineGun(gun) = &mut owner.behavior {
                gun.rounds += GUN_ROUNDS_PER_HIT;
            }
        }
    }
}

// === Behavior ticks ===

/// Once-per-frame behavior update
pub fn on_update(me: &mut Body, targets: &[Target], ctx: &mut FrameContext) {
    let s = me.time_scale(ctx.config.slow_factor);
    me.flash_ticks = me.flash_ticks.saturating_sub(1);

    match me.behavior {
        Behavior::Duplicator { .. } => tick_duplicator(me),
        Behavior::Lance(_) => tick_lance(me),
        Behavior::MachineGun(_) => tick_gun(me, s, ctx),
        Behavior::Turret(_) => tick_turret(me, s, targets, ctx),
        Behavior::Inanimate | Behavior::Projectile(_) => {}
    }

    me.slow_ticks = me.slow_ticks.saturating_sub(1);
}

fn tick_duplicator(me: &mut Body) {
    if let Behavior::Duplicator { cooldown } = &mut me.behavior {
        *cooldown = cooldown.saturating_sub(1);
    }
}

fn tick_lance(me: &mut Body) {
    let Behavior::Lance(lance) = &mut me.behavior else {
        return;
    };
    lance.since_hit = lance.since_hit.saturating_add(1);
    if !lance.is_live() && me.boost > 0.0 {
        me.vel = super::collision::strip_boost(me.vel, me.boost);
        me.boost = 0.0;
    }
}

fn tick_gun(me: &mut Body, s: f64, ctx: &mut FrameContext) {
    let Some((theta, dmg)) = me.weapons.first().map(|w| (w.theta, w.dmg)) else {
        return;
    };
    let Behavior::MachineGun(gun) = &mut me.behavior else {
        return;
    };

    // Lateness of each shot due this frame, for back-extrapolated spawns
    let mut shots = Vec::new();
    let rounds = gun.rounds;
    let next = match &mut gun.phase {
        GunPhase::Reloading { left } => {
            *left -= s;
            (*left <= 0.0).then(|| {
                let count = rounds.floor().max(1.0) as u32;
                GunPhase::Firing {
                    shots_left: count,
                    interval: GUN_BURST_TICKS / count as f64,
                    clock: 0.0,
                }
            })
        }
        GunPhase::Firing {
            shots_left,
            interval,
            clock,
        } => {
            *clock += s;
            while *shots_left > 0 && *clock >= *interval {
                *clock -= *interval;
                *shots_left -= 1;
                shots.push(*clock);
            }
            (*shots_left == 0).then_some(GunPhase::Reloading {
                left: GUN_RELOAD_TICKS,
            })
        }
    };
    if let Some(next) = next {
        gun.phase = next;
    }

    let shot = ProjectileState {
        damage: dmg.max(1),
        ricochets: BULLET_RICOCHETS,
        slow: 0,
        reflected: false,
    };
    for lateness in shots {
        fire_bullet(me, theta, BULLET_SPEED, shot, lateness, ctx);
    }
}

fn tick_turret(me: &mut Body, s: f64, targets: &[Target], ctx: &mut FrameContext) {
    let Behavior::Turret(turret) = &mut me.behavior else {
        return;
    };
    turret.fire_timer -= s;
    if turret.fire_timer > 0.0 {
        return;
    }
    turret.fire_timer += TURRET_FIRE_INTERVAL;

    let nearest = targets
        .iter()
        .filter(|t| t.combatant && t.team != me.team)
        .min_by(|a, b| {
            a.pos
                .distance_squared(me.pos)
                .total_cmp(&b.pos.distance_squared(me.pos))
        });
    let Some(target) = nearest else {
        return;
    };
    let aim = target.pos - me.pos;
    let theta = aim.y.atan2(aim.x);
    let shot = ProjectileState {
        damage: 1,
        ricochets: 0,
        slow: TURRET_SLOW,
        reflected: false,
    };
    fire_bullet(me, theta, TURRET_BULLET_SPEED, shot, 0.0, ctx);
}

/// Spawn a bullet just outside `shooter`, advanced by `lateness` ticks of travel
fn fire_bullet(
    shooter: &Body,
    theta: f64,
    speed: f64,
    shot: ProjectileState,
    lateness: f64,
    ctx: &mut FrameContext,
) {
    let dir = direction(theta);
    let muzzle = shooter.radius + BULLET_RADIUS + 1.0;
    let pos = polar_offset(shooter.pos, muzzle + speed * lateness, theta);
    let r = BULLET_RADIUS;
    if pos.x < r || pos.x > ctx.config.width - r || pos.y < r || pos.y > ctx.config.height - r {
        // Muzzle against a wall
        return;
    }

    let mut bullet = Body::new(BodyKind::Projectile, pos, dir * speed, r, 1);
    bullet.mass = 0.0;
    bullet.gravity = false;
    bullet.team = shooter.team;
    bullet.owner = Some(shooter.id);
    bullet.z_index = 1;
    bullet.color = shooter.color;
    bullet.behavior = Behavior::Projectile(shot);
    ctx.spawn(bullet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ArenaConfig;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn with_ctx<R>(bodies: &[Body], f: impl FnOnce(&mut FrameContext) -> R) -> R {
        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut next_id = 100;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, bodies);
        f(&mut ctx)
    }

    fn fighter(a: Archetype, id: BodyId, team: Team, x: f64) -> Body {
        let mut b = a.build(team, DVec2::new(x, 200.0), DVec2::ZERO, 0.0);
        b.id = id;
        b
    }

    #[test]
    fn test_catalog_numbers() {
        let dagger = Archetype::Dagger.build(1, DVec2::ZERO, DVec2::ZERO, 0.0);
        assert_eq!(dagger.radius, BALL_RADIUS);
        assert_eq!(dagger.hp, BALL_HP);
        assert_eq!(dagger.weapons[0].range, 20.0);
        assert_eq!(dagger.weapons[0].iframes, 0);

        let dup = Archetype::Duplicator.build(1, DVec2::ZERO, DVec2::ZERO, 0.0);
        assert_eq!(dup.radius, DUPLICATOR_RADIUS);
        assert_eq!(dup.hp, DUPLICATOR_HP);
        assert!(dup.flags.halved_hitstop);
        assert!(dup.weapons.is_empty());

        let gun = Archetype::MachineGun.build(1, DVec2::ZERO, DVec2::ZERO, 0.0);
        assert!(!gun.weapons[0].deals_hits());
        assert!(Archetype::Sword.build(1, DVec2::ZERO, DVec2::ZERO, 0.0).weapons[0].reflects_projectiles);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Machine-Gun".parse::<Archetype>(), Ok(Archetype::MachineGun));
        assert_eq!("gun".parse::<Archetype>(), Ok(Archetype::MachineGun));
        for a in Archetype::ALL {
            assert_eq!(a.to_string().parse::<Archetype>(), Ok(a));
        }
        assert!("spoon".parse::<Archetype>().is_err());
    }

    #[test]
    fn test_damage_hook_halves_hitstop_for_duplicators() {
        let mut sword = fighter(Archetype::Sword, 1, 1, 100.0);
        let mut dup = fighter(Archetype::Duplicator, 2, 2, 160.0);
        let mut w = sword.weapons.remove(0);
        with_ctx(&[], |ctx| {
            fire_hit_hooks(&mut w, &mut sword, &mut dup, DVec2::new(140.0, 200.0), ctx)
        });
        assert_eq!(dup.hp, DUPLICATOR_HP - 1);
        assert_eq!(dup.freeze_ticks, 10);
        assert_eq!(sword.freeze_ticks, 10);
        // Sword grows after the hit
        assert_eq!(w.dmg, 2);
    }

    #[test]
    fn test_spin_up_respects_retrigger_cooldown() {
        let mut hammer = fighter(Archetype::Hammer, 1, 1, 100.0);
        let mut foe = fighter(Archetype::Dagger, 2, 2, 160.0);
        let mut w = hammer.weapons.remove(0);
        let base = w.ang_vel;
        with_ctx(&[], |ctx| {
            fire_hit_hooks(&mut w, &mut hammer, &mut foe, DVec2::ZERO, ctx);
            fire_hit_hooks(&mut w, &mut hammer, &mut foe, DVec2::ZERO, ctx);
        });
        assert!((w.ang_vel - (base + 0.015)).abs() < 1e-12);
        assert_eq!(foe.hp, BALL_HP - 6);
    }

    #[test]
    fn test_lance_combo_is_triangular_and_resets_lazily() {
        let mut lance = fighter(Archetype::Lance, 1, 1, 100.0);
        lance.vel = DVec2::new(3.0, 0.0);
        let mut foe = fighter(Archetype::Sword, 2, 2, 160.0);
        let mut w = lance.weapons.remove(0);

        with_ctx(&[], |ctx| {
            for _ in 0..3 {
                fire_hit_hooks(&mut w, &mut lance, &mut foe, DVec2::ZERO, ctx);
            }
        });
        // 1 + 3 + 6
        assert_eq!(foe.hp, BALL_HP - 10);
        assert!((lance.boost - 3.0).abs() < 1e-12);
        assert!((lance.vel.x - 6.0).abs() < 1e-12);

        // Lapse the combo; boost bleeds off but the counter waits for the next hit
        with_ctx(&[], |ctx| {
            for _ in 0..=LANCE_LENIENCY {
                on_update(&mut lance, &[], ctx);
            }
        });
        assert_eq!(lance.boost, 0.0);
        assert!((lance.vel.x - 3.0).abs() < 1e-12);
        assert!(matches!(lance.behavior, Behavior::Lance(LanceState { combo: 3, .. })));

        let hp = foe.hp;
        with_ctx(&[], |ctx| fire_hit_hooks(&mut w, &mut lance, &mut foe, DVec2::ZERO, ctx));
        assert_eq!(foe.hp, hp - 1);
    }

    #[test]
    fn test_lance_boost_caps() {
        let mut lance = fighter(Archetype::Lance, 1, 1, 100.0);
        lance.vel = DVec2::new(0.0, 2.0);
        let mut foe = fighter(Archetype::Duplicator, 2, 2, 160.0);
        foe.hp = 10_000;
        let mut w = lance.weapons.remove(0);
        with_ctx(&[], |ctx| {
            for _ in 0..10 {
                fire_hit_hooks(&mut w, &mut lance, &mut foe, DVec2::ZERO, ctx);
            }
        });
        assert_eq!(lance.boost, LANCE_MAX_BOOST);
        assert!((lance.vel.y - (2.0 + LANCE_MAX_BOOST)).abs() < 1e-12);
    }

    #[test]
    fn test_parry_reverses_only_approaching_spin() {
        let mut a = fighter(Archetype::Dagger, 1, 1, 100.0);
        let mut b = fighter(Archetype::Dagger, 2, 2, 160.0);
        let (pa, pb) = (a.pos, b.pos);

        // Pointing up (−y), spinning clockwise in screen space toward +x
        let mut w = a.weapons.remove(0);
        w.theta = -std::f64::consts::FRAC_PI_2;
        w.ang_vel = 0.1;
        fire_parry_hooks(&mut w, &mut a, pa, &mut b, pb);
        assert_eq!(w.ang_vel, -0.1);
        assert!(w.flipped);
        assert_eq!(a.freeze_ticks, PARRY_FREEZE);
        assert_eq!(b.freeze_ticks, PARRY_FREEZE);

        // Now rotating away: no change
        a.freeze_ticks = 0;
        fire_parry_hooks(&mut w, &mut a, pa, &mut b, pb);
        assert_eq!(w.ang_vel, -0.1);
        assert_eq!(a.freeze_ticks, 0);
    }

    #[test]
    fn test_duplicator_contact_respects_cap_and_cooldown() {
        let mut dup = fighter(Archetype::Duplicator, 1, 1, 100.0);
        let mut foe = fighter(Archetype::Sword, 2, 2, 140.0);

        let spawned = with_ctx(&[dup.clone(), foe.clone()], |ctx| {
            on_body_contact(&mut dup, &mut foe, ctx);
            // Cooldown blocks an immediate repeat
            on_body_contact(&mut dup, &mut foe, ctx);
            ctx.population(Population::Duplicators(1))
        });
        assert_eq!(spawned, 2);
        assert_eq!(foe.hp, BALL_HP - 1);

        // At cap: damage and cooldown continue, no clone
        let mut config = ArenaConfig::default();
        config.duplicate_cap = 1;
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut dup = fighter(Archetype::Duplicator, 1, 1, 100.0);
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[dup.clone()]);
        on_body_contact(&mut dup, &mut foe, &mut ctx);
        let (spawns, _) = ctx.finish();
        assert!(spawns.is_empty());
        assert_eq!(foe.hp, BALL_HP - 2);
        assert!(matches!(dup.behavior, Behavior::Duplicator { cooldown: DUPLICATE_COOLDOWN }));
    }

    #[test]
    fn test_clone_gets_half_hp_rounded_up() {
        let mut dup = fighter(Archetype::Duplicator, 1, 1, 100.0);
        dup.hp = 7;
        let mut foe = fighter(Archetype::Dagger, 2, 2, 140.0);
        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        on_body_contact(&mut dup, &mut foe, &mut ctx);
        let (spawns, _) = ctx.finish();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].hp, 4);
        assert!(spawns[0].inert);
        assert_eq!(spawns[0].team, 1);
    }

    #[test]
    fn test_projectile_contact_damages_slows_and_credits() {
        let mut bullet = Body::new(BodyKind::Projectile, DVec2::ZERO, DVec2::X, 4.0, 1);
        bullet.team = 1;
        bullet.owner = Some(9);
        bullet.behavior = Behavior::Projectile(ProjectileState {
            damage: 2,
            ricochets: 0,
            slow: 30,
            reflected: false,
        });
        let mut foe = fighter(Archetype::Dagger, 2, 2, 20.0);

        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        on_body_contact(&mut bullet, &mut foe, &mut ctx);
        let (_, credits) = ctx.finish();

        assert_eq!(foe.hp, BALL_HP - 2);
        assert_eq!(foe.slow_ticks, 30);
        assert!(!bullet.is_alive());
        assert_eq!(credits, vec![Credit::ProjectileHit { owner: 9 }]);

        let mut gunner = fighter(Archetype::MachineGun, 9, 1, 0.0);
        apply_credit(&mut gunner, credits[0]);
        assert!(matches!(
            gunner.behavior,
            Behavior::MachineGun(GunState { rounds, .. }) if rounds == GUN_START_ROUNDS + GUN_ROUNDS_PER_HIT
        ));
    }

    #[test]
    fn test_ricochets_then_dies() {
        let mut bullet = Body::new(BodyKind::Projectile, DVec2::ZERO, DVec2::X, 4.0, 1);
        bullet.behavior = Behavior::Projectile(ProjectileState {
            damage: 1,
            ricochets: 1,
            slow: 0,
            reflected: false,
        });
        on_wall(&mut bullet);
        assert!(bullet.is_alive());
        on_wall(&mut bullet);
        assert!(!bullet.is_alive());
    }

    #[test]
    fn test_sword_reflects_instead_of_damaging() {
        let mut sword = fighter(Archetype::Sword, 1, 1, 100.0);
        let mut bullet = Body::new(
            BodyKind::Projectile,
            DVec2::new(150.0, 200.0),
            DVec2::new(-7.0, 0.0),
            4.0,
            1,
        );
        bullet.id = 5;
        bullet.team = 2;
        bullet.owner = Some(2);
        bullet.behavior = Behavior::Projectile(ProjectileState {
            damage: 1,
            ricochets: 1,
            slow: 0,
            reflected: false,
        });
        let mut w = sword.weapons.remove(0);
        with_ctx(&[], |ctx| {
            fire_hit_hooks(&mut w, &mut sword, &mut bullet, DVec2::new(150.0, 200.0), ctx)
        });
        assert!(bullet.is_alive());
        assert!((bullet.vel.x - 7.0).abs() < 1e-12);
        assert_eq!(bullet.team, 1);
        assert_eq!(bullet.owner, Some(1));
        // Bullets do not feed damage scaling or hit-stop
        assert_eq!(w.dmg, 1);
        assert_eq!(sword.freeze_ticks, 0);
    }

    #[test]
    fn test_gun_bursts_after_reload() {
        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut gun = fighter(Archetype::MachineGun, 1, 1, 200.0);
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        for _ in 0..(GUN_RELOAD_TICKS + GUN_BURST_TICKS) as u32 {
            on_update(&mut gun, &[], &mut ctx);
        }
        let (bullets, _) = ctx.finish();
        assert_eq!(bullets.len(), GUN_START_ROUNDS as usize);
        assert!(bullets.iter().all(|b| b.kind == BodyKind::Projectile && b.team == 1));
        assert!(bullets.iter().all(|b| (b.vel.length() - BULLET_SPEED).abs() < 1e-9));
        assert!(matches!(gun.behavior, Behavior::MachineGun(GunState { phase: GunPhase::Reloading { .. }, .. })));
    }

    #[test]
    fn test_turret_fires_at_nearest_enemy() {
        let mut turret = Body::new(BodyKind::Turret, DVec2::new(200.0, 200.0), DVec2::ZERO, TURRET_RADIUS, TURRET_HP);
        turret.id = 3;
        turret.team = 1;
        turret.behavior = Behavior::Turret(TurretState { fire_timer: 1.0 });
        let targets = [
            Target { id: 1, team: 1, pos: DVec2::new(250.0, 200.0), combatant: true },
            Target { id: 2, team: 2, pos: DVec2::new(200.0, 100.0), combatant: true },
            Target { id: 4, team: 2, pos: DVec2::new(200.0, 300.0), combatant: false },
            Target { id: 5, team: 2, pos: DVec2::new(200.0, 350.0), combatant: true },
        ];

        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        on_update(&mut turret, &targets, &mut ctx);
        let (bullets, _) = ctx.finish();
        assert_eq!(bullets.len(), 1);
        assert!(bullets[0].vel.y < 0.0);
        assert!((bullets[0].vel.length() - TURRET_BULLET_SPEED).abs() < 1e-9);
        assert!(matches!(bullets[0].behavior, Behavior::Projectile(ProjectileState { slow: TURRET_SLOW, .. })));
    }

    #[test]
    fn test_wrench_turret_cap() {
        let mut wrench = fighter(Archetype::Wrench, 1, 1, 100.0);
        let mut foe = fighter(Archetype::Dagger, 2, 2, 160.0);
        let mut w = wrench.weapons.remove(0);

        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        for _ in 0..5 {
            fire_hit_hooks(&mut w, &mut wrench, &mut foe, DVec2::new(130.0, 200.0), &mut ctx);
        }
        // Out of bounds contact never spawns
        fire_hit_hooks(&mut w, &mut wrench, &mut foe, DVec2::new(2.0, 200.0), &mut ctx);
        let (turrets, _) = ctx.finish();
        assert_eq!(turrets.len(), TURRET_CAP as usize);
        assert!(turrets.iter().all(|t| t.owner == Some(1) && t.flags.anchored && t.inert));
    }

    #[test]
    fn test_minion_inherits_from_target() {
        let mut grimoire = fighter(Archetype::Grimoire, 1, 1, 100.0);
        let mut foe = fighter(Archetype::Hammer, 2, 2, 160.0);
        foe.boost = 2.0;
        let mut w = grimoire.weapons.remove(0);

        let config = ArenaConfig::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 50;
        let mut ctx = FrameContext::new(&config, &mut rng, &mut next_id, &[]);
        fire_hit_hooks(&mut w, &mut grimoire, &mut foe, DVec2::new(130.0, 200.0), &mut ctx);
        let (minions, _) = ctx.finish();

        assert_eq!(minions.len(), 1);
        let m = &minions[0];
        assert_eq!(m.archetype, Some(Archetype::Hammer));
        assert_eq!(m.team, 1);
        assert_eq!(m.hp, MINION_HP);
        assert!((m.radius - BALL_RADIUS * MINION_SCALE).abs() < 1e-12);
        assert_eq!(m.weapons[0].dmg, 2);
        assert_eq!(m.boost, 1.0);
        assert!(m.flags.owner_bound && m.flags.combatant);
    }
}
