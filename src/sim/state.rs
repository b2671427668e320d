//! Arena entities and core simulation types
//!
//! Everything the stepper reads or writes about a body lives on [`Body`].
//! Type-specific behavior is data ([`Behavior`], [`BodyFlags`]), never a
//! type check.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::archetype::{Archetype, GunState, LanceState, ProjectileState, TurretState};
use super::solver::Motion;
use super::weapon::Weapon;
use crate::consts::EPS;

pub type BodyId = u32;
pub type Team = u32;

/// Broad category of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// A fighter (including clones and minions)
    Ball,
    /// Bullets
    Projectile,
    /// Anchored emplacements
    Turret,
}

/// Capability flags consulted by the physics and combat layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyFlags {
    /// Takes part in the impulse response
    pub bounces: bool,
    /// Never moves; always in the frozen partition
    pub anchored: bool,
    /// Passes through bodies of its own team
    pub phases_through_team: bool,
    /// Receives half the hit-stop from weapon damage
    pub halved_hitstop: bool,
    /// Counts toward its team's alive total
    pub combatant: bool,
    /// Dies when its owner dies
    pub owner_bound: bool,
}

impl BodyFlags {
    pub fn for_kind(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Ball => Self {
                bounces: true,
                combatant: true,
                ..Self::default()
            },
            BodyKind::Projectile => Self {
                phases_through_team: true,
                ..Self::default()
            },
            BodyKind::Turret => Self {
                bounces: true,
                anchored: true,
                phases_through_team: true,
                owner_bound: true,
                ..Self::default()
            },
        }
    }
}

/// Archetype-specific state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    Inanimate,
    Duplicator { cooldown: u32 },
    Lance(LanceState),
    MachineGun(GunState),
    Turret(TurretState),
    Projectile(ProjectileState),
}

/// A circular body in the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub archetype: Option<Archetype>,
    pub team: Team,
    pub owner: Option<BodyId>,

    pub pos: DVec2,
    pub vel: DVec2,
    /// Position at the start of the current frame
    #[serde(skip)]
    pub prev_pos: DVec2,
    pub radius: f64,
    /// Zero means massless (always yields in an impulse exchange)
    pub mass: f64,
    pub gravity: bool,

    pub hp: i32,
    pub max_hp: i32,
    /// Hit-stop: no motion, weapon rotation or weapon contacts
    pub freeze_ticks: u32,
    /// Time runs at `slow_factor` for this body
    pub slow_ticks: u32,
    /// Cosmetic damage flash
    pub flash_ticks: u32,
    /// Ignored by ball collisions and weapon sweeps until clear of overlap
    pub inert: bool,
    /// Speed added on top of the natural velocity
    pub boost: f64,

    pub flags: BodyFlags,
    pub z_index: i32,
    pub color: [f32; 4],

    pub weapons: Vec<Weapon>,
    pub behavior: Behavior,
}

impl Body {
    pub fn new(kind: BodyKind, pos: DVec2, vel: DVec2, radius: f64, hp: i32) -> Self {
        Self {
            id: 0,
            kind,
            archetype: None,
            team: 0,
            owner: None,
            pos,
            vel,
            prev_pos: pos,
            radius,
            mass: radius * radius,
            gravity: kind == BodyKind::Ball,
            hp,
            max_hp: hp,
            freeze_ticks: 0,
            slow_ticks: 0,
            flash_ticks: 0,
            inert: false,
            boost: 0.0,
            flags: BodyFlags::for_kind(kind),
            z_index: 0,
            color: [1.0, 1.0, 1.0, 1.0],
            weapons: Vec::new(),
            behavior: Behavior::Inanimate,
        }
    }

    /// Plain ball with no weapons
    pub fn ball(pos: DVec2, vel: DVec2, radius: f64, hp: i32) -> Self {
        Self::new(BodyKind::Ball, pos, vel, radius, hp)
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = team;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// In the frozen partition this frame (hit-stop or anchored)
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.freeze_ticks > 0 || self.flags.anchored
    }

    #[inline]
    pub fn is_slowed(&self) -> bool {
        self.slow_ticks > 0
    }

    /// Local time scale: `slow_factor` while slowed, otherwise 1
    pub fn time_scale(&self, slow_factor: f64) -> f64 {
        if self.is_slowed() { slow_factor } else { 1.0 }
    }

    /// Combat-relevant team member
    pub fn is_combatant(&self) -> bool {
        self.flags.combatant && self.is_alive()
    }

    /// Deal damage, clamping hp at zero
    pub fn damage(&mut self, amount: i32, flash_ticks: u32) {
        if amount <= 0 || !self.is_alive() {
            return;
        }
        self.hp = (self.hp - amount).max(0);
        self.flash_ticks = flash_ticks;
    }

    pub fn freeze(&mut self, ticks: u32) {
        self.freeze_ticks = self.freeze_ticks.max(ticks);
    }

    pub fn slow(&mut self, ticks: u32) {
        self.slow_ticks = self.slow_ticks.max(ticks);
    }

    /// Kinematics for the collision solver; frozen bodies are stationary
    pub fn motion(&self, frozen: bool, time_scale: f64, gravity: f64) -> Motion {
        if frozen {
            return Motion::stationary(self.pos, self.radius);
        }
        let g = if self.gravity { gravity } else { 0.0 };
        Motion {
            pos: self.pos,
            vel: self.vel * time_scale,
            accel: DVec2::new(0.0, g * time_scale * time_scale),
            radius: self.radius,
        }
    }

    /// Free flight for `t`, in local time scaled by `time_scale`
    pub fn advance(&mut self, t: f64, time_scale: f64, gravity: f64) {
        let g = if self.gravity { gravity } else { 0.0 };
        let s = time_scale;
        self.pos.x += s * self.vel.x * t;
        self.pos.y += s * self.vel.y * t + 0.5 * s * s * g * t * t;
        self.vel.y += s * g * t;
    }

    /// Position along this frame's path, `frac` in [0, 1]
    pub fn anchor(&self, frac: f64) -> DVec2 {
        self.prev_pos.lerp(self.pos, frac)
    }

    /// Inverse mass for impulse sharing: 0 when frozen, ∞ when massless
    pub fn inverse_mass(&self, frozen: bool) -> f64 {
        if frozen {
            0.0
        } else if self.mass <= EPS {
            f64::INFINITY
        } else {
            1.0 / self.mass
        }
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.vel.length_squared()
    }

    /// Potential energy measured from the floor of an arena of `height`
    pub fn potential_energy(&self, gravity: f64, height: f64) -> f64 {
        if !self.gravity {
            return 0.0;
        }
        self.mass * gravity * (height - self.radius - self.pos.y)
    }

    /// Fully inside `[r, w − r] × [r, h − r]` within `tolerance`
    pub fn in_bounds(&self, width: f64, height: f64, tolerance: f64) -> bool {
        let r = self.radius - tolerance;
        self.pos.x >= r
            && self.pos.x <= width - r
            && self.pos.y >= r
            && self.pos.y <= height - r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_and_flashes() {
        let mut b = Body::ball(DVec2::ZERO, DVec2::ZERO, 10.0, 3);
        b.damage(5, 20);
        assert_eq!(b.hp, 0);
        assert_eq!(b.flash_ticks, 20);
        assert!(!b.is_alive());

        // Dead bodies stay at zero
        b.flash_ticks = 0;
        b.damage(1, 20);
        assert_eq!(b.hp, 0);
        assert_eq!(b.flash_ticks, 0);
    }

    #[test]
    fn test_advance_matches_closed_form() {
        let mut b = Body::ball(DVec2::new(0.0, 0.0), DVec2::new(2.0, -1.0), 5.0, 1);
        b.advance(0.4, 1.0, 0.1);
        b.advance(0.6, 1.0, 0.1);
        assert!((b.pos.x - 2.0).abs() < 1e-12);
        assert!((b.pos.y - (-1.0 + 0.05)).abs() < 1e-12);
        assert!((b.vel.y - (-0.9)).abs() < 1e-12);
    }

    #[test]
    fn test_slowed_advance_scales_time() {
        let mut b = Body::ball(DVec2::ZERO, DVec2::new(4.0, 0.0), 5.0, 1);
        b.slow(10);
        let s = b.time_scale(0.5);
        b.advance(1.0, s, 0.1);
        assert!((b.pos.x - 2.0).abs() < 1e-12);
        assert!((b.pos.y - 0.0125).abs() < 1e-12);
        assert!((b.vel.y - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_mass_cases() {
        let mut b = Body::ball(DVec2::ZERO, DVec2::ZERO, 2.0, 1);
        assert_eq!(b.inverse_mass(false), 0.25);
        assert_eq!(b.inverse_mass(true), 0.0);
        b.mass = 0.0;
        assert!(b.inverse_mass(false).is_infinite());
    }

    #[test]
    fn test_kind_flags() {
        let turret = BodyFlags::for_kind(BodyKind::Turret);
        assert!(turret.anchored && turret.owner_bound && !turret.combatant);
        let bullet = BodyFlags::for_kind(BodyKind::Projectile);
        assert!(!bullet.bounces && bullet.phases_through_team);
        assert!(BodyFlags::for_kind(BodyKind::Ball).combatant);
    }
}
