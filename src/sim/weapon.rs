//! Weapons: rotating capsule colliders attached to a ball
//!
//! A weapon is plain data plus typed hook lists. Per-frame motion comes from
//! its [`UpdateHook`]s; what happens on contact is decided by the hook
//! dispatch in [`super::archetype`].

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::Segment;
use super::state::BodyId;
use crate::consts::EPS;
use crate::{direction, normalize_angle};

/// Sprite a weapon (or bullet) is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sprite {
    Dagger,
    Sword,
    Hammer,
    Lance,
    Gun,
    Wrench,
    Grimoire,
}

impl Sprite {
    pub const ALL: [Sprite; 7] = [
        Sprite::Dagger,
        Sprite::Sword,
        Sprite::Hammer,
        Sprite::Lance,
        Sprite::Gun,
        Sprite::Wrench,
        Sprite::Grimoire,
    ];

    /// Asset key the front-end loads the image under
    pub fn key(self) -> &'static str {
        match self {
            Sprite::Dagger => "dagger",
            Sprite::Sword => "sword",
            Sprite::Hammer => "hammer",
            Sprite::Lance => "lance",
            Sprite::Gun => "gun",
            Sprite::Wrench => "wrench",
            Sprite::Grimoire => "grimoire",
        }
    }
}

/// Per-frame motion of a weapon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateHook {
    /// `theta += ang_vel · dt`
    Spin,
    /// Point along the holder's velocity
    AlignToVelocity,
}

/// Effects run when the weapon's hit segment first touches a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitHook {
    /// Deal `dmg` and apply hit-stop to both parties
    Damage { freeze: u32 },
    /// Raise spin speed, at most once per target per `retrigger` ticks
    SpinUp { step: f64, retrigger: u32 },
    /// Raise damage, at most once per target per `retrigger` ticks
    DamageUp { step: i32, retrigger: u32 },
    /// Combo-scaled thrust damage with a speed boost
    LanceCombo,
    /// Drop a turret at the contact point
    SpawnTurret,
    /// Summon a copy of the target's archetype for the holder's team
    SummonMinion,
    /// Send enemy projectiles back and take them over
    Reflect,
}

/// Effects run when two weapons clash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParryHook {
    /// Reverse spin if rotating toward the other ball, freezing both balls
    Reverse { freeze: u32 },
}

/// A weapon attached to a ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub sprite: Sprite,
    /// Orientation (radians)
    pub theta: f64,
    /// Angular velocity (radians/tick)
    pub ang_vel: f64,

    // === Collider ===
    /// Distance from the ball surface to the tip; 0 means no collider
    pub range: f64,
    pub thickness: f64,
    /// Distance from the ball surface to the base of the hit segment
    pub base_offset: f64,

    // === Damage ===
    pub dmg: i32,
    /// Ticks a target stays immune after being hit
    pub iframes: u32,
    /// Iframes tick down even while the target stays in contact
    pub dot: bool,
    /// Turns enemy projectiles around instead of damaging them
    pub reflects_projectiles: bool,
    /// Sample contacts by holder travel as well as rotation
    pub linear_sweep: bool,

    // === Drawing ===
    pub scale: f64,
    /// Sprite offset from the ball surface along the weapon axis
    pub offset: f64,
    /// Extra sprite rotation (radians)
    pub rotation: f64,
    pub flipped: bool,

    pub update_hooks: Vec<UpdateHook>,
    pub hit_hooks: Vec<HitHook>,
    pub parry_hooks: Vec<ParryHook>,

    /// Targets currently immune, with remaining ticks
    #[serde(default)]
    pub colliding_with: BTreeMap<BodyId, u32>,
    /// Per-target cooldowns for scaling hooks
    #[serde(default)]
    pub retrigger: BTreeMap<BodyId, u32>,
    /// Targets touched during the current frame
    #[serde(skip)]
    pub contacts: BTreeSet<BodyId>,
}

impl Weapon {
    pub fn new(theta: f64, sprite: Sprite) -> Self {
        Self {
            sprite,
            theta,
            ang_vel: 0.0,
            range: 0.0,
            thickness: 0.0,
            base_offset: 0.0,
            dmg: 0,
            iframes: 0,
            dot: false,
            reflects_projectiles: false,
            linear_sweep: false,
            scale: 1.0,
            offset: 0.0,
            rotation: 0.0,
            flipped: false,
            update_hooks: Vec::new(),
            hit_hooks: Vec::new(),
            parry_hooks: Vec::new(),
            colliding_with: BTreeMap::new(),
            retrigger: BTreeMap::new(),
            contacts: BTreeSet::new(),
        }
    }

    pub fn draw(mut self, scale: f64, offset: f64, rotation: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self.rotation = rotation;
        self
    }

    pub fn collider(mut self, range: f64, thickness: f64) -> Self {
        self.range = range;
        self.thickness = thickness;
        self
    }

    pub fn spin(mut self, ang_vel: f64) -> Self {
        self.ang_vel = ang_vel;
        self.update_hooks.push(UpdateHook::Spin);
        self
    }

    pub fn align_to_velocity(mut self) -> Self {
        self.update_hooks.push(UpdateHook::AlignToVelocity);
        self
    }

    pub fn parry(mut self, freeze: u32) -> Self {
        self.parry_hooks.push(ParryHook::Reverse { freeze });
        self
    }

    /// Damage on hit with `iframes` of immunity and `freeze` ticks of hit-stop
    pub fn damage(mut self, dmg: i32, iframes: u32, freeze: u32) -> Self {
        self.dmg = dmg;
        self.iframes = iframes;
        self.hit_hooks.push(HitHook::Damage { freeze });
        self
    }

    pub fn on_hit(mut self, hook: HitHook) -> Self {
        self.hit_hooks.push(hook);
        self
    }

    /// Uniformly resize the weapon (collider and sprite)
    pub fn scaled(mut self, factor: f64) -> Self {
        self.range *= factor;
        self.thickness *= factor;
        self.base_offset *= factor;
        self.scale *= factor;
        self.offset *= factor;
        self
    }

    /// Has a collider that can strike bodies
    pub fn deals_hits(&self) -> bool {
        self.range > 0.0 && !self.hit_hooks.is_empty()
    }

    /// Has a collider that can clash with other weapons
    pub fn parries(&self) -> bool {
        self.range > 0.0 && !self.parry_hooks.is_empty()
    }

    /// World-space hit segment for a holder centered at `anchor`
    pub fn hit_segment(&self, anchor: DVec2, holder_radius: f64) -> Segment {
        let dir = direction(self.theta);
        Segment::new(
            anchor + dir * (holder_radius + self.base_offset),
            anchor + dir * (holder_radius + self.range),
            self.thickness,
        )
    }

    /// Run update hooks for `dt` of weapon time
    pub fn update(&mut self, holder_vel: DVec2, dt: f64) {
        for i in 0..self.update_hooks.len() {
            match self.update_hooks[i] {
                UpdateHook::Spin => {
                    self.theta = normalize_angle(self.theta + self.ang_vel * dt);
                }
                UpdateHook::AlignToVelocity => {
                    if holder_vel.length_squared() > EPS {
                        self.theta = holder_vel.y.atan2(holder_vel.x);
                    }
                }
            }
        }
    }

    /// Gate a scaling hook: true at most once per target per `cooldown` ticks
    pub fn retrigger_ready(&mut self, target: BodyId, cooldown: u32) -> bool {
        if cooldown == 0 {
            return true;
        }
        if self.retrigger.contains_key(&target) {
            return false;
        }
        self.retrigger.insert(target, cooldown);
        true
    }

    /// End-of-frame iframe bookkeeping.
    ///
    /// Targets touched this frame keep their countdown (unless the weapon is
    /// damage-over-time); everyone else ticks down and expires at zero.
    pub fn tick_iframes(&mut self) {
        let contacts = std::mem::take(&mut self.contacts);
        let dot = self.dot;
        self.colliding_with.retain(|id, left| {
            if !dot && contacts.contains(id) {
                return true;
            }
            *left = left.saturating_sub(1);
            *left > 0
        });
        self.retrigger.retain(|_, left| {
            *left = left.saturating_sub(1);
            *left > 0
        });
    }

    /// Drop bookkeeping for bodies that no longer exist
    pub fn forget(&mut self, id: BodyId) {
        self.colliding_with.remove(&id);
        self.retrigger.remove(&id);
        self.contacts.remove(&id);
    }
}
