//! Deterministic simulation module
//!
//! All arena logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod archetype;
pub mod collision;
pub mod context;
pub mod geometry;
pub mod physics;
pub mod solver;
pub mod state;
pub mod tick;
pub mod weapon;

pub use archetype::Archetype;
pub use collision::{reflect_velocity, resolve_bodies, resolve_wall};
pub use context::{Credit, FrameContext, Population};
pub use geometry::{Segment, circles_overlap, closest_point_on_segment, dist_to_segment};
pub use physics::{PhysicsReport, step_physics};
pub use solver::{Motion, Wall, WallHit, time_to_contact, time_to_wall};
pub use state::{Behavior, Body, BodyFlags, BodyId, BodyKind, Team};
pub use tick::{BallBattle, FrameStats};
pub use weapon::{HitHook, ParryHook, Sprite, UpdateHook, Weapon};
