//! Ball Arena - continuous-time arena combat simulator
//!
//! Core modules:
//! - `sim`: Deterministic simulation (exact-time collisions, weapons, archetypes)
//! - `renderer`: CPU draw list for whatever presents the frame
//! - `settings`: Runtime-tunable arena configuration
//! - `tournament`: Batch match runner and win/loss tallies

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tournament;

pub use error::{ConfigError, ConfigResult};
pub use settings::ArenaConfig;

use glam::DVec2;

/// Simulation defaults. `ArenaConfig::default()` mirrors these.
pub mod consts {
    /// Fixed simulation timestep (one simulated unit per frame)
    pub const SIM_DT: f64 = 1.0;
    /// Numerical epsilon for event times and divisions
    pub const EPS: f64 = 1e-9;

    /// Arena dimensions
    pub const ARENA_WIDTH: f64 = 400.0;
    pub const ARENA_HEIGHT: f64 = 400.0;

    /// Downward acceleration (px/tick²)
    pub const GRAVITY: f64 = 0.1;
    /// Restitution for ball-ball and wall collisions (1.0 = perfectly elastic)
    pub const ELASTICITY: f64 = 1.0;

    /// Match length cap before a draw is declared
    pub const MAX_TICKS: u64 = 10_000;

    /// Max weapon rotation per substep (radians)
    pub const ANGULAR_SUBSTEP_BUDGET: f64 = 0.1;
    /// Max travel per substep for linear-sweep weapons (px)
    pub const LINEAR_SUBSTEP_BUDGET: f64 = 4.0;

    /// Live duplicators allowed per team
    pub const DUPLICATE_CAP: u32 = 8;
    /// Time scale applied to slowed bodies
    pub const SLOW_FACTOR: f64 = 0.5;
    /// Damage flash duration
    pub const FLASH_TICKS: u32 = 20;
    /// Events resolved per frame before falling back to free flight
    pub const MAX_EVENTS_PER_FRAME: u32 = 4096;

    /// Launch speed for spawned balls
    pub const SPAWN_SPEED: f64 = 5.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    while angle >= PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

/// Unit vector for an angle
#[inline]
pub fn direction(theta: f64) -> DVec2 {
    DVec2::new(theta.cos(), theta.sin())
}

/// Convert polar (r, theta) around `center` to cartesian
#[inline]
pub fn polar_offset(center: DVec2, r: f64, theta: f64) -> DVec2 {
    center + direction(theta) * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(normalize_angle(0.25), 0.25);
    }

    #[test]
    fn test_polar_offset() {
        let p = polar_offset(DVec2::new(10.0, 10.0), 5.0, PI / 2.0);
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.y - 15.0).abs() < 1e-12);
    }
}
