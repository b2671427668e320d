//! Arena configuration
//!
//! Every tunable the simulation reads at runtime. Defaults come from
//! [`crate::consts`]; a JSON file may override any subset of fields.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, ConfigResult};

/// Runtime arena and physics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    // === Arena ===
    pub width: f64,
    pub height: f64,

    // === Physics ===
    /// Downward acceleration applied to gravity-affected bodies
    pub gravity: f64,
    /// Restitution for ball-ball and wall collisions
    pub restitution: f64,
    /// Simulated time advanced per `update()`
    pub dt: f64,
    /// Resolved events per frame before the stepper gives up and free-flies
    pub max_events_per_frame: u32,

    // === Weapon sampling ===
    /// Max weapon rotation per substep (radians)
    pub angular_substep_budget: f64,
    /// Max travel per substep for linear-sweep weapons (px)
    pub linear_substep_budget: f64,

    // === Gameplay ===
    /// Live duplicators allowed per team
    pub duplicate_cap: u32,
    /// Time scale applied to slowed bodies
    pub slow_factor: f64,
    /// Damage flash duration (cosmetic)
    pub flash_ticks: u32,

    // === Match ===
    /// Ticks before a match is declared a draw
    pub max_ticks: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,

            gravity: GRAVITY,
            restitution: ELASTICITY,
            dt: SIM_DT,
            max_events_per_frame: MAX_EVENTS_PER_FRAME,

            angular_substep_budget: ANGULAR_SUBSTEP_BUDGET,
            linear_substep_budget: LINEAR_SUBSTEP_BUDGET,

            duplicate_cap: DUPLICATE_CAP,
            slow_factor: SLOW_FACTOR,
            flash_ticks: FLASH_TICKS,

            max_ticks: MAX_TICKS,
        }
    }
}

impl ArenaConfig {
    /// Zero-gravity variant (used by physics property checks)
    pub fn weightless() -> Self {
        Self {
            gravity: 0.0,
            ..Self::default()
        }
    }

    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&json).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        log::info!("Loaded arena config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the stepper cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("dt", self.dt)?;
        positive("angular_substep_budget", self.angular_substep_budget)?;
        positive("linear_substep_budget", self.linear_substep_budget)?;

        if !(self.gravity >= 0.0 && self.gravity.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "gravity",
                value: self.gravity,
                expected: "[0, ∞)",
            });
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Invalid {
                field: "restitution",
                value: self.restitution,
                expected: "[0, 1]",
            });
        }
        if !(self.slow_factor > 0.0 && self.slow_factor <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "slow_factor",
                value: self.slow_factor,
                expected: "(0, 1]",
            });
        }
        if self.max_ticks == 0 {
            return Err(ConfigError::Invalid {
                field: "max_ticks",
                value: 0.0,
                expected: "[1, ∞)",
            });
        }
        if self.max_events_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "max_events_per_frame",
                value: 0.0,
                expected: "[1, ∞)",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            expected: "(0, ∞)",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ArenaConfig::default().validate().is_ok());
        assert_eq!(ArenaConfig::default().width, ARENA_WIDTH);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ArenaConfig::from_json(r#"{ "gravity": 0.0, "max_ticks": 500 }"#).unwrap();
        assert_eq!(config.gravity, 0.0);
        assert_eq!(config.max_ticks, 500);
        assert_eq!(config.height, ARENA_HEIGHT);
        assert_eq!(config.duplicate_cap, DUPLICATE_CAP);
    }

    #[test]
    fn test_rejects_bad_restitution() {
        let err = ArenaConfig::from_json(r#"{ "restitution": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "restitution",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ArenaConfig::from_json("{ width: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ArenaConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
