//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// Simple 2D vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }
}

/// Mix `color` toward `target` by `t` in [0, 1]
pub fn mix(color: [f32; 4], target: [f32; 4], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    std::array::from_fn(|i| color[i] + (target[i] - color[i]) * t)
}

/// Colors for arena elements
pub mod colors {
    pub const ARENA_WALL: [f32; 4] = [0.3, 0.3, 0.4, 1.0];
    pub const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
    pub const OUTLINE: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
    pub const FLASH: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    /// Untextured weapon while its sprite loads
    pub const WEAPON_PLACEHOLDER: [f32; 4] = [0.75, 0.75, 0.8, 1.0];
    pub const HIT_SEGMENT: [f32; 4] = [1.0, 0.1, 0.1, 0.4];
    pub const TEAM_ONE: [f32; 4] = [0.95, 0.35, 0.3, 1.0];
    pub const TEAM_TWO: [f32; 4] = [0.3, 0.55, 0.95, 1.0];
    pub const TEAM_OTHER: [f32; 4] = [0.8, 0.8, 0.8, 1.0];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_endpoints() {
        let c = [0.0, 0.5, 1.0, 1.0];
        assert_eq!(mix(c, colors::FLASH, 0.0), c);
        assert_eq!(mix(c, colors::FLASH, 1.0), colors::FLASH);
        assert_eq!(mix(c, colors::FLASH, 7.0), colors::FLASH);
    }
}
