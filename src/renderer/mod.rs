//! Rendering collaborator
//!
//! Turns a [`BallBattle`] into a flat triangle list. Whatever presents the
//! frame (canvas, GPU, image dump) only has to upload the vertices.

pub mod shapes;
pub mod sprites;
pub mod vertex;

pub use sprites::{SpriteCache, SpriteState};
pub use vertex::Vertex;

use glam::Vec2;

use crate::sim::{BallBattle, Body, BodyKind, Weapon};
use vertex::{colors, mix};

/// Triangle segments for a body's disc
const CIRCLE_SEGMENTS: u32 = 32;
const WALL_THICKNESS: f32 = 4.0;
/// Length of an untextured barrel for weapons without a collider
const BARREL_LENGTH: f32 = 12.0;

/// Longest wall-clock slice fed to the clock in one call (seconds)
pub const MAX_FRAME_SECONDS: f64 = 0.1;
/// Simulation ticks run per rendered frame at most
pub const MAX_TICKS_PER_FRAME: u32 = 8;

/// Fixed-step accumulator: decouples render rate from the simulation tick
#[derive(Debug, Clone)]
pub struct FrameClock {
    accumulator: f64,
    tick_seconds: f64,
}

impl FrameClock {
    pub fn new(ticks_per_second: f64) -> Self {
        Self {
            accumulator: 0.0,
            tick_seconds: 1.0 / ticks_per_second,
        }
    }

    /// Feed `elapsed` wall-clock seconds, running as many ticks as are due.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: f64, battle: &mut BallBattle) -> u32 {
        self.accumulator += elapsed.clamp(0.0, MAX_FRAME_SECONDS);
        let mut ticks = 0;
        while self.accumulator >= self.tick_seconds && ticks < MAX_TICKS_PER_FRAME {
            battle.update();
            self.accumulator -= self.tick_seconds;
            ticks += 1;
        }
        ticks
    }
}

fn team_color(team: u32) -> [f32; 4] {
    match team {
        1 => colors::TEAM_ONE,
        2 => colors::TEAM_TWO,
        _ => colors::TEAM_OTHER,
    }
}

/// Tessellate the whole arena
pub fn draw_battle(battle: &BallBattle, sprites: &SpriteCache, debug: bool) -> Vec<Vertex> {
    let config = battle.config();
    let size = Vec2::new(config.width as f32, config.height as f32);
    let mut vertices = shapes::rect(size * 0.5, size * 0.5, 0.0, colors::BACKGROUND);
    vertices.extend(shapes::frame(size.x, size.y, WALL_THICKNESS, colors::ARENA_WALL));

    // Inert bodies underneath, then by layer, then by id
    let mut order: Vec<&Body> = battle.bodies().iter().collect();
    order.sort_by_key(|b| (!b.inert, b.z_index, b.id));

    for body in order {
        for weapon in &body.weapons {
            vertices.extend(draw_weapon(body, weapon, sprites));
        }
        vertices.extend(draw_body(body, config.flash_ticks));
        if debug {
            vertices.extend(draw_hit_segments(body));
        }
    }
    vertices
}

fn draw_body(body: &Body, flash_ticks: u32) -> Vec<Vertex> {
    let center = body.pos.as_vec2();
    let r = body.radius as f32;

    let mut color = body.color;
    if body.flash_ticks > 0 && flash_ticks > 0 {
        color = mix(color, colors::FLASH, body.flash_ticks as f32 / flash_ticks as f32);
    }
    if body.inert {
        color[3] *= 0.5;
    }

    let mut vertices = shapes::circle(center, r + 1.5, colors::OUTLINE, CIRCLE_SEGMENTS);
    vertices.extend(shapes::circle(center, r, color, CIRCLE_SEGMENTS));

    if body.kind != BodyKind::Projectile && body.max_hp > 0 {
        let fraction = body.hp as f32 / body.max_hp as f32;
        vertices.extend(shapes::ring(
            center,
            r + 2.0,
            r + 4.0,
            -std::f32::consts::FRAC_PI_2,
            fraction,
            team_color(body.team),
            CIRCLE_SEGMENTS,
        ));
    }
    vertices
}

fn draw_weapon(body: &Body, weapon: &Weapon, sprites: &SpriteCache) -> Vec<Vertex> {
    let center = body.pos.as_vec2();
    let r = body.radius as f32;
    let theta = weapon.theta as f32;
    let dir = Vec2::new(theta.cos(), theta.sin());

    match sprites.get(weapon.sprite) {
        SpriteState::Ready { width, height } => {
            let scale = weapon.scale as f32;
            let (len, thick) = (width * scale, height * scale);
            let base = center + dir * (r + weapon.offset as f32);
            let mut color = mix(body.color, colors::FLASH, 0.5);
            if weapon.flipped {
                color = mix(color, colors::OUTLINE, 0.2);
            }
            shapes::rect(
                base + dir * (len * 0.5),
                Vec2::new(len * 0.5, thick * 0.5),
                theta + weapon.rotation as f32,
                color,
            )
        }
        SpriteState::Placeholder if weapon.range > 0.0 => {
            let seg = weapon.hit_segment(body.pos, body.radius);
            shapes::thick_line(
                seg.start.as_vec2(),
                seg.end.as_vec2(),
                (seg.thickness as f32).max(2.0),
                colors::WEAPON_PLACEHOLDER,
            )
        }
        SpriteState::Placeholder => {
            let base = center + dir * r;
            shapes::thick_line(base, base + dir * BARREL_LENGTH, 4.0, colors::WEAPON_PLACEHOLDER)
        }
    }
}

fn draw_hit_segments(body: &Body) -> Vec<Vertex> {
    body.weapons
        .iter()
        .filter(|w| w.range > 0.0)
        .flat_map(|w| {
            let seg = w.hit_segment(body.pos, body.radius);
            shapes::thick_line(
                seg.start.as_vec2(),
                seg.end.as_vec2(),
                seg.thickness as f32,
                colors::HIT_SEGMENT,
            )
        })
        .collect()
}
