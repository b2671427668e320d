//! Sprite placeholder cache
//!
//! Weapon images load asynchronously on the front-end. Until one arrives the
//! renderer draws untextured geometry for it. The simulation never reads this.

use std::collections::BTreeMap;

use crate::sim::Sprite;

/// Load state of one sprite
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpriteState {
    #[default]
    Placeholder,
    /// Loaded, with its natural size in pixels
    Ready { width: f32, height: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct SpriteCache {
    entries: BTreeMap<Sprite, SpriteState>,
}

impl SpriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sprite: Sprite) -> SpriteState {
        self.entries.get(&sprite).copied().unwrap_or_default()
    }

    pub fn is_ready(&self, sprite: Sprite) -> bool {
        matches!(self.get(sprite), SpriteState::Ready { .. })
    }

    /// Asset-loading callback: the image for `sprite` has arrived
    pub fn mark_ready(&mut self, sprite: Sprite, width: f32, height: f32) {
        log::debug!("Sprite '{}' ready ({}x{})", sprite.key(), width, height);
        self.entries.insert(sprite, SpriteState::Ready { width, height });
    }

    /// Sprites still waiting on their image
    pub fn pending(&self) -> impl Iterator<Item = Sprite> + '_ {
        Sprite::ALL.into_iter().filter(|&s| !self.is_ready(s))
    }
}
