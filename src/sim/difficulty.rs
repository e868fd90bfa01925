//! Distance-driven difficulty scaling
//!
//! Distance is measured in metres below the start height and never goes
//! back down. Every `distance_per_level` metres raises the level by one, and
//! spawn parameters are recomputed only when the level rises.

use serde::{Deserialize, Serialize};

use crate::tuning::DifficultyTuning;

/// Spawn parameters derived from the current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnParams {
    pub enemy_spawn_chance: f32,
    pub breakable_platform_chance: f32,
    pub spawn_interval: f32,
}

impl SpawnParams {
    /// Clamped level-linear formulas
    pub fn for_level(cfg: &DifficultyTuning, level: u32) -> Self {
        let level = level as f32;
        Self {
            enemy_spawn_chance: (cfg.base_enemy_chance + level * cfg.enemy_chance_step)
                .min(cfg.max_enemy_chance),
            breakable_platform_chance: (cfg.base_breakable_chance
                + level * cfg.breakable_chance_step)
                .min(cfg.max_breakable_chance),
            spawn_interval: (cfg.base_spawn_interval - level * cfg.spawn_interval_step)
                .max(cfg.min_spawn_interval),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Difficulty {
    cfg: DifficultyTuning,
    origin_y: f32,
    distance: u32,
    level: u32,
    params: SpawnParams,
}

impl Difficulty {
    pub fn new(cfg: DifficultyTuning, origin_y: f32) -> Self {
        let params = SpawnParams::for_level(&cfg, 0);
        Self {
            cfg,
            origin_y,
            distance: 0,
            level: 0,
            params,
        }
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn params(&self) -> SpawnParams {
        self.params
    }

    /// Whole metres below the origin (negative heights count as zero)
    pub fn distance_at(&self, player_y: f32) -> u32 {
        let metres = ((player_y - self.origin_y) / self.cfg.distance_unit).floor();
        if metres > 0.0 { metres as u32 } else { 0 }
    }

    pub fn level_for(&self, distance: u32) -> u32 {
        distance / self.cfg.distance_per_level
    }

    /// Fold in the player's height. Returns the new distance if it grew.
    pub fn observe(&mut self, player_y: f32) -> Option<u32> {
        let distance = self.distance_at(player_y);
        if distance <= self.distance {
            return None;
        }
        self.distance = distance;
        Some(distance)
    }

    /// Recompute spawn parameters if `distance` reached a higher level.
    /// Returns the new level when it changed.
    pub fn recompute(&mut self, distance: u32) -> Option<u32> {
        let level = self.level_for(distance);
        if level <= self.level {
            return None;
        }
        self.level = level;
        self.params = SpawnParams::for_level(&self.cfg, level);
        log::info!(
            "Difficulty {}: enemy {:.2}, breakable {:.2}, interval {}",
            level,
            self.params.enemy_spawn_chance,
            self.params.breakable_platform_chance,
            self.params.spawn_interval
        );
        Some(level)
    }
}
