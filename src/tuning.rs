//! Data-driven game balance
//!
//! Every tunable the simulation reads lives here. Sections default from
//! [`crate::consts`], so a JSON file only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::TuningError;

/// World and camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub width: f32,
    pub view_height: f32,
    /// Total scrollable depth; the camera stops following past this
    pub depth: f32,
    pub camera_min_y: f32,
    pub camera_lerp: f32,
    pub gravity: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            view_height: VIEW_HEIGHT,
            depth: WORLD_DEPTH,
            camera_min_y: CAMERA_MIN_Y,
            camera_lerp: CAMERA_LERP,
            gravity: GRAVITY,
        }
    }
}

/// Player body, movement and shooting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub size: f32,
    pub start_y: f32,
    pub max_velocity_x: f32,
    pub max_velocity_y: f32,
    pub move_speed: f32,
    pub bounce_force: f32,
    pub death_margin: f32,
    pub shoot_cooldown_ms: f64,
    pub shoot_recoil: f32,
    pub bullet_speed: f32,
    pub bullet_size: f32,
    pub bullet_lifetime_ms: f64,
    pub bullet_spawn_offset: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            size: PLAYER_SIZE,
            start_y: PLAYER_START_Y,
            max_velocity_x: PLAYER_MAX_VEL_X,
            max_velocity_y: PLAYER_MAX_VEL_Y,
            move_speed: PLAYER_MOVE_SPEED,
            bounce_force: PLAYER_BOUNCE_FORCE,
            death_margin: DEATH_MARGIN,
            shoot_cooldown_ms: SHOOT_COOLDOWN_MS,
            shoot_recoil: SHOOT_RECOIL,
            bullet_speed: BULLET_SPEED,
            bullet_size: BULLET_SIZE,
            bullet_lifetime_ms: BULLET_LIFETIME_MS,
            bullet_spawn_offset: BULLET_SPAWN_OFFSET,
        }
    }
}

/// Spawn column geometry and frontier pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub platform_width: f32,
    pub platform_height: f32,
    pub edge_margin: f32,
    pub ahead_margin: f32,
    pub max_spawns_per_tick: u32,
    pub initial_platforms: u32,
    pub one_way_tolerance: f32,
    pub enemy_size: f32,
    pub enemy_spawn_offset: f32,
    pub enemy_patrol_speed: f32,
    pub enemy_edge_inset: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            platform_width: PLATFORM_WIDTH,
            platform_height: PLATFORM_HEIGHT,
            edge_margin: SPAWN_EDGE_MARGIN,
            ahead_margin: SPAWN_AHEAD_MARGIN,
            max_spawns_per_tick: MAX_SPAWNS_PER_TICK,
            initial_platforms: INITIAL_PLATFORMS,
            one_way_tolerance: ONE_WAY_TOLERANCE,
            enemy_size: ENEMY_SIZE,
            enemy_spawn_offset: ENEMY_SPAWN_OFFSET,
            enemy_patrol_speed: ENEMY_PATROL_SPEED,
            enemy_edge_inset: ENEMY_EDGE_INSET,
        }
    }
}

/// Level-linear difficulty formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// World units per metre of distance traveled
    pub distance_unit: f32,
    pub distance_per_level: u32,
    pub base_spawn_interval: f32,
    pub spawn_interval_step: f32,
    pub min_spawn_interval: f32,
    pub base_enemy_chance: f32,
    pub enemy_chance_step: f32,
    pub max_enemy_chance: f32,
    pub base_breakable_chance: f32,
    pub breakable_chance_step: f32,
    pub max_breakable_chance: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            distance_unit: DISTANCE_UNIT,
            distance_per_level: DISTANCE_PER_LEVEL,
            base_spawn_interval: BASE_SPAWN_INTERVAL,
            spawn_interval_step: SPAWN_INTERVAL_STEP,
            min_spawn_interval: MIN_SPAWN_INTERVAL,
            base_enemy_chance: BASE_ENEMY_CHANCE,
            enemy_chance_step: ENEMY_CHANCE_STEP,
            max_enemy_chance: MAX_ENEMY_CHANCE,
            base_breakable_chance: BASE_BREAKABLE_CHANCE,
            breakable_chance_step: BREAKABLE_CHANCE_STEP,
            max_breakable_chance: MAX_BREAKABLE_CHANCE,
        }
    }
}

/// Bounce arbitration gates and the optional solid-landing resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceTuning {
    pub lock_ms: f64,
    pub min_fall_distance: f32,
    pub proximity_tolerance: f32,
    pub fall_velocity_threshold: f32,
    pub initial_last_bounce_y: f32,
    /// Wire the manual snap-to-top resolver into the tick
    pub manual_solid_landing: bool,
    pub landing_min_velocity: f32,
    pub landing_window: f32,
    pub landing_cooldown_ms: f64,
}

impl Default for BounceTuning {
    fn default() -> Self {
        Self {
            lock_ms: BOUNCE_LOCK_MS,
            min_fall_distance: MIN_FALL_DISTANCE,
            proximity_tolerance: PROXIMITY_TOLERANCE,
            fall_velocity_threshold: FALL_VELOCITY_THRESHOLD,
            initial_last_bounce_y: INITIAL_LAST_BOUNCE_Y,
            manual_solid_landing: false,
            landing_min_velocity: LANDING_MIN_VELOCITY,
            landing_window: LANDING_WINDOW,
            landing_cooldown_ms: LANDING_COOLDOWN_MS,
        }
    }
}

/// Off-screen pruning and hard caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleTuning {
    pub offscreen_margin: f32,
    pub max_platforms: usize,
    pub max_enemies: usize,
}

impl Default for LifecycleTuning {
    fn default() -> Self {
        Self {
            offscreen_margin: OFFSCREEN_MARGIN,
            max_platforms: MAX_PLATFORMS,
            max_enemies: MAX_ENEMIES,
        }
    }
}

/// Score awards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    pub breakable: u64,
    pub bullet_kill: u64,
    pub stomp: u64,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            breakable: SCORE_BREAKABLE,
            bullet_kill: SCORE_BULLET_KILL,
            stomp: SCORE_STOMP,
        }
    }
}

/// Full simulation tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub world: WorldTuning,
    pub player: PlayerTuning,
    pub spawn: SpawnTuning,
    pub difficulty: DifficultyTuning,
    pub bounce: BounceTuning,
    pub lifecycle: LifecycleTuning,
    pub score: ScoreTuning,
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for dumping the defaults)
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        let d = &self.difficulty;
        for (field, p) in [
            ("difficulty.base_enemy_chance", d.base_enemy_chance),
            ("difficulty.max_enemy_chance", d.max_enemy_chance),
            ("difficulty.base_breakable_chance", d.base_breakable_chance),
            ("difficulty.max_breakable_chance", d.max_breakable_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(field, format!("{p} is not a probability")));
            }
        }
        positive("difficulty.distance_unit", d.distance_unit)?;
        positive("difficulty.min_spawn_interval", d.min_spawn_interval)?;
        if d.base_spawn_interval < d.min_spawn_interval {
            return Err(invalid(
                "difficulty.base_spawn_interval",
                format!("{} is below the minimum {}", d.base_spawn_interval, d.min_spawn_interval),
            ));
        }
        if d.distance_per_level == 0 {
            return Err(invalid("difficulty.distance_per_level", "must be at least 1".into()));
        }

        positive("world.width", self.world.width)?;
        positive("world.view_height", self.world.view_height)?;
        positive("player.size", self.player.size)?;
        positive("spawn.platform_width", self.spawn.platform_width)?;
        positive("spawn.platform_height", self.spawn.platform_height)?;
        positive("spawn.enemy_size", self.spawn.enemy_size)?;
        if self.spawn.max_spawns_per_tick == 0 {
            return Err(invalid("spawn.max_spawns_per_tick", "must be at least 1".into()));
        }
        let max_x = self.world.width - self.spawn.platform_width - self.spawn.edge_margin;
        if max_x < self.spawn.edge_margin {
            return Err(invalid(
                "spawn.platform_width",
                format!("spawn column is empty (max x {max_x} < min x {})", self.spawn.edge_margin),
            ));
        }

        if self.lifecycle.max_platforms == 0 {
            return Err(invalid("lifecycle.max_platforms", "must be at least 1".into()));
        }
        if self.lifecycle.max_enemies == 0 {
            return Err(invalid("lifecycle.max_enemies", "must be at least 1".into()));
        }
        if self.bounce.proximity_tolerance < 0.0 {
            return Err(invalid("bounce.proximity_tolerance", "must not be negative".into()));
        }
        if self.bounce.lock_ms < 0.0 {
            return Err(invalid("bounce.lock_ms", "must not be negative".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> TuningError {
    TuningError::Invalid { field, reason }
}

fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be positive")))
    }
}
