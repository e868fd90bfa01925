//! Descent - endless vertical-descent platformer simulation
//!
//! Core modules:
//! - `sim`: Simulation (spawn frontier, difficulty, bounce arbitration, eviction)
//! - `tuning`: Data-driven game balance
//! - `error`: Simulation and configuration error types
//!
//! World coordinates follow screen convention: +y points down, so the player
//! "falls" toward increasing y and the spawn frontier grows downward.

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{SimError, TuningError};
pub use tuning::Tuning;

/// Game configuration constants (defaults for [`Tuning`])
pub mod consts {
    /// Fixed simulation timestep (120 Hz). Terminal fall speed per tick stays
    /// inside the bounce proximity window.
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World dimensions
    pub const WORLD_WIDTH: f32 = 300.0;
    pub const VIEW_HEIGHT: f32 = 800.0;
    pub const WORLD_DEPTH: f32 = 100_000.0;
    /// Camera can scroll this far above the world origin
    pub const CAMERA_MIN_Y: f32 = -1000.0;
    pub const CAMERA_LERP: f32 = 0.1;
    /// Gravity (pixels/s², +y is down)
    pub const GRAVITY: f32 = 1000.0;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 24.0;
    pub const PLAYER_START_Y: f32 = 100.0;
    pub const PLAYER_MAX_VEL_X: f32 = 300.0;
    pub const PLAYER_MAX_VEL_Y: f32 = 1000.0;
    pub const PLAYER_MOVE_SPEED: f32 = 200.0;
    pub const PLAYER_BOUNCE_FORCE: f32 = -450.0;
    /// Player is dead once this far below the bottom of the view
    pub const DEATH_MARGIN: f32 = 100.0;

    /// Shooting
    pub const SHOOT_COOLDOWN_MS: f64 = 200.0;
    pub const BULLET_SPEED: f32 = 400.0;
    pub const BULLET_SIZE: f32 = 8.0;
    pub const BULLET_LIFETIME_MS: f64 = 2000.0;
    pub const BULLET_SPAWN_OFFSET: f32 = 12.0;
    pub const SHOOT_RECOIL: f32 = 50.0;

    /// Platform geometry
    pub const PLATFORM_WIDTH: f32 = 80.0;
    pub const PLATFORM_HEIGHT: f32 = 16.0;
    /// Horizontal inset of the spawn column from each world edge
    pub const SPAWN_EDGE_MARGIN: f32 = 20.0;
    /// Frontier must stay this far below the player
    pub const SPAWN_AHEAD_MARGIN: f32 = 300.0;
    pub const MAX_SPAWNS_PER_TICK: u32 = 10;
    pub const INITIAL_PLATFORMS: u32 = 20;
    /// One-way contact accepts a lower edge up to this far past the platform top
    pub const ONE_WAY_TOLERANCE: f32 = 20.0;

    /// Enemy geometry
    pub const ENEMY_SIZE: f32 = 24.0;
    /// Enemy centre sits this far above its platform centre
    pub const ENEMY_SPAWN_OFFSET: f32 = 24.0;
    pub const ENEMY_PATROL_SPEED: f32 = 60.0;
    pub const ENEMY_EDGE_INSET: f32 = 5.0;

    /// Difficulty formulas
    pub const DISTANCE_UNIT: f32 = 100.0;
    pub const DISTANCE_PER_LEVEL: u32 = 10;
    pub const BASE_SPAWN_INTERVAL: f32 = 150.0;
    pub const SPAWN_INTERVAL_STEP: f32 = 3.0;
    pub const MIN_SPAWN_INTERVAL: f32 = 110.0;
    pub const BASE_ENEMY_CHANCE: f32 = 0.25;
    pub const ENEMY_CHANCE_STEP: f32 = 0.04;
    pub const MAX_ENEMY_CHANCE: f32 = 0.60;
    pub const BASE_BREAKABLE_CHANCE: f32 = 0.35;
    pub const BREAKABLE_CHANCE_STEP: f32 = 0.04;
    pub const MAX_BREAKABLE_CHANCE: f32 = 0.70;

    /// Bounce arbitration
    pub const BOUNCE_LOCK_MS: f64 = 600.0;
    pub const MIN_FALL_DISTANCE: f32 = 80.0;
    pub const PROXIMITY_TOLERANCE: f32 = 12.0;
    pub const FALL_VELOCITY_THRESHOLD: f32 = 100.0;
    /// Sentinel "last bounce" height for a fresh run
    pub const INITIAL_LAST_BOUNCE_Y: f32 = -1000.0;

    /// Manual solid-landing resolver (off by default)
    pub const LANDING_MIN_VELOCITY: f32 = 50.0;
    pub const LANDING_WINDOW: f32 = 15.0;
    pub const LANDING_COOLDOWN_MS: f64 = 300.0;

    /// Lifecycle caps
    pub const OFFSCREEN_MARGIN: f32 = 200.0;
    pub const MAX_PLATFORMS: usize = 30;
    pub const MAX_ENEMIES: usize = 15;

    /// Score awards
    pub const SCORE_BREAKABLE: u64 = 15;
    pub const SCORE_BULLET_KILL: u64 = 25;
    pub const SCORE_STOMP: u64 = 50;
}
