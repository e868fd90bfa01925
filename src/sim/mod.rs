//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod bounce;
pub mod collision;
pub mod difficulty;
pub mod entity;
pub mod lifecycle;
pub mod physics;
pub mod player;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod timer;

pub use bounce::{
    Arbitration, BounceArbiter, BounceState, Bounced, BulletHit, SkipReason, SolidLanding,
};
pub use collision::{Aabb, gap_below};
pub use difficulty::{Difficulty, SpawnParams};
pub use entity::{Arena, Enemy, Entity, EntityId, EntityKind, Patrol, Platform, PlatformKind};
pub use lifecycle::{Lifecycle, PruneReport};
pub use physics::{ArcadePhysics, BodyDesc, BodyId, ContactFilter, ContactHandle, Physics};
pub use player::{Player, PlayerView};
pub use spawn::{SpawnFrontier, Spawned};
pub use state::{BounceTarget, GamePhase, Hud, ScoreReason, SimEvent, SpawnStats, Viewport};
pub use tick::{Simulation, TickInput};
pub use timer::{DeferredAction, TimerHandle, Timers};
