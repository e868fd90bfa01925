//! Run phase, event stream, viewport and HUD snapshot types

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active descent
    Playing,
    /// Player fell out of view; waiting for restart
    GameOver,
}

/// Why score was awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreReason {
    BreakablePlatform,
    EnemyStomp,
    EnemyShot,
}

/// What a bounce landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BounceTarget {
    Platform(EntityId),
    Enemy(EntityId),
}

impl BounceTarget {
    pub fn id(&self) -> EntityId {
        match *self {
            BounceTarget::Platform(id) | BounceTarget::Enemy(id) => id,
        }
    }
}

/// Observable simulation events, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Score { delta: u64, reason: ScoreReason },
    Bounce { target: BounceTarget, y: f32 },
    BounceUnlocked,
    /// Arbitration failed and the lock was force-reset
    ArbitrationReset { error: String },
    PlatformSpawned { id: EntityId, breakable: bool, y: f32 },
    EnemySpawned { id: EntityId, home: EntityId },
    PlatformBroken { id: EntityId },
    EnemyDestroyed { id: EntityId },
    BulletExpired { id: EntityId },
    Evicted { platforms: usize, enemies: usize },
    DistanceChanged { distance: u32 },
    LevelUp { level: u32 },
    Landed { platform: EntityId },
    GameOver { score: u64, distance: u32 },
    Restarted,
}

/// Visible window into the world (camera collaborator)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// World y of the top edge of the view
    pub scroll_y: f32,
    pub height: f32,
}

impl Viewport {
    /// Ease the view toward centring `target_y`, within `[min_y, max_y]`
    pub fn follow(&mut self, target_y: f32, lerp: f32, min_y: f32, max_y: f32) {
        let desired = target_y - self.height / 2.0;
        self.scroll_y += (desired - self.scroll_y) * lerp;
        self.scroll_y = self.scroll_y.clamp(min_y, max_y.max(min_y));
    }
}

/// Non-authoritative counters for logging and debug overlays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnStats {
    pub solid_spawned: u64,
    pub breakable_spawned: u64,
    pub enemies_spawned: u64,
    /// Most spawns issued by a single top-up
    pub max_spawns_in_tick: u32,
    /// Top-ups that stopped at the per-tick cap short of the target
    pub capped_top_ups: u64,
}

/// Snapshot for the score/UI collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub score: u64,
    /// Depth in metres
    pub distance: u32,
    pub level: u32,
    pub platforms: usize,
    pub enemies: usize,
    pub bullets: usize,
    pub contacts: usize,
    pub bounce_locked: bool,
    pub phase: GamePhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_follow_eases_and_clamps() {
        let mut view = Viewport {
            scroll_y: 0.0,
            height: 800.0,
        };
        view.follow(1400.0, 0.1, -1000.0, 10_000.0);
        assert!((view.scroll_y - 100.0).abs() < 0.001);

        view.follow(-50_000.0, 1.0, -1000.0, 10_000.0);
        assert_eq!(view.scroll_y, -1000.0);
    }

    #[test]
    fn test_events_serialize() {
        let event = SimEvent::Score {
            delta: 15,
            reason: ScoreReason::BreakablePlatform,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BreakablePlatform"));
    }
}
