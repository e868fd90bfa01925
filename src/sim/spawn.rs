//! Procedural spawn frontier
//!
//! The frontier is a single world-y that only moves down, one
//! `spawn_interval` per platform. Each spawn may also place an enemy on the
//! new platform.

use glam::Vec2;
use rand::Rng;

use super::difficulty::SpawnParams;
use super::entity::{Arena, Enemy, EntityId, EntityKind, Patrol, Platform, PlatformKind};
use super::lifecycle::Lifecycle;
use super::physics::{BodyDesc, BodyId, ContactFilter, Physics};
use super::state::SpawnStats;
use crate::error::SimError;
use crate::tuning::SpawnTuning;

/// Result of one `spawn_one` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawned {
    pub platform: EntityId,
    pub kind: PlatformKind,
    pub enemy: Option<EntityId>,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct SpawnFrontier {
    cfg: SpawnTuning,
    world_width: f32,
    last_spawn_y: f32,
    pub stats: SpawnStats,
}

impl SpawnFrontier {
    pub fn new(cfg: SpawnTuning, world_width: f32, start_y: f32) -> Self {
        Self {
            cfg,
            world_width,
            last_spawn_y: start_y,
            stats: SpawnStats::default(),
        }
    }

    /// World-y of the most recently placed platform
    pub fn last_spawn_y(&self) -> f32 {
        self.last_spawn_y
    }

    pub fn min_x(&self) -> f32 {
        self.cfg.edge_margin
    }

    pub fn max_x(&self) -> f32 {
        self.world_width - self.cfg.platform_width - self.cfg.edge_margin
    }

    /// Place one platform (and maybe an enemy) one interval below the frontier.
    /// Draw order: x, platform type, enemy chance, patrol direction.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_one<P: Physics, R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        params: &SpawnParams,
        arena: &mut Arena,
        physics: &mut P,
        lifecycle: &mut Lifecycle,
        player: BodyId,
    ) -> Spawned {
        // Left edge of the span, whole units like the column grid
        let (lo, hi) = (self.min_x().ceil() as i32, self.max_x().floor() as i32);
        let left = (if lo < hi { rng.random_range(lo..=hi) } else { lo }) as f32;
        let y = self.last_spawn_y + params.spawn_interval;

        let kind = if rng.random::<f32>() < params.breakable_platform_chance {
            PlatformKind::Breakable
        } else {
            PlatformKind::Solid
        };
        let center = Vec2::new(left + self.cfg.platform_width / 2.0, y);
        let platform = self.place_platform(kind, center, arena, physics, lifecycle, player);

        let enemy = if rng.random::<f32>() < params.enemy_spawn_chance {
            let patrol = if rng.random_bool(0.5) {
                Patrol::Left
            } else {
                Patrol::Right
            };
            match self.place_enemy(platform, patrol, arena, physics, lifecycle) {
                Ok(id) => Some(id),
                Err(err) => {
                    log::warn!("Enemy spawn skipped: {err}");
                    None
                }
            }
        } else {
            None
        };

        self.last_spawn_y = y;
        log::debug!(
            "Spawned {:?} platform {} at y={:.0} (enemy: {:?})",
            kind,
            platform,
            y,
            enemy
        );

        Spawned {
            platform,
            kind,
            enemy,
            y,
        }
    }

    /// Add a platform centred at `center`. Solid ones get a one-way contact
    /// with the player; the frontier does not move.
    pub fn place_platform<P: Physics>(
        &mut self,
        kind: PlatformKind,
        center: Vec2,
        arena: &mut Arena,
        physics: &mut P,
        lifecycle: &mut Lifecycle,
        player: BodyId,
    ) -> EntityId {
        let size = Vec2::new(self.cfg.platform_width, self.cfg.platform_height);
        let body = physics.add_body(BodyDesc::fixed(center, size));
        let platform = arena.insert(
            EntityKind::Platform(Platform { kind, active: true }),
            Some(body),
            center,
            size,
        );

        match kind {
            PlatformKind::Solid => {
                let handle = physics.register_one_way_contact(
                    player,
                    body,
                    ContactFilter::FallingOnto {
                        tolerance: self.cfg.one_way_tolerance,
                    },
                );
                lifecycle.attach(platform, handle);
                self.stats.solid_spawned += 1;
            }
            // Breakables get no engine contact; arbitration owns them
            PlatformKind::Breakable => self.stats.breakable_spawned += 1,
        }
        platform
    }

    /// Put an enemy on top of `home`, patrolling in `patrol` direction
    pub fn place_enemy<P: Physics>(
        &mut self,
        home: EntityId,
        patrol: Patrol,
        arena: &mut Arena,
        physics: &mut P,
        lifecycle: &mut Lifecycle,
    ) -> Result<EntityId, SimError> {
        let entity = arena.get(home).ok_or(SimError::MissingEntity(home))?;
        let home_body = entity.body.ok_or(SimError::MissingBody(home))?;
        let ledge = physics.bounds(home_body).ok_or(SimError::MissingBody(home))?;

        let center = Vec2::new(ledge.center.x, ledge.center.y - self.cfg.enemy_spawn_offset);
        let size = Vec2::splat(self.cfg.enemy_size);
        let body = physics.add_body(
            BodyDesc::dynamic(center, size)
                .with_velocity(Vec2::new(patrol.sign() * self.cfg.enemy_patrol_speed, 0.0)),
        );
        let id = arena.insert(
            EntityKind::Enemy(Enemy { home, patrol }),
            Some(body),
            center,
            size,
        );
        // Blocks against its home ledge only
        let handle = physics.register_one_way_contact(body, home_body, ContactFilter::Always);
        lifecycle.attach(id, handle);
        lifecycle.attach(home, handle);
        self.stats.enemies_spawned += 1;
        Ok(id)
    }

    /// Spawn until the frontier is `ahead_margin` below `player_y`, at most
    /// `max_spawns_per_tick` times
    #[allow(clippy::too_many_arguments)]
    pub fn top_up<P: Physics, R: Rng + ?Sized>(
        &mut self,
        player_y: f32,
        rng: &mut R,
        params: &SpawnParams,
        arena: &mut Arena,
        physics: &mut P,
        lifecycle: &mut Lifecycle,
        player: BodyId,
    ) -> Vec<Spawned> {
        let target = player_y + self.cfg.ahead_margin;
        let mut spawned = Vec::new();
        while self.last_spawn_y < target && (spawned.len() as u32) < self.cfg.max_spawns_per_tick {
            spawned.push(self.spawn_one(rng, params, arena, physics, lifecycle, player));
        }

        let count = spawned.len() as u32;
        self.stats.max_spawns_in_tick = self.stats.max_spawns_in_tick.max(count);
        if self.last_spawn_y < target {
            self.stats.capped_top_ups += 1;
            log::debug!(
                "Spawn cap hit: frontier {:.0} still short of {:.0}",
                self.last_spawn_y,
                target
            );
        } else if count > 3 {
            log::debug!("Fast fall: spawned {} platforms to catch up", count);
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::ArcadePhysics;
    use crate::tuning::DifficultyTuning;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Rig {
        frontier: SpawnFrontier,
        arena: Arena,
        physics: ArcadePhysics,
        lifecycle: Lifecycle,
        player: BodyId,
        rng: Pcg32,
    }

    fn rig(seed: u64) -> Rig {
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let player =
            physics.add_body(BodyDesc::dynamic(Vec2::new(150.0, 100.0), Vec2::splat(24.0)));
        Rig {
            frontier: SpawnFrontier::new(SpawnTuning::default(), 300.0, 100.0),
            arena: Arena::new(),
            physics,
            lifecycle: Lifecycle::default(),
            player,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    fn params(enemy: f32, breakable: f32) -> SpawnParams {
        SpawnParams {
            enemy_spawn_chance: enemy,
            breakable_platform_chance: breakable,
            spawn_interval: 150.0,
        }
    }

    impl Rig {
        fn spawn(&mut self, p: &SpawnParams) -> Spawned {
            self.frontier.spawn_one(
                &mut self.rng,
                p,
                &mut self.arena,
                &mut self.physics,
                &mut self.lifecycle,
                self.player,
            )
        }

        fn top_up(&mut self, player_y: f32, p: &SpawnParams) -> Vec<Spawned> {
            self.frontier.top_up(
                player_y,
                &mut self.rng,
                p,
                &mut self.arena,
                &mut self.physics,
                &mut self.lifecycle,
                self.player,
            )
        }
    }

    #[test]
    fn test_spawn_advances_frontier_by_interval() {
        let mut rig = rig(1);
        let s = rig.spawn(&params(0.0, 0.0));
        assert_eq!(s.y, 250.0);
        assert_eq!(rig.frontier.last_spawn_y(), 250.0);
        let s = rig.spawn(&params(0.0, 0.0));
        assert_eq!(s.y, 400.0);
    }

    #[test]
    fn test_platform_stays_inside_column() {
        let mut rig = rig(7);
        for _ in 0..200 {
            let s = rig.spawn(&params(0.0, 0.5));
            let bounds = rig.arena.get(s.platform).unwrap().bounds(&rig.physics).unwrap();
            assert!(bounds.left() >= 20.0);
            assert!(bounds.left() <= 200.0);
            assert!(bounds.right() <= 280.0);
        }
    }

    #[test]
    fn test_solid_gets_contact_breakable_does_not() {
        let mut rig = rig(3);
        let solid = rig.spawn(&params(0.0, 0.0));
        assert_eq!(solid.kind, PlatformKind::Solid);
        assert_eq!(rig.lifecycle.handles(solid.platform).len(), 1);

        let breakable = rig.spawn(&params(0.0, 1.0));
        assert_eq!(breakable.kind, PlatformKind::Breakable);
        assert!(rig.lifecycle.handles(breakable.platform).is_empty());
        assert_eq!(rig.physics.contact_count(), 1);
    }

    #[test]
    fn test_enemy_centred_on_home_platform() {
        let mut rig = rig(11);
        let s = rig.spawn(&params(1.0, 1.0));
        let enemy_id = s.enemy.unwrap();
        let enemy = rig.arena.get(enemy_id).unwrap();
        assert_eq!(enemy.as_enemy().unwrap().home, s.platform);

        let ledge = rig.arena.get(s.platform).unwrap().bounds(&rig.physics).unwrap();
        let body = enemy.bounds(&rig.physics).unwrap();
        assert_eq!(body.center.x, ledge.center.x);
        assert!(body.bottom() <= ledge.top());
        // Enemy-to-home contact, tracked under both ids
        assert_eq!(rig.lifecycle.handles(enemy_id).len(), 1);
        assert_eq!(rig.lifecycle.handles(s.platform).len(), 1);
    }

    #[test]
    fn test_top_up_reaches_margin() {
        let mut rig = rig(5);
        let spawned = rig.top_up(1000.0, &params(0.3, 0.3));
        assert!(rig.frontier.last_spawn_y() >= 1300.0);
        assert_eq!(spawned.len(), 8);
        // Already satisfied
        assert!(rig.top_up(1000.0, &params(0.3, 0.3)).is_empty());
    }

    #[test]
    fn test_top_up_respects_per_tick_cap() {
        let mut rig = rig(5);
        let spawned = rig.top_up(100_000.0, &params(0.0, 0.0));
        assert_eq!(spawned.len(), 10);
        assert_eq!(rig.frontier.last_spawn_y(), 1600.0);
        assert_eq!(rig.frontier.stats.capped_top_ups, 1);
    }

    proptest! {
        #[test]
        fn frontier_steps_by_current_interval(
            seed in 0u64..500,
            levels in proptest::collection::vec(0u32..40, 1..30),
        ) {
            let cfg = DifficultyTuning::default();
            let mut rig = rig(seed);
            for level in levels {
                let p = SpawnParams::for_level(&cfg, level);
                let before = rig.frontier.last_spawn_y();
                let s = rig.spawn(&p);
                prop_assert_eq!(s.y, before + p.spawn_interval);
                prop_assert!(rig.frontier.last_spawn_y() > before);
            }
        }
    }
}
