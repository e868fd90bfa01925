//! Fixed timestep simulation tick
//!
//! `Simulation` owns every collaborator and advances them in a fixed order:
//! timers, input, physics, difficulty, enemies, spawning, arbitration,
//! camera, pruning, death check. All randomness comes from one seeded
//! generator and all iteration is in entity id order.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::bounce::{Arbitration, BounceArbiter, SolidLanding, resolve_bullet_hits};
use super::difficulty::Difficulty;
use super::entity::{Arena, EntityId, Patrol, PlatformKind};
use super::lifecycle::Lifecycle;
use super::physics::{ArcadePhysics, Physics};
use super::player::Player;
use super::spawn::{SpawnFrontier, Spawned};
use super::state::{BounceTarget, GamePhase, Hud, ScoreReason, SimEvent, SpawnStats, Viewport};
use super::timer::{DeferredAction, Timers};
use crate::error::{SimError, TuningError};
use crate::tuning::Tuning;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal steering in [-1, 1]
    pub horizontal: f32,
    /// Fire a bullet downward
    pub shoot: bool,
    /// Start a new run (only honoured after game over)
    pub restart: bool,
    /// Override the camera top for this tick
    pub camera_top: Option<f32>,
}

type Observer = Box<dyn FnMut(&SimEvent)>;

pub struct Simulation<P: Physics = ArcadePhysics> {
    tuning: Tuning,
    seed: u64,
    rng: Pcg32,
    physics: P,
    arena: Arena,
    lifecycle: Lifecycle,
    frontier: SpawnFrontier,
    difficulty: Difficulty,
    arbiter: BounceArbiter,
    landing: SolidLanding,
    timers: Timers,
    player: Player,
    viewport: Viewport,
    score: u64,
    phase: GamePhase,
    time_ticks: u64,
    events: Vec<SimEvent>,
    observer: Option<Observer>,
}

impl Simulation<ArcadePhysics> {
    /// New run on the bundled arcade physics
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self, TuningError> {
        let physics = ArcadePhysics::new(tuning.world.gravity, tuning.world.width);
        Self::with_physics(tuning, seed, physics)
    }
}

impl<P: Physics> Simulation<P> {
    pub fn with_physics(tuning: Tuning, seed: u64, mut physics: P) -> Result<Self, TuningError> {
        tuning.validate()?;
        physics.clear();

        let player = Player::spawn(&mut physics, tuning.world.width / 2.0, tuning.player.clone());
        let start_y = tuning.player.start_y;
        let mut sim = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            physics,
            arena: Arena::new(),
            lifecycle: Lifecycle::new(tuning.lifecycle.clone()),
            frontier: SpawnFrontier::new(tuning.spawn.clone(), tuning.world.width, start_y),
            difficulty: Difficulty::new(tuning.difficulty.clone(), start_y),
            arbiter: BounceArbiter::new(tuning.bounce.clone()),
            landing: SolidLanding::new(tuning.bounce.clone()),
            timers: Timers::new(),
            player,
            viewport: Viewport {
                scroll_y: 0.0,
                height: tuning.world.view_height,
            },
            score: 0,
            phase: GamePhase::Playing,
            time_ticks: 0,
            events: Vec::new(),
            observer: None,
            tuning,
        };
        sim.snap_camera(start_y);
        sim.spawn_initial_column();
        log::info!("Simulation started with seed {}", seed);
        Ok(sim)
    }

    /// Advance the simulation by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if self.phase == GamePhase::GameOver {
            if input.restart {
                self.restart();
            }
            return;
        }
        self.time_ticks += 1;

        self.fire_timers(f64::from(dt) * 1000.0);

        self.player.steer(&mut self.physics, input.horizontal);
        if input.shoot {
            if let Some(id) = self
                .player
                .shoot(&mut self.physics, &mut self.arena, &mut self.timers)
            {
                log::trace!("Fired bullet {}", id);
            }
        }

        self.physics.step(dt);
        self.arena.sync_positions(&self.physics);

        let Some(player_y) = self.player.y(&self.physics) else {
            log::error!("Tick aborted: {}", SimError::MissingPlayerBody);
            return;
        };

        if let Some(distance) = self.difficulty.observe(player_y) {
            self.emit(SimEvent::DistanceChanged { distance });
            if let Some(level) = self.difficulty.recompute(distance) {
                self.emit(SimEvent::LevelUp { level });
            }
        }

        let orphans = self.arena.update_enemies(
            &mut self.physics,
            self.tuning.spawn.enemy_patrol_speed,
            self.tuning.spawn.enemy_edge_inset,
        );
        for id in orphans {
            self.emit(SimEvent::EnemyDestroyed { id });
        }

        let params = self.difficulty.params();
        let spawned = self.frontier.top_up(
            player_y,
            &mut self.rng,
            &params,
            &mut self.arena,
            &mut self.physics,
            &mut self.lifecycle,
            self.player.body,
        );
        self.emit_spawned(&spawned);

        self.resolve_interactions();

        match input.camera_top {
            Some(top) => self.viewport.scroll_y = top,
            None => self.follow_camera(),
        }
        let report = self
            .lifecycle
            .prune(&mut self.arena, &mut self.physics, self.viewport.scroll_y);
        if report.evicted_platforms > 0 || report.evicted_enemies > 0 {
            self.emit(SimEvent::Evicted {
                platforms: report.evicted_platforms,
                enemies: report.evicted_enemies,
            });
        }

        if self.player.is_dead(&self.physics, &self.viewport) {
            self.phase = GamePhase::GameOver;
            log::info!(
                "Game over: score {}, distance {}m",
                self.score,
                self.difficulty.distance()
            );
            self.emit(SimEvent::GameOver {
                score: self.score,
                distance: self.difficulty.distance(),
            });
        }
    }

    /// Throw away the run and start a new one with the same tuning. The
    /// random stream carries on, so successive runs differ.
    pub fn restart(&mut self) {
        self.physics.clear();
        self.timers.clear();
        let t = &self.tuning;
        let start_y = t.player.start_y;
        self.player = Player::spawn(&mut self.physics, t.world.width / 2.0, t.player.clone());
        self.arena = Arena::new();
        self.lifecycle = Lifecycle::new(t.lifecycle.clone());
        self.frontier = SpawnFrontier::new(t.spawn.clone(), t.world.width, start_y);
        self.difficulty = Difficulty::new(t.difficulty.clone(), start_y);
        self.arbiter = BounceArbiter::new(t.bounce.clone());
        self.landing = SolidLanding::new(t.bounce.clone());
        self.score = 0;
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.snap_camera(start_y);
        self.spawn_initial_column();
        log::info!("Run restarted");
        self.emit(SimEvent::Restarted);
    }

    pub fn hud(&self) -> Hud {
        Hud {
            score: self.score,
            distance: self.difficulty.distance(),
            level: self.difficulty.level(),
            platforms: self.arena.platform_count(),
            enemies: self.arena.enemy_count(),
            bullets: self.arena.bullet_count(),
            contacts: self.physics.contact_count(),
            bounce_locked: self.arbiter.is_locked(),
            phase: self.phase,
        }
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Also push each event to `observer` as it happens
    pub fn set_observer(&mut self, observer: impl FnMut(&SimEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Add a platform outside the procedural frontier
    pub fn place_platform(&mut self, kind: PlatformKind, center: Vec2) -> EntityId {
        self.frontier.place_platform(
            kind,
            center,
            &mut self.arena,
            &mut self.physics,
            &mut self.lifecycle,
            self.player.body,
        )
    }

    /// Add an enemy on an existing platform
    pub fn place_enemy(&mut self, home: EntityId, patrol: Patrol) -> Result<EntityId, SimError> {
        self.frontier.place_enemy(
            home,
            patrol,
            &mut self.arena,
            &mut self.physics,
            &mut self.lifecycle,
        )
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn arbiter(&self) -> &BounceArbiter {
        &self.arbiter
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn frontier(&self) -> &SpawnFrontier {
        &self.frontier
    }

    pub fn spawn_stats(&self) -> &SpawnStats {
        &self.frontier.stats
    }

    fn emit(&mut self, event: SimEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
        self.events.push(event);
    }

    fn emit_spawned(&mut self, spawned: &[Spawned]) {
        for s in spawned {
            self.emit(SimEvent::PlatformSpawned {
                id: s.platform,
                breakable: s.kind == PlatformKind::Breakable,
                y: s.y,
            });
            if let Some(id) = s.enemy {
                self.emit(SimEvent::EnemySpawned {
                    id,
                    home: s.platform,
                });
            }
        }
    }

    fn award(&mut self, delta: u64, reason: ScoreReason) {
        self.score += delta;
        self.emit(SimEvent::Score { delta, reason });
    }

    fn spawn_initial_column(&mut self) {
        let params = self.difficulty.params();
        let mut spawned = Vec::with_capacity(self.tuning.spawn.initial_platforms as usize);
        for _ in 0..self.tuning.spawn.initial_platforms {
            spawned.push(self.frontier.spawn_one(
                &mut self.rng,
                &params,
                &mut self.arena,
                &mut self.physics,
                &mut self.lifecycle,
                self.player.body,
            ));
        }
        self.emit_spawned(&spawned);
    }

    fn fire_timers(&mut self, dt_ms: f64) {
        for (handle, action) in self.timers.advance(dt_ms) {
            match action {
                DeferredAction::UnlockBounce => {
                    if self.arbiter.on_unlock(handle) {
                        self.emit(SimEvent::BounceUnlocked);
                    }
                }
                DeferredAction::ResetShoot => self.player.can_shoot = true,
                DeferredAction::ExpireBullet(id) => {
                    let expired = self
                        .arena
                        .get_mut(id)
                        .is_some_and(|bullet| bullet.destroy(&mut self.physics));
                    if expired {
                        self.emit(SimEvent::BulletExpired { id });
                    }
                }
                DeferredAction::ReleaseLanding => {
                    self.landing.on_release(handle);
                }
            }
        }
    }

    /// Bounce arbitration, optional solid landing, then bullet hits
    fn resolve_interactions(&mut self) {
        let outcome = self.arbiter.arbitrate(
            &self.player,
            &mut self.arena,
            &mut self.physics,
            &mut self.timers,
        );
        match outcome {
            Arbitration::Bounced(b) => {
                self.emit(SimEvent::Bounce {
                    target: b.target,
                    y: b.y,
                });
                match b.target {
                    BounceTarget::Platform(id) => {
                        self.emit(SimEvent::PlatformBroken { id });
                        self.award(self.tuning.score.breakable, ScoreReason::BreakablePlatform);
                    }
                    BounceTarget::Enemy(id) => {
                        self.emit(SimEvent::EnemyDestroyed { id });
                        self.award(self.tuning.score.stomp, ScoreReason::EnemyStomp);
                    }
                }
            }
            Arbitration::Reset(err) => self.emit(SimEvent::ArbitrationReset {
                error: err.to_string(),
            }),
            Arbitration::Skipped(_) | Arbitration::NoTarget => {}
        }

        if self.tuning.bounce.manual_solid_landing && !self.arbiter.is_locked() {
            match self
                .landing
                .resolve(&self.player, &self.arena, &mut self.physics, &mut self.timers)
            {
                Ok(Some(platform)) => self.emit(SimEvent::Landed { platform }),
                Ok(None) => {}
                Err(err) => log::warn!("Solid landing skipped: {err}"),
            }
        }

        for hit in resolve_bullet_hits(&mut self.arena, &mut self.physics) {
            self.emit(SimEvent::EnemyDestroyed { id: hit.enemy });
            self.award(self.tuning.score.bullet_kill, ScoreReason::EnemyShot);
        }
    }

    fn camera_bounds(&self) -> (f32, f32) {
        let w = &self.tuning.world;
        (w.camera_min_y, w.depth + w.camera_min_y - w.view_height)
    }

    fn follow_camera(&mut self) {
        let Some(y) = self.player.y(&self.physics) else {
            return;
        };
        let (min_y, max_y) = self.camera_bounds();
        self.viewport
            .follow(y, self.tuning.world.camera_lerp, min_y, max_y);
    }

    fn snap_camera(&mut self, y: f32) {
        let (min_y, max_y) = self.camera_bounds();
        self.viewport.follow(y, 1.0, min_y, max_y);
    }
}
