//! Bounce arbitration
//!
//! Two states, `Ready` and `Locked`. While ready, each tick looks for the
//! nearest breakable platform, then the nearest enemy, below the player and
//! within the proximity tolerance. A resolved bounce locks the arbiter
//! until a single cancellable unlock timer fires; no target search happens
//! while locked.

use serde::{Deserialize, Serialize};

use super::collision::gap_below;
use super::entity::{Arena, EntityId, EntityKind, Platform, PlatformKind};
use super::physics::Physics;
use super::player::{Player, PlayerView};
use super::state::BounceTarget;
use super::timer::{DeferredAction, TimerHandle, Timers};
use crate::error::SimError;
use crate::tuning::BounceTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BounceState {
    Ready,
    Locked,
}

/// Why a tick did no target search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Locked,
    /// Not falling fast enough
    TooSlow,
    /// Not far enough below the last bounce
    TooSoon,
}

/// A resolved bounce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounced {
    pub target: BounceTarget,
    pub gap: f32,
    /// Player y at the moment of the bounce
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arbitration {
    Skipped(SkipReason),
    /// Searched, nothing within tolerance
    NoTarget,
    Bounced(Bounced),
    /// Search or resolution failed; the lock was force-reset
    Reset(SimError),
}

/// Nearest candidate of one class
#[derive(Debug, Clone, Copy, PartialEq)]
struct Nearest {
    id: EntityId,
    gap: f32,
}

impl Nearest {
    fn offer(slot: &mut Option<Nearest>, id: EntityId, gap: f32) {
        if slot.is_none_or(|n| gap < n.gap) {
            *slot = Some(Nearest { id, gap });
        }
    }
}

#[derive(Debug, Clone)]
pub struct BounceArbiter {
    cfg: BounceTuning,
    state: BounceState,
    last_bounce_y: f32,
    unlock_timer: Option<TimerHandle>,
}

impl BounceArbiter {
    pub fn new(cfg: BounceTuning) -> Self {
        Self {
            last_bounce_y: cfg.initial_last_bounce_y,
            cfg,
            state: BounceState::Ready,
            unlock_timer: None,
        }
    }

    pub fn state(&self) -> BounceState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == BounceState::Locked
    }

    pub fn last_bounce_y(&self) -> f32 {
        self.last_bounce_y
    }

    pub fn unlock_timer(&self) -> Option<TimerHandle> {
        self.unlock_timer
    }

    /// Falling fast enough, and far enough past the last bounce
    pub fn gate(&self, player: &PlayerView) -> Result<(), SkipReason> {
        if player.velocity.y < self.cfg.fall_velocity_threshold {
            return Err(SkipReason::TooSlow);
        }
        if (player.y() - self.last_bounce_y).abs() < self.cfg.min_fall_distance {
            return Err(SkipReason::TooSoon);
        }
        Ok(())
    }

    /// Nearest breakable platform wins over the nearest enemy whenever it is
    /// within tolerance. Entities without a body are skipped.
    pub fn find_target(
        &self,
        player: &PlayerView,
        arena: &Arena,
        physics: &impl Physics,
    ) -> Option<(BounceTarget, f32)> {
        let mut breakable: Option<Nearest> = None;
        let mut enemy: Option<Nearest> = None;

        for entity in arena.iter() {
            if entity.destroyed {
                continue;
            }
            let slot = match &entity.kind {
                EntityKind::Platform(Platform {
                    kind: PlatformKind::Breakable,
                    active: true,
                }) => &mut breakable,
                EntityKind::Enemy(_) => &mut enemy,
                EntityKind::Platform(_) | EntityKind::Bullet => continue,
            };
            let Some(bounds) = entity.bounds(physics) else {
                log::warn!("Bounce candidate {} has no body, skipping", entity.id);
                continue;
            };
            let Some(gap) = gap_below(&player.bounds, &bounds) else {
                continue;
            };
            if player.bounds.overlaps_horizontally(&bounds) {
                Nearest::offer(slot, entity.id, gap);
            }
        }

        let tolerance = self.cfg.proximity_tolerance;
        if let Some(n) = breakable.filter(|n| n.gap <= tolerance) {
            return Some((BounceTarget::Platform(n.id), n.gap));
        }
        if let Some(n) = enemy.filter(|n| n.gap <= tolerance) {
            return Some((BounceTarget::Enemy(n.id), n.gap));
        }
        None
    }

    /// Bounce the player and (re)arm the lock. A pending unlock is cancelled
    /// first so unlock timers never stack.
    pub fn trigger_bounce(
        &mut self,
        player: &Player,
        player_y: f32,
        physics: &mut impl Physics,
        timers: &mut Timers,
    ) {
        player.bounce(physics);
        self.state = BounceState::Locked;
        self.last_bounce_y = player_y;
        if let Some(pending) = self.unlock_timer.take() {
            timers.cancel(pending);
        }
        self.unlock_timer = Some(timers.schedule(self.cfg.lock_ms, DeferredAction::UnlockBounce));
        log::debug!("Bounce locked for {}ms at y={:.0}", self.cfg.lock_ms, player_y);
    }

    /// Handle a fired `UnlockBounce`. Stale handles are ignored.
    pub fn on_unlock(&mut self, handle: TimerHandle) -> bool {
        if self.unlock_timer != Some(handle) {
            return false;
        }
        self.unlock_timer = None;
        self.state = BounceState::Ready;
        true
    }

    /// Back to `Ready` no matter what, dropping any pending unlock
    pub fn force_reset(&mut self, timers: &mut Timers) {
        if let Some(pending) = self.unlock_timer.take() {
            timers.cancel(pending);
        }
        self.state = BounceState::Ready;
    }

    /// One arbitration pass. Errors never leave the arbiter locked.
    pub fn arbitrate(
        &mut self,
        player: &Player,
        arena: &mut Arena,
        physics: &mut impl Physics,
        timers: &mut Timers,
    ) -> Arbitration {
        if self.is_locked() {
            return Arbitration::Skipped(SkipReason::Locked);
        }
        match self.try_arbitrate(player, arena, physics, timers) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("Bounce arbitration failed, resetting lock: {err}");
                self.force_reset(timers);
                Arbitration::Reset(err)
            }
        }
    }

    fn try_arbitrate(
        &mut self,
        player: &Player,
        arena: &mut Arena,
        physics: &mut impl Physics,
        timers: &mut Timers,
    ) -> Result<Arbitration, SimError> {
        let view = player.view(physics)?;
        if let Err(reason) = self.gate(&view) {
            return Ok(Arbitration::Skipped(reason));
        }
        let Some((target, gap)) = self.find_target(&view, arena, physics) else {
            return Ok(Arbitration::NoTarget);
        };

        self.trigger_bounce(player, view.y(), physics, timers);

        let id = target.id();
        let entity = arena.get_mut(id).ok_or(SimError::MissingEntity(id))?;
        let consumed = match target {
            BounceTarget::Platform(_) => entity.break_platform(physics),
            BounceTarget::Enemy(_) => entity.destroy(physics),
        };
        if !consumed {
            return Err(SimError::MissingEntity(id));
        }
        log::debug!("Bounce on {:?} (gap {:.1})", target, gap);

        Ok(Arbitration::Bounced(Bounced {
            target,
            gap,
            y: view.y(),
        }))
    }
}

/// Optional manual landing: snap onto a solid platform's top and stop
#[derive(Debug, Clone)]
pub struct SolidLanding {
    cfg: BounceTuning,
    cooling: bool,
    timer: Option<TimerHandle>,
}

impl SolidLanding {
    pub fn new(cfg: BounceTuning) -> Self {
        Self {
            cfg,
            cooling: false,
            timer: None,
        }
    }

    pub fn is_cooling(&self) -> bool {
        self.cooling
    }

    pub fn on_release(&mut self, handle: TimerHandle) -> bool {
        if self.timer != Some(handle) {
            return false;
        }
        self.timer = None;
        self.cooling = false;
        true
    }

    /// Land on the first solid platform within the window below the player
    pub fn resolve(
        &mut self,
        player: &Player,
        arena: &Arena,
        physics: &mut impl Physics,
        timers: &mut Timers,
    ) -> Result<Option<EntityId>, SimError> {
        if self.cooling {
            return Ok(None);
        }
        let view = player.view(physics)?;
        if view.velocity.y < self.cfg.landing_min_velocity {
            return Ok(None);
        }

        let pb = view.bounds;
        let landing = arena.iter().find_map(|entity| {
            let EntityKind::Platform(Platform {
                kind: PlatformKind::Solid,
                active: true,
            }) = &entity.kind
            else {
                return None;
            };
            if entity.destroyed {
                return None;
            }
            let bounds = entity.bounds(physics)?;
            let gap = gap_below(&pb, &bounds)?;
            let overlap = pb.right() > bounds.left() && pb.left() < bounds.right();
            (gap <= self.cfg.landing_window && overlap).then_some((entity.id, bounds.top()))
        });

        let Some((id, top)) = landing else {
            return Ok(None);
        };
        physics.set_position(player.body, glam::Vec2::new(pb.center.x, top - pb.half.y));
        physics.set_velocity(player.body, glam::Vec2::new(view.velocity.x, 0.0));
        self.cooling = true;
        self.timer = Some(timers.schedule(
            self.cfg.landing_cooldown_ms,
            DeferredAction::ReleaseLanding,
        ));
        log::debug!("Landed on solid platform {} at y={:.0}", id, top);
        Ok(Some(id))
    }
}

/// A bullet that hit an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletHit {
    pub bullet: EntityId,
    pub enemy: EntityId,
}

/// Direct-contact check between live bullets and live enemies; each bullet
/// takes out at most one enemy. Runs regardless of the bounce lock.
pub fn resolve_bullet_hits(arena: &mut Arena, physics: &mut impl Physics) -> Vec<BulletHit> {
    let mut hits: Vec<BulletHit> = Vec::new();
    {
        let bullets = arena
            .iter()
            .filter(|e| e.is_bullet() && !e.destroyed)
            .filter_map(|e| e.bounds(physics).map(|b| (e.id, b)));
        let enemies: Vec<_> = arena
            .iter()
            .filter(|e| e.is_enemy() && !e.destroyed)
            .filter_map(|e| e.bounds(physics).map(|b| (e.id, b)))
            .collect();

        for (bullet, bb) in bullets {
            let hit = enemies
                .iter()
                .find(|(id, eb)| bb.intersects(eb) && !hits.iter().any(|h| h.enemy == *id));
            if let Some((enemy, _)) = hit {
                hits.push(BulletHit {
                    bullet,
                    enemy: *enemy,
                });
            }
        }
    }

    for hit in &hits {
        for id in [hit.bullet, hit.enemy] {
            if let Some(entity) = arena.get_mut(id) {
                entity.destroy(physics);
            }
        }
    }
    hits
}
