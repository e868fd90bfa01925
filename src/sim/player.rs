//! The falling player: movement, bounce, shooting and death check

use glam::Vec2;

use super::collision::Aabb;
use super::entity::{Arena, EntityId, EntityKind};
use super::physics::{BodyDesc, BodyId, Physics};
use super::state::Viewport;
use super::timer::{DeferredAction, Timers};
use crate::error::SimError;
use crate::tuning::PlayerTuning;

/// Read-only kinematics snapshot used by arbitration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub bounds: Aabb,
    pub velocity: Vec2,
}

impl PlayerView {
    pub fn y(&self) -> f32 {
        self.bounds.center.y
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub body: BodyId,
    pub can_shoot: bool,
    cfg: PlayerTuning,
}

impl Player {
    /// Create the player body at `(x, cfg.start_y)`
    pub fn spawn(physics: &mut impl Physics, x: f32, cfg: PlayerTuning) -> Self {
        let body = physics.add_body(
            BodyDesc::dynamic(Vec2::new(x, cfg.start_y), Vec2::splat(cfg.size))
                .with_max_velocity(Vec2::new(cfg.max_velocity_x, cfg.max_velocity_y))
                .collide_world_x(),
        );
        Self {
            body,
            can_shoot: true,
            cfg,
        }
    }

    pub fn view(&self, physics: &impl Physics) -> Result<PlayerView, SimError> {
        let bounds = physics.bounds(self.body).ok_or(SimError::MissingPlayerBody)?;
        let velocity = physics.velocity(self.body).ok_or(SimError::MissingPlayerBody)?;
        for (what, value) in [
            ("x", bounds.center.x),
            ("y", bounds.center.y),
            ("velocity x", velocity.x),
            ("velocity y", velocity.y),
        ] {
            if !value.is_finite() {
                return Err(SimError::NonFinite { what, value });
            }
        }
        Ok(PlayerView { bounds, velocity })
    }

    pub fn y(&self, physics: &impl Physics) -> Option<f32> {
        physics.bounds(self.body).map(|b| b.center.y)
    }

    /// Horizontal input in [-1, 1]
    pub fn steer(&self, physics: &mut impl Physics, horizontal: f32) {
        if let Some(vel) = physics.velocity(self.body) {
            let x = horizontal.clamp(-1.0, 1.0) * self.cfg.move_speed;
            physics.set_velocity(self.body, Vec2::new(x, vel.y));
        }
    }

    /// Launch upward with the bounce impulse
    pub fn bounce(&self, physics: &mut impl Physics) {
        if let Some(vel) = physics.velocity(self.body) {
            physics.set_velocity(self.body, Vec2::new(vel.x, self.cfg.bounce_force));
        }
    }

    /// Fire a bullet straight down, if allowed. Only works while airborne.
    pub fn shoot(
        &mut self,
        physics: &mut impl Physics,
        arena: &mut Arena,
        timers: &mut Timers,
    ) -> Option<EntityId> {
        if !self.can_shoot || physics.blocked_down(self.body) {
            return None;
        }
        let bounds = physics.bounds(self.body)?;
        let vel = physics.velocity(self.body)?;
        self.can_shoot = false;

        let pos = bounds.center + Vec2::new(0.0, self.cfg.bullet_spawn_offset);
        let size = Vec2::splat(self.cfg.bullet_size);
        let body = physics.add_body(
            BodyDesc::dynamic(pos, size)
                .without_gravity()
                .with_velocity(Vec2::new(0.0, self.cfg.bullet_speed)),
        );
        let id = arena.insert(EntityKind::Bullet, Some(body), pos, size);

        // Recoil
        physics.set_velocity(self.body, Vec2::new(vel.x, vel.y - self.cfg.shoot_recoil));

        timers.schedule(self.cfg.bullet_lifetime_ms, DeferredAction::ExpireBullet(id));
        timers.schedule(self.cfg.shoot_cooldown_ms, DeferredAction::ResetShoot);
        Some(id)
    }

    /// Fell off the bottom of the view
    pub fn is_dead(&self, physics: &impl Physics, viewport: &Viewport) -> bool {
        self.y(physics)
            .is_some_and(|y| y > viewport.scroll_y + viewport.height + self.cfg.death_margin)
    }
}
