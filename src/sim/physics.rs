//! Physics collaborator
//!
//! The simulation treats physics as a black box behind [`Physics`]: it
//! integrates gravity, clamps velocities and blocks bodies on registered
//! contacts. [`ArcadePhysics`] is the bundled implementation.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;

/// Handle to a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Handle to a registered contact pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactHandle(pub u32);

/// When a registered contact is allowed to block body `a` against body `b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContactFilter {
    /// Always block (an enemy standing on its home ledge)
    Always,
    /// One-way platform: only while `a` is falling (vy >= 0) and its lower
    /// edge is no more than `tolerance` past `b`'s upper edge
    FallingOnto { tolerance: f32 },
}

impl ContactFilter {
    pub fn accepts(&self, a: &Aabb, a_vel: Vec2, b: &Aabb) -> bool {
        match *self {
            ContactFilter::Always => true,
            ContactFilter::FallingOnto { tolerance } => {
                a_vel.y >= 0.0 && a.bottom() <= b.top() + tolerance
            }
        }
    }
}

/// Body creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub center: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    /// Static bodies never integrate
    pub is_static: bool,
    pub gravity: bool,
    pub max_velocity: Option<Vec2>,
    /// Clamp horizontally to the world width
    pub collide_world_x: bool,
}

impl BodyDesc {
    pub fn fixed(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size,
            velocity: Vec2::ZERO,
            is_static: true,
            gravity: false,
            max_velocity: None,
            collide_world_x: false,
        }
    }

    pub fn dynamic(center: Vec2, size: Vec2) -> Self {
        Self {
            is_static: false,
            gravity: true,
            ..Self::fixed(center, size)
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn without_gravity(mut self) -> Self {
        self.gravity = false;
        self
    }

    pub fn with_max_velocity(mut self, max: Vec2) -> Self {
        self.max_velocity = Some(max);
        self
    }

    pub fn collide_world_x(mut self) -> Self {
        self.collide_world_x = true;
        self
    }
}

/// Interface the simulation needs from a physics engine
pub trait Physics {
    fn add_body(&mut self, desc: BodyDesc) -> BodyId;
    /// Remove a body and every contact that references it
    fn remove_body(&mut self, id: BodyId);
    fn set_enabled(&mut self, id: BodyId, enabled: bool);
    fn is_enabled(&self, id: BodyId) -> bool;
    fn bounds(&self, id: BodyId) -> Option<Aabb>;
    fn velocity(&self, id: BodyId) -> Option<Vec2>;
    fn set_velocity(&mut self, id: BodyId, velocity: Vec2);
    fn set_position(&mut self, id: BodyId, center: Vec2);
    /// Body was blocked from below during the last step
    fn blocked_down(&self, id: BodyId) -> bool;
    fn register_one_way_contact(
        &mut self,
        a: BodyId,
        b: BodyId,
        filter: ContactFilter,
    ) -> ContactHandle;
    /// Returns false if the handle was unknown (already released)
    fn unregister(&mut self, handle: ContactHandle) -> bool;
    fn contact_count(&self) -> usize;
    fn step(&mut self, dt: f32);
    /// Drop every body and contact
    fn clear(&mut self);
}

#[derive(Debug, Clone)]
struct Body {
    aabb: Aabb,
    velocity: Vec2,
    is_static: bool,
    gravity: bool,
    max_velocity: Option<Vec2>,
    collide_world_x: bool,
    enabled: bool,
    blocked_down: bool,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    a: BodyId,
    b: BodyId,
    filter: ContactFilter,
}

/// Minimal arcade-style physics: gravity, velocity clamps, vertical
/// separation on registered contacts
#[derive(Debug, Clone)]
pub struct ArcadePhysics {
    pub gravity: f32,
    pub world_width: f32,
    bodies: BTreeMap<BodyId, Body>,
    contacts: BTreeMap<ContactHandle, Contact>,
    next_body: u32,
    next_contact: u32,
}

impl ArcadePhysics {
    pub fn new(gravity: f32, world_width: f32) -> Self {
        Self {
            gravity,
            world_width,
            bodies: BTreeMap::new(),
            contacts: BTreeMap::new(),
            next_body: 1,
            next_contact: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        let world_width = self.world_width;
        for body in self.bodies.values_mut() {
            body.blocked_down = false;
            if body.is_static || !body.enabled {
                continue;
            }
            if body.gravity {
                body.velocity.y += gravity * dt;
            }
            if let Some(max) = body.max_velocity {
                body.velocity = body.velocity.clamp(-max, max);
            }
            body.aabb.center += body.velocity * dt;

            if body.collide_world_x {
                let half = body.aabb.half.x;
                let clamped = body.aabb.center.x.clamp(half, (world_width - half).max(half));
                if clamped != body.aabb.center.x {
                    body.aabb.center.x = clamped;
                    body.velocity.x = 0.0;
                }
            }
        }
    }

    fn resolve_contacts(&mut self) {
        for contact in self.contacts.values() {
            let (Some(a), Some(b)) = (self.bodies.get(&contact.a), self.bodies.get(&contact.b))
            else {
                continue;
            };
            if !a.enabled || !b.enabled || a.is_static {
                continue;
            }
            if !a.aabb.overlaps(&b.aabb) || !contact.filter.accepts(&a.aabb, a.velocity, &b.aabb)
            {
                continue;
            }

            let b_aabb = b.aabb;
            let Some(a) = self.bodies.get_mut(&contact.a) else {
                continue;
            };
            if a.aabb.center.y <= b_aabb.center.y {
                // Rest on top
                a.aabb.center.y = b_aabb.top() - a.aabb.half.y;
                a.velocity.y = a.velocity.y.min(0.0);
                a.blocked_down = true;
            } else {
                // Bumped from below
                a.aabb.center.y = b_aabb.bottom() + a.aabb.half.y;
                a.velocity.y = a.velocity.y.max(0.0);
            }
        }
    }
}

impl Physics for ArcadePhysics {
    fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            id,
            Body {
                aabb: Aabb::new(desc.center, desc.size),
                velocity: desc.velocity,
                is_static: desc.is_static,
                gravity: desc.gravity,
                max_velocity: desc.max_velocity,
                collide_world_x: desc.collide_world_x,
                enabled: true,
                blocked_down: false,
            },
        );
        id
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
        self.contacts.retain(|_, c| c.a != id && c.b != id);
    }

    fn set_enabled(&mut self, id: BodyId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.enabled = enabled;
        }
    }

    fn is_enabled(&self, id: BodyId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.enabled)
    }

    fn bounds(&self, id: BodyId) -> Option<Aabb> {
        self.bodies.get(&id).map(|b| b.aabb)
    }

    fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.velocity)
    }

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = velocity;
        }
    }

    fn set_position(&mut self, id: BodyId, center: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.aabb.center = center;
        }
    }

    fn blocked_down(&self, id: BodyId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.blocked_down)
    }

    fn register_one_way_contact(
        &mut self,
        a: BodyId,
        b: BodyId,
        filter: ContactFilter,
    ) -> ContactHandle {
        let handle = ContactHandle(self.next_contact);
        self.next_contact += 1;
        self.contacts.insert(handle, Contact { a, b, filter });
        handle
    }

    fn unregister(&mut self, handle: ContactHandle) -> bool {
        self.contacts.remove(&handle).is_some()
    }

    fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        self.resolve_contacts();
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn platform(physics: &mut ArcadePhysics, y: f32) -> BodyId {
        physics.add_body(BodyDesc::fixed(Vec2::new(150.0, y), Vec2::new(80.0, 16.0)))
    }

    #[test]
    fn test_gravity_and_max_velocity() {
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let id = physics.add_body(
            BodyDesc::dynamic(Vec2::new(150.0, 0.0), Vec2::splat(24.0))
                .with_max_velocity(Vec2::new(300.0, 1000.0)),
        );
        for _ in 0..120 {
            physics.step(DT);
        }
        let vel = physics.velocity(id).unwrap();
        assert!((vel.y - 1000.0).abs() < 0.001);
    }

    #[test]
    fn test_one_way_contact_blocks_falling_body() {
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let ledge = platform(&mut physics, 100.0);
        let player =
            physics.add_body(BodyDesc::dynamic(Vec2::new(150.0, 70.0), Vec2::splat(24.0)));
        physics.register_one_way_contact(
            player,
            ledge,
            ContactFilter::FallingOnto { tolerance: 20.0 },
        );

        for _ in 0..60 {
            physics.step(DT);
        }
        let bounds = physics.bounds(player).unwrap();
        assert!((bounds.bottom() - 92.0).abs() < 0.001);
        assert!(physics.blocked_down(player));
    }

    #[test]
    fn test_one_way_contact_ignores_rising_body() {
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let ledge = platform(&mut physics, 100.0);
        let player = physics.add_body(
            BodyDesc::dynamic(Vec2::new(150.0, 130.0), Vec2::splat(24.0))
                .with_velocity(Vec2::new(0.0, -300.0)),
        );
        physics.register_one_way_contact(
            player,
            ledge,
            ContactFilter::FallingOnto { tolerance: 20.0 },
        );

        for _ in 0..30 {
            physics.step(DT);
        }
        // Passed straight up through the ledge
        assert!(physics.bounds(player).unwrap().bottom() < 92.0);
    }

    #[test]
    fn test_disabled_body_does_not_block() {
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let ledge = platform(&mut physics, 100.0);
        let enemy = physics.add_body(BodyDesc::dynamic(Vec2::new(150.0, 70.0), Vec2::splat(24.0)));
        physics.register_one_way_contact(enemy, ledge, ContactFilter::Always);
        physics.set_enabled(ledge, false);

        for _ in 0..60 {
            physics.step(DT);
        }
        assert!(physics.bounds(enemy).unwrap().top() > 108.0);
    }

    #[test]
    fn test_remove_body_drops_its_contacts() {
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let ledge = platform(&mut physics, 100.0);
        let enemy = physics.add_body(BodyDesc::dynamic(Vec2::new(150.0, 70.0), Vec2::splat(24.0)));
        let handle = physics.register_one_way_contact(enemy, ledge, ContactFilter::Always);
        assert_eq!(physics.contact_count(), 1);

        physics.remove_body(ledge);
        assert_eq!(physics.contact_count(), 0);
        assert!(!physics.unregister(handle));
    }

    #[test]
    fn test_world_x_clamp() {
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let id = physics.add_body(
            BodyDesc::dynamic(Vec2::new(290.0, 0.0), Vec2::splat(24.0))
                .with_velocity(Vec2::new(600.0, 0.0))
                .collide_world_x(),
        );
        physics.step(DT);
        assert_eq!(physics.bounds(id).unwrap().right(), 300.0);
        assert_eq!(physics.velocity(id).unwrap().x, 0.0);
    }
}
