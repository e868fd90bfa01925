//! Entity records and the id-addressed arena that holds them
//!
//! Entities are never deleted in place during a pass. They are marked
//! `destroyed`, their physics is disabled, and the lifecycle manager compacts
//! the arena afterwards.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::physics::{BodyId, Physics};

/// Stable entity identifier (monotonically allocated, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformKind {
    /// Blocks the player through a one-way engine contact
    Solid,
    /// No engine contact; consumed by bounce arbitration
    Breakable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub kind: PlatformKind,
    pub active: bool,
}

/// Horizontal patrol direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Patrol {
    Left,
    Right,
}

impl Patrol {
    pub fn sign(self) -> f32 {
        match self {
            Patrol::Left => -1.0,
            Patrol::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Platform this enemy patrols; its lifetime bounds the enemy's
    pub home: EntityId,
    pub patrol: Patrol,
}

/// Entity discriminant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Platform(Platform),
    Enemy(Enemy),
    Bullet,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    /// `None` until the physics representation exists
    pub body: Option<BodyId>,
    /// Last known centre (refreshed from physics each tick)
    pub pos: Vec2,
    pub size: Vec2,
    pub destroyed: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn bounds(&self, physics: &impl Physics) -> Option<Aabb> {
        self.body.and_then(|b| physics.bounds(b))
    }

    pub fn as_platform(&self) -> Option<&Platform> {
        match &self.kind {
            EntityKind::Platform(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_enemy(&self) -> Option<&Enemy> {
        match &self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(self.kind, EntityKind::Platform(_))
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_))
    }

    pub fn is_bullet(&self) -> bool {
        matches!(self.kind, EntityKind::Bullet)
    }

    /// Mark destroyed and disable the body so no contact fires on it again.
    /// Returns false if it was already destroyed.
    pub fn destroy(&mut self, physics: &mut impl Physics) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        if let EntityKind::Platform(p) = &mut self.kind {
            p.active = false;
        }
        if let Some(body) = self.body {
            physics.set_enabled(body, false);
        }
        true
    }

    /// Consume a breakable platform. Solid platforms and already-broken ones
    /// are left alone.
    pub fn break_platform(&mut self, physics: &mut impl Physics) -> bool {
        match &self.kind {
            EntityKind::Platform(Platform {
                kind: PlatformKind::Breakable,
                ..
            }) => self.destroy(physics),
            _ => false,
        }
    }
}

/// Entity arena, kept sorted by id
#[derive(Debug, Clone)]
pub struct Arena {
    entities: Vec<Entity>,
    next_id: u32,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    pub fn insert(
        &mut self,
        kind: EntityKind,
        body: Option<BodyId>,
        pos: Vec2,
        size: Vec2,
    ) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        // Ids only grow, so pushing keeps the vec sorted
        self.entities.push(Entity {
            id,
            body,
            pos,
            size,
            destroyed: false,
            kind,
        });
        id
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.entities[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(move |i| &mut self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn platform_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_platform()).count()
    }

    pub fn enemy_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_enemy()).count()
    }

    pub fn bullet_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_bullet()).count()
    }

    /// Remove the given entities, returning them so the caller can release
    /// their physics
    pub fn remove(&mut self, ids: &[EntityId]) -> Vec<Entity> {
        let mut removed = Vec::with_capacity(ids.len());
        let mut kept = Vec::with_capacity(self.entities.len());
        for entity in self.entities.drain(..) {
            if ids.contains(&entity.id) {
                removed.push(entity);
            } else {
                kept.push(entity);
            }
        }
        self.entities = kept;
        removed
    }

    /// Refresh cached positions from physics
    pub fn sync_positions(&mut self, physics: &impl Physics) {
        for entity in &mut self.entities {
            if let Some(bounds) = entity.bounds(physics) {
                entity.pos = bounds.center;
            }
        }
    }

    /// Per-tick enemy update: an enemy whose home platform is destroyed or
    /// gone is destroyed itself; the rest patrol their ledge. Returns the ids
    /// destroyed here.
    pub fn update_enemies(
        &mut self,
        physics: &mut impl Physics,
        patrol_speed: f32,
        edge_inset: f32,
    ) -> Vec<EntityId> {
        let mut orphaned = Vec::new();
        let mut turns: Vec<(usize, Patrol)> = Vec::new();

        for (idx, entity) in self.entities.iter().enumerate() {
            let EntityKind::Enemy(enemy) = &entity.kind else {
                continue;
            };
            if entity.destroyed {
                continue;
            }
            let home = self.get(enemy.home).filter(|h| !h.destroyed);
            let Some(home) = home else {
                orphaned.push(idx);
                continue;
            };
            let (Some(body), Some(ledge)) = (entity.body, home.bounds(physics)) else {
                continue;
            };
            let (Some(bounds), Some(vel)) = (physics.bounds(body), physics.velocity(body)) else {
                continue;
            };

            if vel.x < 0.0 && bounds.left() <= ledge.left() + edge_inset {
                turns.push((idx, Patrol::Right));
            } else if vel.x > 0.0 && bounds.right() >= ledge.right() - edge_inset {
                turns.push((idx, Patrol::Left));
            }
        }

        for (idx, patrol) in turns {
            let entity = &mut self.entities[idx];
            if let EntityKind::Enemy(enemy) = &mut entity.kind {
                enemy.patrol = patrol;
            }
            if let Some(body) = entity.body {
                let vel = physics.velocity(body).unwrap_or(Vec2::ZERO);
                physics.set_velocity(body, Vec2::new(patrol.sign() * patrol_speed, vel.y));
            }
        }

        let mut destroyed = Vec::with_capacity(orphaned.len());
        for idx in orphaned {
            let entity = &mut self.entities[idx];
            if entity.destroy(physics) {
                destroyed.push(entity.id);
            }
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{ArcadePhysics, BodyDesc, ContactFilter};

    const DT: f32 = 1.0 / 60.0;

    fn spawn_ledge(arena: &mut Arena, physics: &mut ArcadePhysics, kind: PlatformKind) -> EntityId {
        let pos = Vec2::new(150.0, 200.0);
        let size = Vec2::new(80.0, 16.0);
        let body = physics.add_body(BodyDesc::fixed(pos, size));
        arena.insert(
            EntityKind::Platform(Platform { kind, active: true }),
            Some(body),
            pos,
            size,
        )
    }

    fn spawn_enemy(
        arena: &mut Arena,
        physics: &mut ArcadePhysics,
        home: EntityId,
        patrol: Patrol,
    ) -> EntityId {
        let pos = Vec2::new(150.0, 176.0);
        let size = Vec2::splat(24.0);
        let body = physics.add_body(
            BodyDesc::dynamic(pos, size).with_velocity(Vec2::new(patrol.sign() * 60.0, 0.0)),
        );
        let home_body = arena.get(home).and_then(|h| h.body).unwrap();
        physics.register_one_way_contact(body, home_body, ContactFilter::Always);
        arena.insert(EntityKind::Enemy(Enemy { home, patrol }), Some(body), pos, size)
    }

    #[test]
    fn test_ids_are_monotonic_and_lookup_works() {
        let mut arena = Arena::new();
        let a = arena.insert(EntityKind::Bullet, None, Vec2::ZERO, Vec2::ONE);
        let b = arena.insert(EntityKind::Bullet, None, Vec2::ZERO, Vec2::ONE);
        assert!(b > a);
        arena.remove(&[a]);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).map(|e| e.id), Some(b));
        let c = arena.insert(EntityKind::Bullet, None, Vec2::ZERO, Vec2::ONE);
        assert!(c > b);
    }

    #[test]
    fn test_break_only_affects_breakable_and_is_idempotent() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let solid = spawn_ledge(&mut arena, &mut physics, PlatformKind::Solid);
        let brk = spawn_ledge(&mut arena, &mut physics, PlatformKind::Breakable);

        assert!(!arena.get_mut(solid).unwrap().break_platform(&mut physics));
        assert!(arena.get_mut(brk).unwrap().break_platform(&mut physics));
        assert!(!arena.get_mut(brk).unwrap().break_platform(&mut physics));

        let broken = arena.get(brk).unwrap();
        assert!(broken.destroyed);
        assert!(!broken.as_platform().unwrap().active);
        assert!(!physics.is_enabled(broken.body.unwrap()));
    }

    #[test]
    fn test_enemy_destroyed_when_home_destroyed() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let home = spawn_ledge(&mut arena, &mut physics, PlatformKind::Breakable);
        let enemy = spawn_enemy(&mut arena, &mut physics, home, Patrol::Left);

        assert!(arena.update_enemies(&mut physics, 60.0, 5.0).is_empty());
        arena.get_mut(home).unwrap().break_platform(&mut physics);
        assert_eq!(arena.update_enemies(&mut physics, 60.0, 5.0), vec![enemy]);
        assert!(arena.get(enemy).unwrap().destroyed);
    }

    #[test]
    fn test_enemy_destroyed_when_home_removed() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let home = spawn_ledge(&mut arena, &mut physics, PlatformKind::Solid);
        let enemy = spawn_enemy(&mut arena, &mut physics, home, Patrol::Right);

        arena.remove(&[home]);
        assert_eq!(arena.update_enemies(&mut physics, 60.0, 5.0), vec![enemy]);
    }

    #[test]
    fn test_enemy_patrol_reverses_at_edge() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(1000.0, 300.0);
        let home = spawn_ledge(&mut arena, &mut physics, PlatformKind::Solid);
        let enemy = spawn_enemy(&mut arena, &mut physics, home, Patrol::Right);

        let mut reversed = false;
        for _ in 0..120 {
            physics.step(DT);
            arena.update_enemies(&mut physics, 60.0, 5.0);
            let e = arena.get(enemy).unwrap();
            if e.as_enemy().unwrap().patrol == Patrol::Left {
                reversed = true;
                break;
            }
        }
        assert!(reversed);
        let body = arena.get(enemy).unwrap().body.unwrap();
        assert!(physics.velocity(body).unwrap().x < 0.0);
        // Still on the ledge
        assert!(physics.bounds(body).unwrap().right() <= 190.0 + 1.0);
    }
}
