//! Off-screen pruning, hard caps and the entity -> contact handle table
//!
//! Removal always releases engine contacts before the body goes away, so no
//! handler can fire on a freed entity.

use std::collections::BTreeMap;

use super::entity::{Arena, Entity, EntityId};
use super::physics::{ContactHandle, Physics};
use crate::tuning::LifecycleTuning;

/// What a `prune` pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Scrolled out above the view
    pub offscreen: usize,
    /// Already marked destroyed
    pub destroyed: usize,
    /// Removed by the platform cap
    pub evicted_platforms: usize,
    /// Removed by the enemy cap
    pub evicted_enemies: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.offscreen + self.destroyed + self.evicted_platforms + self.evicted_enemies
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    cfg: LifecycleTuning,
    contacts: BTreeMap<EntityId, Vec<ContactHandle>>,
}

impl Lifecycle {
    pub fn new(cfg: LifecycleTuning) -> Self {
        Self {
            cfg,
            contacts: BTreeMap::new(),
        }
    }

    /// Record a contact registration that references `id`
    pub fn attach(&mut self, id: EntityId, handle: ContactHandle) {
        self.contacts.entry(id).or_default().push(handle);
    }

    pub fn handles(&self, id: EntityId) -> &[ContactHandle] {
        self.contacts.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities with at least one tracked contact
    pub fn tracked(&self) -> usize {
        self.contacts.len()
    }

    /// Unregister every contact that references `id`. A pair shared with an
    /// already-released entity is simply unknown to physics by now.
    pub fn detach(&mut self, id: EntityId, physics: &mut impl Physics) -> usize {
        let Some(handles) = self.contacts.remove(&id) else {
            return 0;
        };
        handles.into_iter().filter(|h| physics.unregister(*h)).count()
    }

    /// Detach contacts, then drop the body
    pub fn release(&mut self, entity: &Entity, physics: &mut impl Physics) {
        self.detach(entity.id, physics);
        if let Some(body) = entity.body {
            physics.remove_body(body);
        }
    }

    /// Remove off-screen and destroyed entities, then enforce the hard caps
    /// by evicting the lowest-y (oldest) excess
    pub fn prune(
        &mut self,
        arena: &mut Arena,
        physics: &mut impl Physics,
        camera_top: f32,
    ) -> PruneReport {
        let cutoff = camera_top - self.cfg.offscreen_margin;
        let mut report = PruneReport::default();
        let mut doomed: Vec<EntityId> = Vec::new();

        for entity in arena.iter() {
            if entity.destroyed {
                report.destroyed += 1;
                doomed.push(entity.id);
            } else if entity.pos.y < cutoff {
                report.offscreen += 1;
                doomed.push(entity.id);
            }
        }

        let platforms = Self::over_cap(arena, &doomed, self.cfg.max_platforms, Entity::is_platform);
        let enemies = Self::over_cap(arena, &doomed, self.cfg.max_enemies, Entity::is_enemy);
        report.evicted_platforms = platforms.len();
        report.evicted_enemies = enemies.len();
        if !platforms.is_empty() || !enemies.is_empty() {
            log::warn!(
                "Emergency cleanup: evicted {} platforms, {} enemies",
                platforms.len(),
                enemies.len()
            );
        }
        doomed.extend(platforms);
        doomed.extend(enemies);

        if doomed.is_empty() {
            return report;
        }
        for entity in arena.remove(&doomed) {
            self.release(&entity, physics);
        }
        if report.total() > 5 {
            log::debug!("Pruned {} entities ({} remain)", report.total(), arena.len());
        }
        report
    }

    /// Survivors of the first pass beyond `cap`, lowest y (then oldest id) first
    fn over_cap(
        arena: &Arena,
        doomed: &[EntityId],
        cap: usize,
        is_kind: fn(&Entity) -> bool,
    ) -> Vec<EntityId> {
        let mut live: Vec<(f32, EntityId)> = arena
            .iter()
            .filter(|e| is_kind(e) && !doomed.contains(&e.id))
            .map(|e| (e.pos.y, e.id))
            .collect();
        if live.len() <= cap {
            return Vec::new();
        }
        live.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let excess = live.len() - cap;
        live.into_iter().take(excess).map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Enemy, EntityKind, Patrol, Platform, PlatformKind};
    use crate::sim::physics::{ArcadePhysics, BodyDesc, ContactFilter};
    use glam::Vec2;
    use proptest::prelude::*;

    const PLATFORM: Vec2 = Vec2::new(80.0, 16.0);

    fn add_platform(arena: &mut Arena, physics: &mut ArcadePhysics, y: f32) -> EntityId {
        let pos = Vec2::new(150.0, y);
        let body = physics.add_body(BodyDesc::fixed(pos, PLATFORM));
        arena.insert(
            EntityKind::Platform(Platform {
                kind: PlatformKind::Solid,
                active: true,
            }),
            Some(body),
            pos,
            PLATFORM,
        )
    }

    fn add_enemy(
        arena: &mut Arena,
        physics: &mut ArcadePhysics,
        home: EntityId,
        y: f32,
    ) -> EntityId {
        let pos = Vec2::new(150.0, y);
        let body = physics.add_body(BodyDesc::dynamic(pos, Vec2::splat(24.0)));
        arena.insert(
            EntityKind::Enemy(Enemy {
                home,
                patrol: Patrol::Left,
            }),
            Some(body),
            pos,
            Vec2::splat(24.0),
        )
    }

    #[test]
    fn test_cap_keeps_greatest_y() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let mut lifecycle = Lifecycle::new(LifecycleTuning::default());
        // Spawn out of y order so eviction order is not just id order
        for i in 0..35 {
            let y = ((i * 17) % 35) as f32 * 150.0;
            add_platform(&mut arena, &mut physics, y);
        }

        let report = lifecycle.prune(&mut arena, &mut physics, -10_000.0);
        assert_eq!(report.evicted_platforms, 5);
        assert_eq!(arena.platform_count(), 30);
        let min_y = arena.iter().map(|e| e.pos.y).fold(f32::INFINITY, f32::min);
        assert_eq!(min_y, 5.0 * 150.0);
        assert_eq!(physics.body_count(), 30);
    }

    #[test]
    fn test_offscreen_and_destroyed_are_removed_and_released() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let mut lifecycle = Lifecycle::new(LifecycleTuning::default());
        let player =
            physics.add_body(BodyDesc::dynamic(Vec2::new(150.0, 900.0), Vec2::splat(24.0)));

        let above = add_platform(&mut arena, &mut physics, 100.0);
        let visible = add_platform(&mut arena, &mut physics, 900.0);
        let broken = add_platform(&mut arena, &mut physics, 1000.0);
        for id in [above, visible, broken] {
            let body = arena.get(id).unwrap().body.unwrap();
            let h = physics.register_one_way_contact(player, body, ContactFilter::Always);
            lifecycle.attach(id, h);
        }
        arena.get_mut(broken).unwrap().destroy(&mut physics);

        // cutoff = 500 - 200 = 300
        let report = lifecycle.prune(&mut arena, &mut physics, 500.0);
        assert_eq!(report.offscreen, 1);
        assert_eq!(report.destroyed, 1);
        assert!(arena.get(above).is_none());
        assert!(arena.get(broken).is_none());
        assert!(arena.get(visible).is_some());
        assert_eq!(physics.contact_count(), 1);
        assert_eq!(lifecycle.tracked(), 1);
    }

    #[test]
    fn test_shared_contact_released_once() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let mut lifecycle = Lifecycle::new(LifecycleTuning::default());
        let home = add_platform(&mut arena, &mut physics, 500.0);
        let enemy = add_enemy(&mut arena, &mut physics, home, 476.0);
        let (eb, hb) = (
            arena.get(enemy).unwrap().body.unwrap(),
            arena.get(home).unwrap().body.unwrap(),
        );
        let h = physics.register_one_way_contact(eb, hb, ContactFilter::Always);
        lifecycle.attach(enemy, h);
        lifecycle.attach(home, h);

        assert_eq!(lifecycle.detach(home, &mut physics), 1);
        assert_eq!(lifecycle.detach(enemy, &mut physics), 0);
        assert_eq!(physics.contact_count(), 0);
    }

    #[test]
    fn test_enemy_cap() {
        let mut arena = Arena::new();
        let mut physics = ArcadePhysics::new(0.0, 300.0);
        let mut lifecycle = Lifecycle::new(LifecycleTuning::default());
        let home = add_platform(&mut arena, &mut physics, 0.0);
        for i in 0..20 {
            add_enemy(&mut arena, &mut physics, home, i as f32 * 10.0);
        }
        let report = lifecycle.prune(&mut arena, &mut physics, -10_000.0);
        assert_eq!(report.evicted_enemies, 5);
        assert_eq!(arena.enemy_count(), 15);
        assert!(arena.iter().filter(|e| e.is_enemy()).all(|e| e.pos.y >= 50.0));
    }

    proptest! {
        #[test]
        fn prune_never_exceeds_caps(ys in proptest::collection::vec(0.0f32..20_000.0, 0..80)) {
            let mut arena = Arena::new();
            let mut physics = ArcadePhysics::new(0.0, 300.0);
            let mut lifecycle = Lifecycle::new(LifecycleTuning::default());
            for y in &ys {
                add_platform(&mut arena, &mut physics, *y);
            }
            lifecycle.prune(&mut arena, &mut physics, -10_000.0);
            prop_assert_eq!(arena.platform_count(), ys.len().min(30));

            // Survivors are the greatest y values
            let mut sorted = ys.clone();
            sorted.sort_by(|a, b| b.total_cmp(a));
            if let Some(threshold) = sorted.get(29) {
                prop_assert!(arena.iter().all(|e| e.pos.y >= *threshold));
            }
        }
    }
}
