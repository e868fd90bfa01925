//! Cancellable deferred actions on simulated time

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Handle returned by [`Timers::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// What to do when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Bounce lock cooldown elapsed
    UnlockBounce,
    /// Player may shoot again
    ResetShoot,
    /// Bullet lifetime elapsed
    ExpireBullet(EntityId),
    /// Solid-landing cooldown elapsed
    ReleaseLanding,
}

#[derive(Debug, Clone)]
struct Pending {
    handle: TimerHandle,
    due_ms: f64,
    action: DeferredAction,
}

/// Timer queue driven by the simulation tick
#[derive(Debug, Clone, Default)]
pub struct Timers {
    now_ms: f64,
    pending: Vec<Pending>,
    next: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: f64, action: DeferredAction) -> TimerHandle {
        self.next += 1;
        let handle = TimerHandle(self.next);
        self.pending.push(Pending {
            handle,
            due_ms: self.now_ms + delay_ms.max(0.0),
            action,
        });
        handle
    }

    /// Returns false if the timer already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advance simulated time and return every action that came due,
    /// ordered by due time then scheduling order
    pub fn advance(&mut self, dt_ms: f64) -> Vec<(TimerHandle, DeferredAction)> {
        self.now_ms += dt_ms;
        let now = self.now_ms;

        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due_ms <= now {
                due.push(p.clone());
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.handle.cmp(&b.handle)));
        due.into_iter().map(|p| (p.handle, p.action)).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.now_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_when_due() {
        let mut timers = Timers::new();
        let handle = timers.schedule(600.0, DeferredAction::UnlockBounce);

        assert!(timers.advance(599.0).is_empty());
        assert_eq!(timers.advance(1.0), vec![(handle, DeferredAction::UnlockBounce)]);
        assert!(timers.advance(1000.0).is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = Timers::new();
        let handle = timers.schedule(100.0, DeferredAction::ResetShoot);
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(timers.advance(500.0).is_empty());
    }

    #[test]
    fn test_due_order() {
        let mut timers = Timers::new();
        let late = timers.schedule(300.0, DeferredAction::ReleaseLanding);
        let early = timers.schedule(200.0, DeferredAction::ResetShoot);
        let fired = timers.advance(400.0);
        assert_eq!(
            fired,
            vec![
                (early, DeferredAction::ResetShoot),
                (late, DeferredAction::ReleaseLanding)
            ]
        );
    }
}
