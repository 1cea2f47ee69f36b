//! Time-ordered queue of deferred attack resolutions.
//!
//! Timeline wind-ups schedule a `ResolveHit` continuation here; the engine
//! drains due entries once per tick. Ties on fire time resolve in
//! scheduling order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use lanewar_core::types::UnitId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledHit {
    pub fire_at: f64,
    pub attacker: UnitId,
    /// Issue time of the intent this entry resolves. A newer intent makes
    /// the entry stale.
    pub issued_at: f64,
    seq: u64,
}

impl Eq for ScheduledHit {}

impl Ord for ScheduledHit {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest first.
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct HitSchedule {
    queue: BinaryHeap<ScheduledHit>,
    next_seq: u64,
}

impl HitSchedule {
    pub fn schedule(&mut self, fire_at: f64, attacker: UnitId, issued_at: f64) {
        self.queue.push(ScheduledHit {
            fire_at,
            attacker,
            issued_at,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Remove and return every entry due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledHit> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|next| next.fire_at <= now) {
            if let Some(hit) = self.queue.pop() {
                due.push(hit);
            }
        }
        due
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
