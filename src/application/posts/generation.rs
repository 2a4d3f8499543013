//! Per-post write counters that keep background cache fills from
//! resurrecting a snapshot an update or delete already invalidated.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::entities::PostId;

const DEFAULT_SLOTS: usize = 1024;

/// Fixed number of counters shared by hashing the id. Two ids landing on the
/// same slot only cost a skipped fill.
#[derive(Clone)]
pub(crate) struct WriteGenerations {
    slots: Arc<[AtomicU64]>,
}

impl WriteGenerations {
    pub(crate) fn new(slots: usize) -> Self {
        let slots = (0..slots.max(1)).map(|_| AtomicU64::new(0)).collect();
        Self { slots }
    }

    fn slot(&self, id: PostId) -> &AtomicU64 {
        let index = id.rem_euclid(self.slots.len() as i64) as usize;
        &self.slots[index]
    }

    /// Snapshot taken before reading the store of record.
    pub(crate) fn current(&self, id: PostId) -> u64 {
        self.slot(id).load(Ordering::Acquire)
    }

    /// Must run after the store write committed and before its cache
    /// invalidation is dispatched.
    pub(crate) fn bump(&self, id: PostId) {
        self.slot(id).fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn unchanged_since(&self, id: PostId, observed: u64) -> bool {
        self.current(id) == observed
    }
}

impl Default for WriteGenerations {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_invalidates_earlier_snapshots() {
        let generations = WriteGenerations::default();
        let observed = generations.current(7);
        assert!(generations.unchanged_since(7, observed));

        generations.bump(7);
        assert!(!generations.unchanged_since(7, observed));
        assert!(generations.unchanged_since(7, generations.current(7)));
    }

    #[test]
    fn other_slots_are_untouched() {
        let generations = WriteGenerations::new(4);
        let observed = generations.current(1);
        generations.bump(2);
        assert!(generations.unchanged_since(1, observed));

        // 5 shares a slot with 1.
        generations.bump(5);
        assert!(!generations.unchanged_since(1, observed));
    }
}
