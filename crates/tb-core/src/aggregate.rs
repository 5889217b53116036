//! Assigning events to buckets and folding them into per-bucket aggregates.
//!
//! Aggregation is a pure fold: every call produces a fresh vector with one
//! accumulator per bucket, indexed by bucket position.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::calendar::Bucket;
use crate::event::{InventoryAction, InventoryEvent, Timestamped, VisitEvent};

/// Added/removed unit counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryTally {
    pub added: u64,
    pub removed: u64,
}

impl InventoryTally {
    /// Folds one inventory event into the tally. Unrecognized actions are ignored.
    pub fn record(&mut self, event: &InventoryEvent) {
        match event.kind() {
            Some(InventoryAction::Added) => self.added += u64::from(event.count),
            Some(InventoryAction::Removed) => self.removed += u64::from(event.count),
            None => {
                tracing::trace!(action = %event.action, "ignoring unrecognized inventory action");
            }
        }
    }

    /// Signed change in product count over the bucket.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn delta(&self) -> i64 {
        self.added as i64 - self.removed as i64
    }
}

/// Returns the index of the bucket containing `instant`.
///
/// `buckets` must be ordered and contiguous, as produced by
/// [`generate_buckets`](crate::generate_buckets).
pub fn bucket_index(buckets: &[Bucket], instant: DateTime<Utc>) -> Option<usize> {
    let idx = buckets.partition_point(|bucket| bucket.end < instant);
    buckets
        .get(idx)
        .filter(|bucket| bucket.contains(instant))
        .map(|_| idx)
}

/// Assigns each event to its bucket and folds it into that bucket's accumulator.
///
/// Events outside every bucket are dropped. Event order does not matter.
pub fn assign<'e, E, A, F>(events: &'e [E], buckets: &[Bucket], mut fold: F) -> Vec<A>
where
    E: Timestamped,
    A: Default,
    F: FnMut(&mut A, &'e E),
{
    let mut slots: Vec<A> = buckets.iter().map(|_| A::default()).collect();
    let mut dropped = 0usize;
    for event in events {
        match bucket_index(buckets, event.occurred_at()) {
            Some(idx) => fold(&mut slots[idx], event),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::trace!(dropped, "events fell outside all buckets");
    }
    slots
}

/// Per-bucket added/removed tallies.
pub fn tally_inventory(events: &[InventoryEvent], buckets: &[Bucket]) -> Vec<InventoryTally> {
    assign(events, buckets, InventoryTally::record)
}

/// Per-bucket count of distinct sessions.
///
/// A session seen in two buckets counts once in each.
pub fn unique_visitors_per_bucket(events: &[VisitEvent], buckets: &[Bucket]) -> Vec<usize> {
    assign::<_, HashSet<&str>, _>(events, buckets, |seen, visit| {
        seen.insert(visit.session_id.as_str());
    })
    .iter()
    .map(HashSet::len)
    .collect()
}

/// Count of distinct sessions across all `events`, regardless of buckets.
pub fn distinct_sessions(events: &[VisitEvent]) -> usize {
    events
        .iter()
        .map(|visit| visit.session_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}
