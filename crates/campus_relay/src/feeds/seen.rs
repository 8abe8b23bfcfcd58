use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Ids a feed has already handed out, with the instant each was first seen.
///
/// Without a retention the set only grows for the life of the process.
pub struct SeenSet {
    entries: DashMap<u64, DateTime<Utc>>,
    retention: Option<TimeDelta>,
}

impl SeenSet {
    pub fn new(retention: Option<TimeDelta>) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
        }
    }

    /// Marks `id` as seen. Returns `false` if it already was.
    ///
    /// The check and the insert happen under one shard lock.
    pub fn insert_new(&self, id: u64, now: DateTime<Utc>) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Drops ids first seen more than the retention ago. No-op without a retention.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, seen_at| *seen_at >= cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
