use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::pool::{MapPool, Table};

/// Shrink when the live count falls below `1 / MAP_SHRINK_FACTOR` of the
/// high-water mark.
pub const MAP_SHRINK_FACTOR: usize = 8;

/// Point-in-time view of one shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardStats {
    pub present: bool,
    pub count: usize,
    pub count_high: usize,
    pub capacity: usize,
}

struct ShardState<K, V> {
    entries: Option<Table<K, V>>,
    count: usize,
    count_high: usize,
}

/// One lock-guarded partition of a [`ShardedMap`](crate::ShardedMap).
///
/// The backing table is borrowed from the shared pool on the first `set`
/// and handed back when the shard drains or shrinks.
pub struct Shard<K, V> {
    state: RwLock<ShardState<K, V>>,
    pool: Arc<MapPool<K, V>>,
    shrink_factor: usize,
}

impl<K, V> Shard<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(pool: Arc<MapPool<K, V>>) -> Self {
        Self::with_shrink_factor(pool, MAP_SHRINK_FACTOR)
    }

    pub fn with_shrink_factor(pool: Arc<MapPool<K, V>>, shrink_factor: usize) -> Self {
        Self {
            state: RwLock::new(ShardState {
                entries: None,
                count: 0,
                count_high: 0,
            }),
            pool,
            shrink_factor: shrink_factor.max(1),
        }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        let state = self.state.read();
        state.entries.as_ref()?.get(key).cloned()
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        let state = self.state.read();
        state
            .entries
            .as_ref()
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Inserts or silently overwrites `key`.
    pub fn set(&self, key: K, value: V) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let entries = state
            .entries
            .get_or_insert_with(|| self.pool.get(self.pool.default_size()));

        if entries.insert(key, value).is_none() {
            state.count += 1;
        }
        if state.count > state.count_high {
            state.count_high = state.count;
        }
        debug_assert_eq!(state.count, entries.len());
    }

    /// Removes `key` and, if it was present, runs [`compact`](Self::compact)
    /// in a separate critical section.
    pub fn delete(&self, key: &K) {
        {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let Some(entries) = state.entries.as_mut() else {
                return;
            };
            if entries.remove(key).is_none() {
                return;
            }
            state.count -= 1;
            debug_assert!(state.count <= state.count_high);
        }

        self.compact();
    }

    /// Releases the table of a drained shard, or moves the live entries
    /// into a smaller table once the shard has fallen well below its peak.
    /// After a shrink the new peak is the size requested for the new table.
    pub fn compact(&self) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.count == 0 {
            if let Some(entries) = state.entries.take() {
                debug!(capacity = entries.capacity(), "shard drained, releasing table");
                self.pool.put(entries);
            }
            state.count_high = 0;
            return;
        }

        if state.count > self.pool.max_size() {
            return;
        }

        if state.count.saturating_mul(self.shrink_factor) >= state.count_high {
            return;
        }

        let Some(old) = state.entries.take() else {
            return;
        };

        let target = state.count * 2;
        let mut entries = self.pool.get(target);
        entries.extend(old.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(
            count = state.count,
            count_high = state.count_high,
            old_capacity = old.capacity(),
            new_capacity = entries.capacity(),
            "shrinking shard table"
        );

        self.pool.put(old);
        state.count = entries.len();
        state.count_high = target;
        state.entries = Some(entries);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.state.read().count
    }

    pub fn stats(&self) -> ShardStats {
        let state = self.state.read();
        ShardStats {
            present: state.entries.is_some(),
            count: state.count,
            count_high: state.count_high,
            capacity: state.entries.as_ref().map_or(0, |e| e.capacity()),
        }
    }
}
