use std::hash::Hash;

use parking_lot::RwLock;
use tracing::debug;

use crate::pool::{new_table, Table, DEFAULT_MAP_SIZE};
use crate::shard::ShardStats;
use crate::table::NodeTable;

/// Shrink only when the live count drops under 1% of the high-water mark.
pub const SIMPLE_SHRINK_FACTOR: usize = 100;

struct SimpleState<K, V> {
    entries: Table<K, V>,
    count: usize,
    count_high: usize,
}

/// Single-lock, unpooled baseline backend.
///
/// Same per-key contract as [`ShardedMap`](crate::ShardedMap), but every
/// resize allocates a new table and the old one is simply dropped. Shrinking
/// waits until the table is nearly empty and is not capped by any maximum
/// size.
///
/// `get` returns the stored value or `V::default()`; a caller cannot tell an
/// absent key from a key stored with the default value.
pub struct SimpleMap<K, V> {
    state: RwLock<SimpleState<K, V>>,
    default_size: usize,
}

impl<K, V> SimpleMap<K, V>
where
    K: Hash + Eq,
    V: Clone + Default,
{
    pub fn new() -> Self {
        Self::with_default_size(DEFAULT_MAP_SIZE)
    }

    pub fn with_default_size(default_size: usize) -> Self {
        Self {
            state: RwLock::new(SimpleState {
                entries: new_table(default_size),
                count: 0,
                count_high: 0,
            }),
            default_size,
        }
    }

    pub fn get(&self, key: &K) -> V {
        self.state.read().entries.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&self, key: K, value: V) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.entries.insert(key, value).is_none() {
            state.count += 1;
        }
        if state.count > state.count_high {
            state.count_high = state.count;
        }
    }

    pub fn delete(&self, key: &K) {
        {
            let mut guard = self.state.write();
            let state = &mut *guard;

            if state.entries.remove(key).is_none() {
                return;
            }
            state.count -= 1;
        }

        self.compact();
    }

    /// After a shrink the new peak is the size requested for the new table.
    pub fn compact(&self) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.count == 0 {
            state.entries = new_table(self.default_size);
            state.count_high = 0;
            return;
        }

        if state.count.saturating_mul(SIMPLE_SHRINK_FACTOR) >= state.count_high {
            return;
        }

        let target = state.count * 2;
        let mut entries = new_table(target);
        entries.extend(state.entries.drain());

        debug!(
            count = state.count,
            count_high = state.count_high,
            new_capacity = entries.capacity(),
            "reallocating simple map table"
        );

        state.count = entries.len();
        state.count_high = target;
        state.entries = entries;
    }

    pub fn count(&self) -> usize {
        self.state.read().count
    }

    pub fn stats(&self) -> ShardStats {
        let state = self.state.read();
        ShardStats {
            present: true,
            count: state.count,
            count_high: state.count_high,
            capacity: state.entries.capacity(),
        }
    }
}

impl<K, V> Default for SimpleMap<K, V>
where
    K: Hash + Eq,
    V: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeTable<K, V> for SimpleMap<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Clone + Default + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        Some(SimpleMap::get(self, key))
    }

    fn set(&self, key: K, value: V) {
        SimpleMap::set(self, key, value)
    }

    fn delete(&self, key: &K) {
        SimpleMap::delete(self, key)
    }

    fn compact(&self) {
        SimpleMap::compact(self)
    }

    fn count(&self) -> usize {
        SimpleMap::count(self)
    }
}
