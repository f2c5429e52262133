use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::trace;

/// Backing table of a shard.
pub type Table<K, V> = HashMap<K, V, RandomState>;

/// Largest size class tracked by the pool, as a power of two.
pub const MAX_MAP_POWER: u32 = 20;
/// Largest table the pool will hand out from, or take back into, a bucket.
pub const MAX_MAP_SIZE: usize = 1 << MAX_MAP_POWER;
/// Capacity requested for a fresh table when the caller asks for zero.
pub const DEFAULT_MAP_SIZE: usize = 32;
/// Tables retained per size class before extras are freed.
pub const DEFAULT_POOL_DEPTH: usize = 16;

#[inline]
pub(crate) fn new_table<K, V>(capacity: usize) -> Table<K, V> {
    HashMap::with_capacity_and_hasher(capacity, RandomState::new())
}

/// Log of base two, rounded up. `0` and `1` both map to `0`.
#[inline]
pub fn next_log_base2(v: usize) -> u32 {
    if v <= 1 {
        0
    } else {
        (v - 1).ilog2() + 1
    }
}

/// Log of base two, rounded down. `0` maps to `0`.
#[inline]
pub fn prev_log_base2(v: usize) -> u32 {
    if v == 0 {
        0
    } else {
        v.ilog2()
    }
}

/// Free list for one size class.
struct Bucket<K, V> {
    tx: Sender<Table<K, V>>,
    rx: Receiver<Table<K, V>>,
}

impl<K, V> Bucket<K, V> {
    fn new(depth: usize) -> Self {
        let (tx, rx) = bounded(depth);
        Self { tx, rx }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// `get` calls served from a bucket.
    pub hits: u64,
    /// `get` calls that fell through to a fresh bucket-sized table.
    pub misses: u64,
    /// `get` calls too large for any bucket.
    pub untracked: u64,
    /// Tables accepted back by `put`.
    pub recycled: u64,
    /// Tables `put` refused: empty, oversized, or their bucket was full.
    pub discarded: u64,
    /// Tables currently waiting in buckets.
    pub pooled: usize,
}

/// Cache of cleared tables, bucketed by power-of-two size class.
///
/// Bucket `i` holds tables that held roughly `2^i` entries when they were
/// returned. Each bucket is a bounded queue: once it holds `depth` tables,
/// further returns to that class are dropped on the spot. Reuse is best
/// effort and never needed for correctness.
pub struct MapPool<K, V> {
    default_size: usize,
    max_size: usize,
    buckets: Box<[Bucket<K, V>]>,
    hits: AtomicU64,
    misses: AtomicU64,
    untracked: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
}

impl<K, V> MapPool<K, V>
where
    K: Eq + std::hash::Hash,
{
    pub fn new(default_size: usize, max_size: usize) -> Self {
        Self::with_depth(default_size, max_size, DEFAULT_POOL_DEPTH)
    }

    pub fn with_depth(default_size: usize, max_size: usize, depth: usize) -> Self {
        let buckets: Box<[Bucket<K, V>]> = (0..=MAX_MAP_POWER)
            .map(|_| Bucket::new(depth))
            .collect();

        Self {
            default_size,
            max_size,
            buckets,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            untracked: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn default_size(&self) -> usize {
        self.default_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns an empty table able to hold about `length` entries.
    ///
    /// `0` asks for the default size. Never fails: anything the buckets
    /// cannot serve is allocated directly.
    pub fn get(&self, length: usize) -> Table<K, V> {
        let length = if length == 0 { self.default_size } else { length };

        if length > self.max_size {
            self.untracked.fetch_add(1, Ordering::Relaxed);
            return new_table(length);
        }

        let idx = next_log_base2(length) as usize;
        let Some(bucket) = self.buckets.get(idx) else {
            self.untracked.fetch_add(1, Ordering::Relaxed);
            return new_table(length);
        };

        if let Ok(table) = bucket.rx.try_recv() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(class = idx, "pool hit");
            return table;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(class = idx, "pool miss");
        new_table(1 << idx)
    }

    /// Hands a table back to the pool. The table is classified by its
    /// current length, then cleared with its allocation kept.
    pub fn put(&self, mut table: Table<K, V>) {
        let len = table.len();
        if len == 0 || len > self.max_size {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let idx = prev_log_base2(len) as usize;
        let Some(bucket) = self.buckets.get(idx) else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        };

        table.clear();
        match bucket.tx.try_send(table) {
            Ok(()) => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                trace!(class = idx, "pool bucket full, table freed");
            }
        }
    }

    pub fn pooled(&self) -> usize {
        self.buckets.iter().map(|b| b.rx.len()).sum()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            untracked: self.untracked.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            pooled: self.pooled(),
        }
    }
}
