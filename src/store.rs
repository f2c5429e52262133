use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ahash::RandomState;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::MapConfig;
use crate::error::Result;
use crate::key::ShardKey;
use crate::pool::{MapPool, PoolStats};
use crate::shard::{Shard, ShardStats};
use crate::table::NodeTable;

/// Default number of shards. Must be a power of two.
pub const MAP_SHARDS: usize = 32;
/// Minimum spacing between two map-wide compactions.
pub const COMPACT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Node id to node handle map, split into independently locked shards that
/// share one table pool.
///
/// Single-key operations touch exactly one shard. [`compact`](Self::compact)
/// and [`count`](Self::count) fan out over all shards on the rayon pool;
/// neither ever holds two shard locks at once.
pub struct ShardedMap<K, V> {
    shards: Box<[Shard<K, V>]>,
    shard_mask: usize,
    seed: RandomState,
    pool: Arc<MapPool<K, V>>,
    compact_interval: Duration,
    last_compact: Mutex<Option<Instant>>,
    compaction_enabled: AtomicBool,
}

impl<K, V> ShardedMap<K, V>
where
    K: ShardKey + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_shards(MAP_SHARDS)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        assert!(shard_count > 0);
        assert!(shard_count.is_power_of_two());

        let config = MapConfig {
            shard_count,
            ..MapConfig::default()
        };
        Self::build(&config)
    }

    pub fn with_config(config: &MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &MapConfig) -> Self {
        let pool = Arc::new(MapPool::with_depth(
            config.default_size,
            config.max_size,
            config.pool_depth,
        ));

        let shards: Box<[Shard<K, V>]> = (0..config.shard_count)
            .map(|_| Shard::with_shrink_factor(Arc::clone(&pool), config.shrink_factor))
            .collect();

        Self {
            shards,
            shard_mask: config.shard_count - 1,
            seed: RandomState::new(),
            pool,
            compact_interval: config.compact_interval,
            last_compact: Mutex::new(None),
            compaction_enabled: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    pub fn shard_index(&self, key: &K) -> usize {
        let idx = (key.route_hash(&self.seed) as usize) & self.shard_mask;
        debug_assert!(idx < self.shards.len());
        idx
    }

    #[inline(always)]
    fn shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[self.shard_index(key)]
    }

    #[inline(always)]
    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).contains_key(key)
    }

    #[inline(always)]
    pub fn set(&self, key: K, value: V) {
        self.shard(&key).set(key, value)
    }

    #[inline]
    pub fn delete(&self, key: &K) {
        self.shard(key).delete(key)
    }

    /// Compacts every shard, at most once per compaction interval.
    ///
    /// Returns `false` when skipped because the previous run was too recent.
    pub fn compact(&self) -> bool {
        {
            let mut last = self.last_compact.lock();
            if let Some(at) = *last {
                let since = at.elapsed();
                if since < self.compact_interval {
                    debug!(?since, "map compaction skipped, interval not elapsed");
                    return false;
                }
            }
            *last = Some(Instant::now());
        }

        self.compact_shards();
        true
    }

    /// Compacts every shard now, ignoring and restarting the interval.
    pub fn force_compact(&self) {
        *self.last_compact.lock() = Some(Instant::now());
        self.compact_shards();
    }

    fn compact_shards(&self) {
        let started = Instant::now();
        self.shards.par_iter().for_each(|shard| shard.compact());
        debug!(
            shards = self.shards.len(),
            elapsed = ?started.elapsed(),
            "map compaction finished"
        );
    }

    /// Sum of all shard counts. Not an atomic snapshot across shards.
    pub fn count(&self) -> usize {
        self.shards.par_iter().map(|shard| shard.count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// When the last map-wide compaction started, if any has run.
    pub fn last_compaction(&self) -> Option<Instant> {
        *self.last_compact.lock()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_stats(&self) -> Vec<ShardStats> {
        self.shards.iter().map(|shard| shard.stats()).collect()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl<K, V> ShardedMap<K, V>
where
    K: ShardKey + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawns a thread that calls [`compact`](Self::compact) every `tick`.
    ///
    /// The cool-down still applies, so a `tick` shorter than the compaction
    /// interval only makes the thread notice an elapsed interval sooner.
    ///
    /// The thread holds an `Arc` to the map until
    /// [`stop_background_compaction`](Self::stop_background_compaction) is
    /// called; it exits on its next tick after that.
    pub fn start_background_compaction(self: Arc<Self>, tick: Duration) -> thread::JoinHandle<()> {
        self.compaction_enabled.store(true, Ordering::Release);
        info!(?tick, interval = ?self.compact_interval, "background compaction started");

        thread::spawn(move || loop {
            thread::sleep(tick);

            if !self.compaction_enabled.load(Ordering::Acquire) {
                info!("background compaction stopped");
                break;
            }

            self.compact();
        })
    }

    pub fn stop_background_compaction(&self) {
        self.compaction_enabled.store(false, Ordering::Release);
    }
}

impl<K, V> Default for ShardedMap<K, V>
where
    K: ShardKey + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeTable<K, V> for ShardedMap<K, V>
where
    K: ShardKey + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        ShardedMap::get(self, key)
    }

    fn set(&self, key: K, value: V) {
        ShardedMap::set(self, key, value)
    }

    fn delete(&self, key: &K) {
        ShardedMap::delete(self, key)
    }

    fn compact(&self) {
        ShardedMap::compact(self);
    }

    fn count(&self) -> usize {
        ShardedMap::count(self)
    }
}
