use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::key::ShardKey;
use crate::pool::{DEFAULT_MAP_SIZE, DEFAULT_POOL_DEPTH, MAX_MAP_SIZE};
use crate::shard::MAP_SHRINK_FACTOR;
use crate::simple::SimpleMap;
use crate::store::{ShardedMap, COMPACT_INTERVAL, MAP_SHARDS};
use crate::table::NodeTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sharded,
    Simple,
}

/// Tuning knobs for a node table.
///
/// ```toml
/// backend = "sharded"
/// shard_count = 64
/// default_size = 32
/// compact_interval_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub backend: Backend,
    pub shard_count: usize,
    pub default_size: usize,
    pub max_size: usize,
    pub shrink_factor: usize,
    #[serde(rename = "compact_interval_secs", with = "secs")]
    pub compact_interval: Duration,
    pub pool_depth: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sharded,
            shard_count: MAP_SHARDS,
            default_size: DEFAULT_MAP_SIZE,
            max_size: MAX_MAP_SIZE,
            shrink_factor: MAP_SHRINK_FACTOR,
            compact_interval: COMPACT_INTERVAL,
            pool_depth: DEFAULT_POOL_DEPTH,
        }
    }
}

impl MapConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: MapConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.shard_count.is_power_of_two() {
            return Err(ConfigError::ShardCountNotPowerOfTwo(self.shard_count));
        }
        if self.shrink_factor == 0 {
            return Err(ConfigError::ZeroShrinkFactor);
        }
        if self.max_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if self.default_size > self.max_size {
            return Err(ConfigError::DefaultExceedsMax {
                default_size: self.default_size,
                max_size: self.max_size,
            });
        }
        Ok(())
    }

    /// Builds the configured backend behind the common [`NodeTable`] contract.
    pub fn build<K, V>(&self) -> Result<Box<dyn NodeTable<K, V>>>
    where
        K: ShardKey + Clone + Send + Sync + 'static,
        V: Clone + Default + Send + Sync + 'static,
    {
        match self.backend {
            Backend::Sharded => Ok(Box::new(ShardedMap::with_config(self)?)),
            Backend::Simple => {
                self.validate()?;
                Ok(Box::new(SimpleMap::with_default_size(self.default_size)))
            }
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
