mod config;
mod error;
mod key;
mod pool;
mod shard;
mod simple;
mod store;
mod table;

pub use config::{Backend, MapConfig};
pub use error::{ConfigError, Result};
pub use key::ShardKey;
pub use pool::{
    next_log_base2, prev_log_base2, MapPool, PoolStats, Table, DEFAULT_MAP_SIZE,
    DEFAULT_POOL_DEPTH, MAX_MAP_POWER, MAX_MAP_SIZE,
};
pub use shard::{Shard, ShardStats, MAP_SHRINK_FACTOR};
pub use simple::{SimpleMap, SIMPLE_SHRINK_FACTOR};
pub use store::{ShardedMap, COMPACT_INTERVAL, MAP_SHARDS};
pub use table::NodeTable;


#[cfg(test)]
mod proptests;
