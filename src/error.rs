use thiserror::Error;

/// Rejected table configuration.
///
/// Per-key operations never fail; only building a table from a
/// [`MapConfig`](crate::MapConfig) can.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("shard count must be a non-zero power of two, got {0}")]
    ShardCountNotPowerOfTwo(usize),

    #[error("shrink factor must be at least 1")]
    ZeroShrinkFactor,

    #[error("max size must be at least 1")]
    ZeroMaxSize,

    #[error("default size {default_size} exceeds max size {max_size}")]
    DefaultExceedsMax { default_size: usize, max_size: usize },

    #[error("invalid table config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
