use std::hash::{BuildHasher, Hash};
use std::path::PathBuf;
use std::sync::Arc;

/// A key that can be routed to a shard.
///
/// The default routing hashes the key with the map's per-instance seed.
/// `u64` overrides it and routes on its own low bits, since node ids handed
/// out sequentially by the kernel bridge already spread evenly there.
pub trait ShardKey: Hash + Eq {
    #[inline(always)]
    fn route_hash<S: BuildHasher>(&self, seed: &S) -> u64 {
        seed.hash_one(self)
    }
}

impl ShardKey for u64 {
    #[inline(always)]
    fn route_hash<S: BuildHasher>(&self, _seed: &S) -> u64 {
        *self
    }
}

macro_rules! hashed_shard_key {
    ($($t:ty),* $(,)?) => {
        $(impl ShardKey for $t {})*
    };
}

hashed_shard_key!(
    u8, u16, u32, u128, usize, i8, i16, i32, i64, i128, isize, char, bool, String, Arc<str>,
    Vec<u8>, PathBuf,
);

impl ShardKey for &str {}
impl ShardKey for &[u8] {}
impl<A: ShardKey, B: ShardKey> ShardKey for (A, B) {}
