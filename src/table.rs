/// The lookup contract shared by both backends.
///
/// Values are handles: the table clones them in and out but never owns the
/// node they point at.
pub trait NodeTable<K, V>: Send + Sync {
    /// Looks up `key`.
    ///
    /// [`SimpleMap`](crate::SimpleMap) cannot tell a missing key from one
    /// stored with `V::default()`, so its implementation always answers
    /// `Some`.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or silently overwrites.
    fn set(&self, key: K, value: V);

    /// Removes `key` if present; absent keys are a no-op.
    fn delete(&self, key: &K);

    /// Reclaims memory. May be rate limited by the backend.
    fn compact(&self);

    /// Number of live entries. Best effort under concurrent writes.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
