//! Generic store contract
//!
//! Every persistent-ish container in the storage layer (range index,
//! reference graph, label registry) exposes this common surface so the
//! marshalling layer can export and restore contents uniformly. A store for
//! which a generic operation is meaningless returns
//! [`Error::Unsupported`](crate::Error::Unsupported) — never a silent no-op.

use crate::error::Result;
use crate::watch::WatcherHandle;

/// Event fired after a successful whole-value `save`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent<K, V> {
    /// Key the value was saved under
    pub key: K,
    /// The value as saved
    pub value: V,
}

/// Common contract over keyed stores.
///
/// Pagination windows (`keys`, `values`) are deterministic and contiguous:
/// entries are visited in key order, `offset` entries are skipped, at most
/// `count` are returned, and an offset at or past the store size yields an
/// empty result. Offsets and counts are `usize`, so the negative-argument
/// failure mode of a looser type system is unrepresentable here.
pub trait Store {
    /// Key type; ordered so pagination is deterministic
    type Key: Clone + Ord;
    /// Stored value type
    type Value: Clone;

    /// Save a whole value under a key, replacing any previous value
    fn save(&mut self, key: Self::Key, value: Self::Value) -> Result<()>;

    /// Load the value stored under a key, if any
    fn load(&self, key: &Self::Key) -> Result<Option<Self::Value>>;

    /// Delete the entry for a key. Returns whether the key existed.
    fn delete(&mut self, key: &Self::Key) -> Result<bool>;

    /// Whether a key is present
    fn contains(&self, key: &Self::Key) -> bool;

    /// Number of entries
    fn len(&self) -> usize;

    /// True when the store holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A contiguous window of keys in key order
    fn keys(&self, offset: usize, count: usize) -> Vec<Self::Key>;

    /// A contiguous window of values in key order
    fn values(&self, offset: usize, count: usize) -> Vec<Self::Value>;

    /// Register a watcher fired after each state-changing `save`
    #[allow(clippy::type_complexity)]
    fn watch_save(
        &self,
        watcher: Box<dyn Fn(&SaveEvent<Self::Key, Self::Value>)>,
    ) -> Result<WatcherHandle<SaveEvent<Self::Key, Self::Value>>>;
}

/// Take the deterministic contiguous window `[offset, offset + count)` of an
/// ordered iterator. Shared by every `Store` implementation.
pub fn window<T>(iter: impl Iterator<Item = T>, offset: usize, count: usize) -> Vec<T> {
    iter.skip(offset).take(count).collect()
}
