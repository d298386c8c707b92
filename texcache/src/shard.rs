//! Sharded ordered index from cache key to entry
//!
//! Splits the key space across [`SHARD_COUNT`] ordered maps so that no single
//! lookup structure grows large. The shard is chosen by a pure selector
//! function; two instances exist, one per identity class.

use std::collections::BTreeMap;

use crate::error::{CacheError, Result};
use crate::key::{CacheKey, SHARD_COUNT, base_shard, variant_shard};

/// Shard selector function
pub type ShardSelector = fn(CacheKey) -> usize;

/// Ordered map from key to `V`, split into [`SHARD_COUNT`] shards
pub struct ShardIndex<V> {
    name: &'static str,
    selector: ShardSelector,
    shards: [BTreeMap<CacheKey, V>; SHARD_COUNT],
    len: usize,
}

impl<V> std::fmt::Debug for ShardIndex<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardIndex")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("shard_lens", &self.shard_lens())
            .finish()
    }
}

impl<V> ShardIndex<V> {
    pub fn new(name: &'static str, selector: ShardSelector) -> Self {
        Self {
            name,
            selector,
            shards: std::array::from_fn(|_| BTreeMap::new()),
            len: 0,
        }
    }

    /// Index for base identities (zero high bits)
    pub fn base() -> Self {
        Self::new("base", base_shard)
    }

    /// Index for variant identities (non-zero high bits)
    pub fn variant() -> Self {
        Self::new("variant", variant_shard)
    }

    /// Shard that holds (or would hold) `key`
    #[inline]
    pub fn shard_of(&self, key: CacheKey) -> usize {
        (self.selector)(key)
    }

    #[inline]
    pub fn find(&self, key: CacheKey) -> Option<&V> {
        self.shards[self.shard_of(key)].get(&key)
    }

    #[inline]
    pub fn find_mut(&mut self, key: CacheKey) -> Option<&mut V> {
        let shard = self.shard_of(key);
        self.shards[shard].get_mut(&key)
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.find(key).is_some()
    }

    /// Insert a new key, returning the shard it landed in
    ///
    /// Fails with [`CacheError::DuplicateKey`] if the key is already indexed;
    /// the existing value is left untouched.
    pub fn insert(&mut self, key: CacheKey, value: V) -> Result<usize> {
        let shard = self.shard_of(key);
        let map = &mut self.shards[shard];
        if map.contains_key(&key) {
            return Err(CacheError::DuplicateKey(key));
        }
        map.insert(key, value);
        self.len += 1;
        Ok(shard)
    }

    /// Remove a key using an already-known shard id
    ///
    /// Callers that stored the shard at insert time skip re-deriving it.
    pub fn remove_in(&mut self, shard: usize, key: CacheKey) -> Option<V> {
        debug_assert_eq!(shard, self.shard_of(key), "{} index: stale shard id", self.name);
        let removed = self.shards[shard].remove(&key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn remove(&mut self, key: CacheKey) -> Option<V> {
        let shard = self.shard_of(key);
        self.remove_in(shard, key)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of keys in each shard
    pub fn shard_lens(&self) -> [usize; SHARD_COUNT] {
        std::array::from_fn(|i| self.shards[i].len())
    }

    /// Iterate over all entries, shard by shard, in key order within a shard
    pub fn iter(&self) -> impl Iterator<Item = (CacheKey, &V)> {
        self.shards
            .iter()
            .flat_map(|shard| shard.iter().map(|(&k, v)| (k, v)))
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<(CacheKey, V)> {
        let mut out = Vec::with_capacity(self.len);
        for shard in self.shards.iter_mut() {
            out.extend(std::mem::take(shard));
        }
        self.len = 0;
        out
    }

    pub fn clear(&mut self) {
        for shard in self.shards.iter_mut() {
            shard.clear();
        }
        self.len = 0;
    }
}
