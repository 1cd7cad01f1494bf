// src/dag/concurrent_map.rs

//! A small sharded map used for state that many workers touch at once.
//!
//! Each key hashes to one shard, and each shard has its own `RwLock`, so two
//! tasks writing their outputs under different names rarely contend.

use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_SHARDS: usize = 16;

#[derive(Debug)]
pub struct ConcurrentMap<K, V> {
    shards: Vec<RwLock<HashMap<K, V>>>,
    hasher: RandomState,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a map with a fixed number of shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1)).map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Insert a value, returning the previous value for the key if any.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.write_shard(&key).insert(key, value)
    }

    /// Clone out the value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.read_shard(key).get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.read_shard(key).contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.write_shard(key).remove(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| read(s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| read(s).is_empty())
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            write(shard).clear();
        }
    }

    /// Snapshot of all keys. Not atomic across shards.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.shards
            .iter()
            .flat_map(|s| read(s).keys().cloned().collect::<Vec<_>>())
            .collect()
    }

    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    fn read_shard(&self, key: &K) -> RwLockReadGuard<'_, HashMap<K, V>> {
        read(&self.shards[self.shard_index(key)])
    }

    fn write_shard(&self, key: &K) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        write(&self.shards[self.shard_index(key)])
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// A panicking task body must not make every other task's output unreadable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
