//! Keyed in-memory result cache with a TTL and a capacity bound.
//!
//! Expired entries are evicted lazily on `get`; there is no background
//! sweep. When a new key is inserted at capacity, the oldest inserted
//! entry is dropped first (insertion order is tracked in a `VecDeque`,
//! refreshed on overwrite).
//!
//! Methods take `&mut self`; share it behind a `Mutex`.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Default maximum number of cached results.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    /// `None` when now + TTL is past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// TTL + capacity bounded cache for clonable values.
#[derive(Debug)]
pub struct ResultCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    order: VecDeque<K>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            ttl,
            capacity,
        }
    }

    /// Returns the cached value while it is still before its expiry.
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove(key);
        }
        None
    }

    /// Insert or overwrite `key`, resetting its expiry to now + TTL.
    /// A TTL too large to add to the current instant never expires.
    pub fn set(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else {
            while self.entries.len() >= self.capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(self.ttl),
            },
        );
    }

    pub fn invalidate(&mut self, key: &K) {
        self.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn remove(&mut self, key: &K) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}
