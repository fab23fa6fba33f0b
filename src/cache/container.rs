//! Bounded key/value container with per-entry TTL

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

use super::policy::EvictionPolicy;

/// A cached value plus the timestamps the eviction policies rank by
pub struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) inserted_at: Instant,
    pub(crate) last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            inserted_at: now,
            last_accessed: now,
        }
    }
}

/// Hook invoked with every value the container displaces
///
/// Covers eviction victims, values overwritten by `put` at an occupied key,
/// and expired entries dropped on read. Installing one lets resource-like
/// values get an explicit release instead of a silent drop.
pub type EvictHook<K, V> = Box<dyn Fn(&K, V) + Send + Sync>;

/// Capacity-bounded map with lazy per-entry expiry
///
/// Every operation takes `&self` and is atomic under an internal lock, so the
/// container can be shared across tasks without external synchronization.
/// There is no background sweeper; an entry past its TTL is discarded the
/// next time it is read.
pub struct CacheContainer<K, V> {
    capacity: usize,
    ttl: Duration,
    policy: EvictionPolicy,
    slots: Mutex<HashMap<K, CacheEntry<V>>>,
    on_evict: Option<EvictHook<K, V>>,
}

impl<K, V> CacheContainer<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a container. A zero capacity is clamped to one entry.
    pub fn new(capacity: usize, ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            policy,
            slots: Mutex::new(HashMap::new()),
            on_evict: None,
        }
    }

    /// Install a hook that receives every displaced value
    pub fn with_evict_hook(mut self, hook: EvictHook<K, V>) -> Self {
        self.on_evict = Some(hook);
        self
    }

    /// Insert or overwrite the entry at `key`, stamping its insertion time.
    ///
    /// Overwriting an occupied key never evicts a third entry. Inserting a
    /// new key into a full container first evicts the policy's victim. The
    /// container never exceeds its capacity after `put` returns.
    pub fn put(&self, key: K, value: V) {
        let displaced = {
            let mut slots = self.slots.lock();

            let overwritten = slots
                .remove(&key)
                .map(|entry| (key.clone(), entry.value));

            let victim = if overwritten.is_none() && slots.len() >= self.capacity {
                self.policy.victim(&slots).and_then(|victim_key| {
                    slots
                        .remove(&victim_key)
                        .map(|entry| (victim_key, entry.value))
                })
            } else {
                None
            };

            slots.insert(key, CacheEntry::new(value));
            overwritten.or(victim)
        };

        if let Some((displaced_key, displaced_value)) = displaced {
            self.displace(&displaced_key, displaced_value);
        }
    }

    /// Look up `key`, cloning the value out and refreshing its access time.
    ///
    /// An entry past the TTL is removed and reported absent.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        let stale = {
            let mut slots = self.slots.lock();
            let fresh = match slots.get(key) {
                Some(entry) => !self.policy.is_expired(entry, now, self.ttl),
                None => return None,
            };

            if fresh {
                if let Some(entry) = slots.get_mut(key) {
                    entry.last_accessed = now;
                    return Some(entry.value.clone());
                }
                return None;
            }
            slots.remove(key).map(|entry| entry.value)
        };

        if let Some(value) = stale {
            self.displace(key, value);
        }
        None
    }

    /// Look up `key`, removing the entry and handing the value to the caller.
    ///
    /// Same expiry rules as `get`; a taken value bypasses the evict hook
    /// since ownership transfers rather than being discarded.
    pub fn take(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let (value, expired) = {
            let mut slots = self.slots.lock();
            match slots.remove(key) {
                Some(entry) if self.policy.is_expired(&entry, now, self.ttl) => {
                    (None, Some(entry.value))
                }
                Some(entry) => (Some(entry.value), None),
                None => (None, None),
            }
        };

        if let Some(stale) = expired {
            self.displace(key, stale);
        }
        value
    }

    /// Remove the entry at `key`, returning its value regardless of age
    pub fn remove(&self, key: &K) -> Option<V> {
        self.slots.lock().remove(key).map(|entry| entry.value)
    }

    /// Number of entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Drop every entry, sending each value through the evict hook
    pub fn clear(&self) {
        let drained: Vec<(K, CacheEntry<V>)> = self.slots.lock().drain().collect();
        for (key, entry) in drained {
            self.displace(&key, entry.value);
        }
    }

    fn displace(&self, key: &K, value: V) {
        debug!("Displacing cached entry");
        match &self.on_evict {
            Some(hook) => hook(key, value),
            None => drop(value),
        }
    }
}
