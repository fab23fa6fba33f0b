//! Cache eviction policies

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::container::CacheEntry;

/// Error type for parsing eviction policy
#[derive(Debug, Clone)]
pub struct ParseEvictionPolicyError(String);

impl fmt::Display for ParseEvictionPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid eviction policy: {}", self.0)
    }
}

impl std::error::Error for ParseEvictionPolicyError {}

/// Eviction policy for slot reuse when the container is full
///
/// Time-based expiry is orthogonal to the variant: every policy treats an
/// entry older than the container's TTL as absent on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// First In First Out - evict the entry inserted earliest
    #[default]
    Fifo,
    /// Least Recently Used - evict the entry accessed least recently
    Lru,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Lru => "lru",
        }
    }

    /// Pick the occupant to evict so a new key can be inserted.
    ///
    /// Returns `None` only when the map is empty. The policy never fails, it
    /// only decides; removal is the container's job.
    pub(crate) fn victim<K, V>(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K>
    where
        K: Clone,
    {
        let ranked = match self {
            EvictionPolicy::Fifo => entries.iter().min_by_key(|(_, e)| e.inserted_at),
            EvictionPolicy::Lru => entries.iter().min_by_key(|(_, e)| e.last_accessed),
        };
        ranked.map(|(key, _)| key.clone())
    }

    /// Whether an entry read at `now` has outlived `ttl`
    pub(crate) fn is_expired<V>(&self, entry: &CacheEntry<V>, now: Instant, ttl: Duration) -> bool {
        now.duration_since(entry.inserted_at) > ttl
    }
}

impl FromStr for EvictionPolicy {
    type Err = ParseEvictionPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(EvictionPolicy::Fifo),
            "lru" => Ok(EvictionPolicy::Lru),
            _ => Err(ParseEvictionPolicyError(s.to_string())),
        }
    }
}
