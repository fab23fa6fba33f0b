//! Pool configuration types and the settings collaborator
//!
//! Loading and persisting the configuration file is the embedding
//! application's concern; this crate only consumes the deserialized
//! `[pool]` section and a `CacheSettings` implementation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::EvictionPolicy;

/// Fixed pool configuration, decided at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of cache slots
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Per-entry time to live in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Slot reuse policy when the cache is full
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,
    /// Auto-commit flag passed to every factory open
    #[serde(default = "default_auto_commit")]
    pub auto_commit: bool,
    /// Upper bound on waiting for initialization to finish, in milliseconds.
    /// `None` waits without a deadline.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_ms: default_ttl_ms(),
            eviction_policy: EvictionPolicy::default(),
            auto_commit: default_auto_commit(),
            ready_timeout_ms: None,
        }
    }
}

impl PoolConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }
}

fn default_capacity() -> usize {
    10
}

fn default_ttl_ms() -> u64 {
    10_000
}

fn default_auto_commit() -> bool {
    true
}

/// Trait for the external configuration collaborator
///
/// The flag is read once per initialization pass and is not expected to
/// change afterwards.
pub trait CacheSettings: Send + Sync {
    /// Whether sessions should be cached at all
    fn caching_enabled(&self) -> bool;
}

/// A fixed-value `CacheSettings` for embedders without a config file,
/// and for tests
pub struct StaticSettings {
    caching_enabled: bool,
}

impl StaticSettings {
    pub fn new(caching_enabled: bool) -> Self {
        Self { caching_enabled }
    }
}

impl CacheSettings for StaticSettings {
    fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }
}
