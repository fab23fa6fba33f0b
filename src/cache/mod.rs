//! Cache container and eviction policies

mod container;
mod policy;

pub use container::{CacheContainer, CacheEntry, EvictHook};
pub use policy::{EvictionPolicy, ParseEvictionPolicyError};
