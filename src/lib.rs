//! Session Cache
//!
//! A bounded, time-expiring cache of expensive-to-open sessions, fed by a
//! lazily initialized factory. The cache trades strict pool bookkeeping for
//! randomized slot probing: a checkout probes one slot, a miss falls back to
//! opening a fresh session, and returned sessions displace whatever occupies
//! a random slot. Initialization runs exactly once per manager, and its
//! outcome (ready or failed) is terminal.
//!
//! What kind of session gets pooled, and whether caching is enabled at all,
//! are the embedder's decisions, injected through the [`SessionFactory`],
//! [`FactoryBuilder`] and [`CacheSettings`] traits.

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod manager;
pub mod pool;

pub use cache::{CacheContainer, EvictionPolicy};
pub use config::{CacheSettings, PoolConfig, StaticSettings};
pub use error::{BackendError, PoolError};
pub use factory::{FactoryBuilder, SessionFactory};
pub use manager::{PoolState, SessionManager};
pub use pool::SessionPool;
