//! Randomized-slot cache of pre-opened sessions

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::CacheContainer;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::factory::SessionFactory;

/// Uniform random slot index in `[0, capacity)`
fn random_slot(capacity: usize) -> usize {
    rand::thread_rng().gen_range(0..capacity)
}

/// A fixed-size rotating cache of pre-opened sessions
///
/// Amortizes session-opening latency by keeping `capacity` sessions warm in
/// randomly probed slots. Hits are approximate: a checkout probes one random
/// slot, and a miss simply means the caller opens a fresh session instead.
/// A checked-out session is removed from its slot, so it has exactly one
/// owner until it is put back.
pub struct SessionPool<S> {
    factory: Arc<dyn SessionFactory<Session = S>>,
    container: CacheContainer<usize, S>,
    capacity: usize,
    auto_commit: bool,
}

impl<S> SessionPool<S>
where
    S: Send + 'static,
{
    /// Create an empty pool; call [`prefill`](Self::prefill) before serving.
    pub fn new(factory: Arc<dyn SessionFactory<Session = S>>, config: &PoolConfig) -> Self {
        info!(
            "Initializing session pool (capacity: {}, ttl: {} ms, policy: {})",
            config.capacity,
            config.ttl_ms,
            config.eviction_policy.as_str()
        );

        let container = CacheContainer::new(config.capacity, config.ttl(), config.eviction_policy)
            .with_evict_hook(Box::new(|slot: &usize, session: S| {
                debug!("Dropping displaced session from slot {}", slot);
                drop(session);
            }));

        Self {
            factory,
            container,
            capacity: config.capacity.max(1),
            auto_commit: config.auto_commit,
        }
    }

    /// Open one session per slot, synchronously, before the pool is ready.
    ///
    /// An open failure aborts the prefill and propagates; slots filled by
    /// earlier iterations keep their sessions.
    pub async fn prefill(&self) -> Result<(), PoolError> {
        for slot in 0..self.capacity {
            let session = self.factory.open(self.auto_commit).await?;
            self.container.put(slot, session);
        }
        info!("Prefilled session pool with {} sessions", self.capacity);
        Ok(())
    }

    /// Probe one random slot and check its session out, if any.
    ///
    /// Best effort: an empty or expired slot yields `None` and the caller
    /// falls back to the factory.
    pub fn checkout(&self) -> Option<S> {
        let slot = random_slot(self.capacity);
        let session = self.container.take(&slot);
        match &session {
            Some(_) => debug!("Checked session out of slot {}", slot),
            None => debug!("Cache miss on slot {}", slot),
        }
        session
    }

    /// Return a session to a random slot, displacing whatever was there
    pub fn put(&self, session: S) {
        let slot = random_slot(self.capacity);
        self.container.put(slot, session);
        debug!("Returned session to slot {}", slot);
    }

    /// Number of sessions currently cached
    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Factory handing out sequential session ids, optionally failing after
    /// a fixed number of opens
    struct StubFactory {
        opened: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl StubFactory {
        fn new() -> Self {
            Self {
                opened: AtomicUsize::new(0),
                fail_after: None,
            }
        }

        fn failing_after(opens: usize) -> Self {
            Self {
                opened: AtomicUsize::new(0),
                fail_after: Some(opens),
            }
        }

        fn open_count(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionFactory for StubFactory {
        type Session = usize;

        async fn open(&self, _auto_commit: bool) -> Result<usize, PoolError> {
            if let Some(limit) = self.fail_after {
                if self.opened.load(Ordering::SeqCst) >= limit {
                    return Err(PoolError::backend(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "session source unavailable",
                    )));
                }
            }
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn config(capacity: usize) -> PoolConfig {
        PoolConfig {
            capacity,
            ..PoolConfig::default()
        }
    }

    #[tokio::test]
    async fn test_prefill_fills_every_slot() {
        for capacity in [1, 3, 10] {
            let factory = Arc::new(StubFactory::new());
            let pool = SessionPool::new(factory.clone(), &config(capacity));

            pool.prefill().await.unwrap();

            assert_eq!(pool.len(), capacity);
            assert_eq!(factory.open_count(), capacity);
        }
    }

    #[tokio::test]
    async fn test_prefill_failure_keeps_earlier_slots() {
        let factory = Arc::new(StubFactory::failing_after(3));
        let pool = SessionPool::new(factory, &config(10));

        let result = pool.prefill().await;

        assert!(matches!(result, Err(PoolError::Backend(_))));
        // no rollback of the slots opened before the failure
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn test_checkout_removes_the_session() {
        let factory = Arc::new(StubFactory::new());
        let pool = SessionPool::new(factory, &config(1));
        pool.prefill().await.unwrap();

        assert_eq!(pool.checkout(), Some(0));
        // single slot, already checked out
        assert_eq!(pool.checkout(), None);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_checked_out_sessions_are_exclusive() {
        let factory = Arc::new(StubFactory::new());
        let pool = SessionPool::new(factory, &config(10));
        pool.prefill().await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..100 {
            if let Some(session) = pool.checkout() {
                seen.push(session);
            }
        }

        let mut deduped = seen.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), seen.len());
    }

    #[tokio::test]
    async fn test_put_returns_session_to_the_cache() {
        let factory = Arc::new(StubFactory::new());
        let pool = SessionPool::new(factory, &config(1));

        assert!(pool.is_empty());
        pool.put(42);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.checkout(), Some(42));
    }

    #[test]
    fn test_random_slot_is_roughly_uniform() {
        let capacity = 10;
        let trials = 20_000;
        let mut counts = vec![0u32; capacity];

        for _ in 0..trials {
            counts[random_slot(capacity)] += 1;
        }

        // expected 2000 per slot; allow a wide statistical band
        for (slot, count) in counts.iter().enumerate() {
            assert!(
                (1600..=2400).contains(count),
                "slot {slot} drawn {count} times out of {trials}"
            );
        }
    }
}
