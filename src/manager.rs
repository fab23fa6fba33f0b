//! Session manager: lazy one-shot factory initialization and session serving
//!
//! The manager is an explicitly constructed service. Embedders build one,
//! wrap it in an `Arc`, and hand it to whoever needs sessions; there is no
//! hidden global instance. Initialization happens on first use, exactly
//! once, and the outcome (`Ready` or `Failed`) is terminal for the life of
//! the process.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::{CacheSettings, PoolConfig};
use crate::error::PoolError;
use crate::factory::{FactoryBuilder, SessionFactory};
use crate::pool::SessionPool;

/// Published lifecycle state of the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolState {
    /// Factory not built yet (or a build is in flight)
    Building,
    /// Factory built; sessions can be served
    Ready,
    /// Factory construction failed; carries the reason. Terminal.
    Failed(String),
}

/// Everything published once initialization succeeds
struct ReadyParts<S> {
    factory: Arc<dyn SessionFactory<Session = S>>,
    pool: Option<Arc<SessionPool<S>>>,
}

/// Lazily initialized session source
///
/// The first caller to need a session spawns the factory build onto its own
/// task; every caller, first or not, then awaits the published outcome.
/// Because the build runs detached, a caller abandoning its wait (deadline
/// hit, future dropped) cannot cancel construction: the state always reaches
/// `Ready` or `Failed`. Once terminal, session serving takes no locks beyond
/// the container's own.
pub struct SessionManager<S> {
    builder: Arc<dyn FactoryBuilder<Session = S>>,
    settings: Arc<dyn CacheSettings>,
    config: PoolConfig,
    state_tx: Arc<watch::Sender<PoolState>>,
    parts: Arc<RwLock<Option<ReadyParts<S>>>>,
    build_started: AtomicBool,
}

impl<S> SessionManager<S>
where
    S: Send + 'static,
{
    pub fn new(
        builder: Arc<dyn FactoryBuilder<Session = S>>,
        settings: Arc<dyn CacheSettings>,
        config: PoolConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(PoolState::Building);
        Self {
            builder,
            settings,
            config,
            state_tx: Arc::new(state_tx),
            parts: Arc::new(RwLock::new(None)),
            build_started: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.state_tx.borrow().clone()
    }

    /// Watch channel for observers that want state transitions pushed
    pub fn subscribe(&self) -> watch::Receiver<PoolState> {
        self.state_tx.subscribe()
    }

    /// Drive initialization to a terminal state.
    ///
    /// Exactly one `FactoryBuilder::build()` ever runs, no matter how many
    /// concurrent callers arrive; it runs on a detached task and therefore
    /// reaches a terminal state even if every waiting caller gives up. A
    /// failed build is terminal: later calls return the same
    /// [`PoolError::Initialization`] without retrying.
    pub async fn ensure_ready(&self) -> Result<(), PoolError> {
        if let Some(outcome) = Self::terminal(&self.state_tx.borrow()) {
            return outcome;
        }
        self.spawn_build();
        self.wait_terminal().await
    }

    /// Wait for initialization to finish, without driving it.
    ///
    /// Resolves as soon as the state is terminal. With a deadline, exceeding
    /// it yields [`PoolError::ReadyTimeout`].
    pub async fn wait_ready(&self, deadline: Option<Duration>) -> Result<(), PoolError> {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.wait_terminal())
                .await
                .map_err(|_| PoolError::ReadyTimeout)?,
            None => self.wait_terminal().await,
        }
    }

    async fn wait_terminal(&self) -> Result<(), PoolError> {
        let mut rx = self.state_tx.subscribe();
        loop {
            if let Some(outcome) = Self::terminal(&rx.borrow_and_update()) {
                return outcome;
            }
            // the sender lives in self, so changed() cannot fail here
            let _ = rx.changed().await;
        }
    }

    /// Get a session, initializing on first use.
    ///
    /// With caching enabled, one random cache slot is probed first; a hit
    /// hands that session to the caller exclusively. A miss, or caching
    /// being disabled, opens a fresh session via the factory. Freshly opened
    /// sessions enter the cache only when returned through
    /// [`release_session`](Self::release_session).
    pub async fn get_session(&self, auto_commit: bool) -> Result<S, PoolError> {
        self.ready().await?;

        let (factory, pool) = {
            let parts = self.parts.read();
            let parts = parts
                .as_ref()
                .ok_or_else(|| PoolError::Unavailable("ready without a factory".to_string()))?;
            (parts.factory.clone(), parts.pool.clone())
        };

        if let Some(pool) = &pool {
            if let Some(session) = pool.checkout() {
                debug!("Serving session from cache");
                return Ok(session);
            }
        }

        let session = factory.open(auto_commit).await?;
        debug!("Opened session via factory");
        Ok(session)
    }

    /// Return a checked-out session.
    ///
    /// Goes back into the cache when caching is enabled, displacing whatever
    /// occupies the chosen slot; otherwise the session is simply dropped.
    pub fn release_session(&self, session: S) {
        let pool = self.parts.read().as_ref().and_then(|parts| parts.pool.clone());
        match pool {
            Some(pool) => pool.put(session),
            None => drop(session),
        }
    }

    /// `ensure_ready` bounded by the configured readiness deadline.
    ///
    /// The deadline bounds only this caller's wait; the build itself keeps
    /// running on its task.
    async fn ready(&self) -> Result<(), PoolError> {
        match self.config.ready_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.ensure_ready())
                .await
                .map_err(|_| PoolError::ReadyTimeout)?,
            None => self.ensure_ready().await,
        }
    }

    /// Spawn the factory build, first caller only
    fn spawn_build(&self) {
        if self.build_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let builder = self.builder.clone();
        let settings = self.settings.clone();
        let config = self.config.clone();
        let parts = self.parts.clone();
        let state_tx = self.state_tx.clone();

        tokio::spawn(async move {
            match Self::build(builder, settings, &config).await {
                Ok(ready) => {
                    *parts.write() = Some(ready);
                    state_tx.send_replace(PoolState::Ready);
                }
                Err(err) => {
                    error!("Factory initialization failed: {}", err);
                    state_tx.send_replace(PoolState::Failed(err.to_string()));
                }
            }
        });
    }

    async fn build(
        builder: Arc<dyn FactoryBuilder<Session = S>>,
        settings: Arc<dyn CacheSettings>,
        config: &PoolConfig,
    ) -> Result<ReadyParts<S>, PoolError> {
        info!("Start to build session factory...");
        let factory = builder.build().await?;

        // Read once per build pass; not expected to change afterwards
        let pool = if settings.caching_enabled() {
            let pool = SessionPool::new(factory.clone(), config);
            pool.prefill().await?;
            Some(Arc::new(pool))
        } else {
            debug!("Session caching disabled");
            None
        };

        info!("Session factory build success");
        Ok(ReadyParts { factory, pool })
    }

    fn terminal(state: &PoolState) -> Option<Result<(), PoolError>> {
        match state {
            PoolState::Ready => Some(Ok(())),
            PoolState::Failed(reason) => Some(Err(PoolError::Initialization(reason.clone()))),
            PoolState::Building => None,
        }
    }
}
