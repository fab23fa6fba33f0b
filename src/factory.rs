//! Factory collaborator traits
//!
//! The session type is opaque to this crate: it only needs to be storable
//! and safely discardable. Stateful handles should release their underlying
//! connection on `Drop`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::PoolError;

/// Opens new sessions on demand
///
/// Opening is assumed expensive enough to justify pooling. Implementations
/// fail with an I/O-style error when the underlying source is unavailable;
/// wrap it via [`PoolError::backend`].
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: Send + 'static;

    /// Open a fresh session
    async fn open(&self, auto_commit: bool) -> Result<Self::Session, PoolError>;
}

/// One-shot constructor for the factory itself
///
/// Building the factory (parsing driver configuration, establishing the
/// connection source) is the expensive step the manager performs exactly
/// once per process. The built factory then lives for the rest of the
/// process; there is no teardown.
#[async_trait]
pub trait FactoryBuilder: Send + Sync {
    type Session: Send + 'static;

    /// Construct the factory from its configuration source
    async fn build(&self) -> Result<Arc<dyn SessionFactory<Session = Self::Session>>, PoolError>;
}
