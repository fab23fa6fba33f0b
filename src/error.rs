//! Pool error types

use thiserror::Error;

/// Boxed error from a factory or builder collaborator
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PoolError {
    /// Factory construction or pool prefill failed. The manager stays in the
    /// `Failed` state and every later caller gets this error back.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// The session source could not open a session
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),

    /// Waiting for the manager to become ready exceeded the deadline
    #[error("Timed out waiting for pool readiness")]
    ReadyTimeout,

    /// Internal state was not what the published readiness implies
    #[error("Pool unavailable: {0}")]
    Unavailable(String),
}

impl PoolError {
    /// Wrap a collaborator failure
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PoolError::Backend(Box::new(err))
    }
}
