//! Error types for the balance service.
//!
//! Two layers:
//! - [`BackendError`] is what a storage client reports (key missing, timeouts,
//!   unavailable replicas, unmet durability thresholds, protocol mismatches).
//! - [`Error`] is the domain classification handed to callers: either the
//!   record does not exist, or something else went wrong.
//!
//! There are no retries anywhere in the store layer. A failed call surfaces
//! exactly one of these.
//!
//! [`ConfigError`] and [`LoadError`] cover startup configuration and the load
//! harness respectively.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error(
        "durability requirements unsatisfiable: replicate_to={requested_replicas} \
         persist_to={requested_persist}, {online} replica(s) online"
    )]
    DurabilityUnsatisfied {
        requested_replicas: u8,
        requested_persist: u8,
        online: usize,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Internal(BackendError),
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::KeyNotFound(_) => Error::NotFound,
            other => Error::Internal(other),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("replicate_to must be at most {max}, got {got}")]
    ReplicateTo { max: u8, got: u8 },
    #[error("persist_to must be at most {max}, got {got}")]
    PersistTo { max: u8, got: u8 },
    #[error("call timeout must be non-zero")]
    ZeroTimeout,
    #[error("invalid seed entry {0:?}, expected USER=BALANCE")]
    Seed(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("user pool is empty")]
    EmptyPool,
    #[error("max_in_flight must be at least 1")]
    NoConcurrency,
    #[error("failed to read user pool: {0}")]
    Pool(#[from] csv_async::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cpu profile: {0}")]
    Profile(String),
    #[error("load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("load phase semaphore closed")]
    Semaphore(#[from] tokio::sync::AcquireError),
}
