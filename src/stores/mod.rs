//! Counter-store layer. Provides:
//! - the [`CounterStore`] interface every caller programs against
//! - the two backend variants ([`IndirectCounterBackend`], [`NativeCounterBackend`])
//! - [`Backend`], the closed choice between them made once at startup
//!
//! Backends hold no state of their own beyond the shared client handle and
//! the policy, so a single instance is shared by all tasks behind an `Arc`.

mod client;
mod indirect;
mod native;

pub use client::{ColumnClient, DocumentClient};
pub use indirect::IndirectCounterBackend;
pub use native::NativeCounterBackend;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::dto::BalanceRecord;
use crate::error::{BackendError, Error};
use crate::policy::BackendKind;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Reads the authoritative current balance of `user_id`.
    async fn get(&self, user_id: &str) -> Result<BalanceRecord, Error>;

    /// Atomically adds `delta` (credit when positive, debit otherwise) to the
    /// balance of `user_id`. Concurrent deltas on the same user never lose
    /// updates.
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<(), Error>;
}

/// The backend a process runs with.
pub enum Backend {
    Indirect(IndirectCounterBackend),
    Native(NativeCounterBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Indirect(_) => BackendKind::Indirect,
            Backend::Native(_) => BackendKind::Native,
        }
    }
}

#[async_trait]
impl CounterStore for Backend {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, user_id: &str) -> Result<BalanceRecord, Error> {
        match self {
            Backend::Indirect(store) => store.get(user_id).await,
            Backend::Native(store) => store.get(user_id).await,
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<(), Error> {
        match self {
            Backend::Indirect(store) => store.apply_delta(user_id, delta).await,
            Backend::Native(store) => store.apply_delta(user_id, delta).await,
        }
    }
}

/// Runs one backend call, cut short after `limit` if one is configured.
pub(crate) async fn with_deadline<T, F>(limit: Option<Duration>, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| BackendError::Timeout(limit))?,
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses_on_pending_call() {
        let limit = Duration::from_millis(250);
        let result: Result<(), _> =
            with_deadline(Some(limit), std::future::pending::<Result<(), BackendError>>()).await;
        assert_eq!(result, Err(BackendError::Timeout(limit)));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_results() {
        let ok = with_deadline(Some(Duration::from_secs(1)), async { Ok::<_, BackendError>(7) });
        assert_eq!(ok.await, Ok(7));

        let err = with_deadline(None, async {
            Err::<i64, _>(BackendError::KeyNotFound("k".into()))
        });
        assert_eq!(err.await, Err(BackendError::KeyNotFound("k".into())));
    }
}
