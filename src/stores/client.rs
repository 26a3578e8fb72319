//! Interaction contracts of the two external storage systems.
//!
//! The backends in this module tree only ever talk to storage through these
//! traits. A client is shared by every concurrent task, so implementations
//! must be safe to call concurrently; connection pooling is their concern.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::policy::{Consistency, Durability};

/// Document store with native counters (indirect backend).
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Fetches the document stored under `key`.
    async fn get(&self, key: &str) -> Result<Value, BackendError>;

    /// Atomically adds `delta` to the counter under `key` and returns the new
    /// value. Acknowledged by the active node only.
    async fn counter(&self, key: &str, delta: i64) -> Result<i64, BackendError>;

    /// Like [`counter`](Self::counter), but only returns once the mutation
    /// meets `durability`.
    async fn counter_durable(
        &self,
        key: &str,
        delta: i64,
        durability: Durability,
    ) -> Result<i64, BackendError>;
}

/// Wide-column store with a `balance` counter column (native backend).
#[async_trait]
pub trait ColumnClient: Send + Sync {
    /// `SELECT balance ... WHERE user_id = ?` at the given consistency.
    async fn read_balance(
        &self,
        user_id: &str,
        consistency: Consistency,
    ) -> Result<i64, BackendError>;

    /// `UPDATE ... SET balance = balance + ? WHERE user_id = ?`.
    async fn add_to_balance(
        &self,
        user_id: &str,
        delta: i64,
        consistency: Consistency,
    ) -> Result<(), BackendError>;
}
