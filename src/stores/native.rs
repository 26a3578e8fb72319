use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{with_deadline, ColumnClient, CounterStore};
use crate::dto::BalanceRecord;
use crate::error::Error;
use crate::policy::ConsistencyPolicy;

/// Single-row backend: the balance is a native counter column keyed by
/// `userId`, so every operation is exactly one storage call.
pub struct NativeCounterBackend {
    client: Arc<dyn ColumnClient>,
    policy: ConsistencyPolicy,
}

impl NativeCounterBackend {
    pub fn new(client: Arc<dyn ColumnClient>, policy: ConsistencyPolicy) -> Self {
        Self { client, policy }
    }
}

#[async_trait]
impl CounterStore for NativeCounterBackend {
    async fn get(&self, user_id: &str) -> Result<BalanceRecord, Error> {
        let read = self
            .client
            .read_balance(user_id, self.policy.read_consistency());
        let balance = with_deadline(self.policy.call_timeout(), read).await?;
        Ok(BalanceRecord::new(user_id, balance))
    }

    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<(), Error> {
        let write = self
            .client
            .add_to_balance(user_id, delta, self.policy.write_consistency());
        with_deadline(self.policy.call_timeout(), write).await?;
        debug!(user_id, delta, "counter column incremented");
        Ok(())
    }
}
