use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{with_deadline, CounterStore, DocumentClient};
use crate::dto::{BalanceRecord, IdentityDocument};
use crate::error::{BackendError, Error};
use crate::policy::ConsistencyPolicy;

/// Two-key backend: an identity document under `userId` points at a separate
/// counter document under its `balanceRef`.
///
/// Credits are written durably (replicated/persisted per policy before the
/// call returns). Debits take the local atomic path.
pub struct IndirectCounterBackend {
    client: Arc<dyn DocumentClient>,
    policy: ConsistencyPolicy,
}

impl IndirectCounterBackend {
    pub fn new(client: Arc<dyn DocumentClient>, policy: ConsistencyPolicy) -> Self {
        Self { client, policy }
    }

    /// Looks up the identity document and returns the key of its counter.
    async fn resolve_balance_ref(&self, user_id: &str) -> Result<String, Error> {
        let document = with_deadline(self.policy.call_timeout(), self.client.get(user_id)).await?;
        let identity: IdentityDocument = serde_json::from_value(document).map_err(|e| {
            BackendError::Protocol(format!("malformed identity document for {user_id}: {e}"))
        })?;
        Ok(identity.balance_ref)
    }
}

#[async_trait]
impl CounterStore for IndirectCounterBackend {
    async fn get(&self, user_id: &str) -> Result<BalanceRecord, Error> {
        let balance_ref = self.resolve_balance_ref(user_id).await?;
        let value =
            with_deadline(self.policy.call_timeout(), self.client.get(&balance_ref)).await?;
        let balance = value.as_i64().ok_or_else(|| {
            BackendError::Protocol(format!("counter {balance_ref} is not an integer: {value}"))
        })?;
        Ok(BalanceRecord::new(user_id, balance))
    }

    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<(), Error> {
        let balance_ref = self.resolve_balance_ref(user_id).await?;
        let timeout = self.policy.call_timeout();
        let balance = if delta > 0 {
            let durability = self.policy.durability();
            with_deadline(
                timeout,
                self.client.counter_durable(&balance_ref, delta, durability),
            )
            .await?
        } else {
            with_deadline(timeout, self.client.counter(&balance_ref, delta)).await?
        };
        debug!(user_id, delta, balance, durable = delta > 0, "counter updated");
        Ok(())
    }
}
