use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ClusterHealth, ClusterOptions};
use crate::dto::IdentityDocument;
use crate::error::BackendError;
use crate::policy::Durability;
use crate::stores::DocumentClient;

/// Key/value document store. Counters are documents holding a JSON integer.
pub struct SimulatedDocumentStore {
    documents: Mutex<HashMap<String, Value>>,
    health: ClusterHealth,
    durable_ack_latency: std::time::Duration,
}

impl SimulatedDocumentStore {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            health: ClusterHealth::new(&options),
            durable_ack_latency: options.durable_ack_latency,
        }
    }

    pub fn health(&self) -> &ClusterHealth {
        &self.health
    }

    /// Writes the identity document and its counter together.
    pub fn provision(&self, user_id: &str, balance: i64) {
        let identity = IdentityDocument::for_user(user_id);
        let counter_key = identity.balance_ref.clone();
        let identity = serde_json::json!({
            "userId": identity.user_id,
            "balanceRef": identity.balance_ref,
        });
        let mut documents = self.documents.lock();
        documents.insert(user_id.to_owned(), identity);
        documents.insert(counter_key, Value::from(balance));
    }

    /// Stores a raw document, bypassing all checks.
    pub fn upsert(&self, key: &str, value: Value) {
        self.documents.lock().insert(key.to_owned(), value);
    }

    fn add_to_counter(&self, key: &str, delta: i64) -> Result<i64, BackendError> {
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(key)
            .ok_or_else(|| BackendError::KeyNotFound(key.to_owned()))?;
        let current = document
            .as_i64()
            .ok_or_else(|| BackendError::Protocol(format!("document {key} is not a counter")))?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| BackendError::Protocol(format!("counter {key} would overflow")))?;
        *document = Value::from(next);
        Ok(next)
    }

    fn check_durability(&self, durability: Durability) -> Result<(), BackendError> {
        let online = self.health.online_replicas();
        let persist_capacity = online + 1;
        if usize::from(durability.replicate_to) > online
            || usize::from(durability.persist_to) > persist_capacity
        {
            return Err(BackendError::DurabilityUnsatisfied {
                requested_replicas: durability.replicate_to,
                requested_persist: durability.persist_to,
                online,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentClient for SimulatedDocumentStore {
    async fn get(&self, key: &str) -> Result<Value, BackendError> {
        self.health.enter().await?;
        self.documents
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::KeyNotFound(key.to_owned()))
    }

    async fn counter(&self, key: &str, delta: i64) -> Result<i64, BackendError> {
        self.health.enter().await?;
        self.add_to_counter(key, delta)
    }

    async fn counter_durable(
        &self,
        key: &str,
        delta: i64,
        durability: Durability,
    ) -> Result<i64, BackendError> {
        self.health.enter().await?;
        self.check_durability(durability)?;
        let next = self.add_to_counter(key, delta)?;
        let waits_for_ack = durability.replicate_to > 0 || durability.persist_to > 0;
        if waits_for_ack && !self.durable_ack_latency.is_zero() {
            tokio::time::sleep(self.durable_ack_latency).await;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_WAIT: Durability = Durability {
        replicate_to: 0,
        persist_to: 0,
    };

    #[tokio::test]
    async fn test_provision_writes_both_keys() {
        let store = SimulatedDocumentStore::new(ClusterOptions::default());
        store.provision("u1", 1000);

        assert_eq!(
            store.get("u1").await.unwrap(),
            serde_json::json!({"userId": "u1", "balanceRef": "u1_bal"})
        );
        assert_eq!(store.get("u1_bal").await.unwrap(), Value::from(1000));
    }

    #[tokio::test]
    async fn test_counter_on_missing_key() {
        let store = SimulatedDocumentStore::new(ClusterOptions::default());
        assert_eq!(
            store.counter("absent", 1).await,
            Err(BackendError::KeyNotFound("absent".into()))
        );
        assert_eq!(
            store.counter_durable("absent", 1, NO_WAIT).await,
            Err(BackendError::KeyNotFound("absent".into()))
        );
    }

    #[tokio::test]
    async fn test_counter_can_go_negative() {
        let store = SimulatedDocumentStore::new(ClusterOptions::default());
        store.upsert("c", Value::from(5));
        assert_eq!(store.counter("c", -10).await, Ok(-5));
    }

    #[tokio::test]
    async fn test_counter_overflow_is_rejected_without_mutation() {
        let store = SimulatedDocumentStore::new(ClusterOptions::default());
        store.upsert("c", Value::from(i64::MAX));
        assert!(matches!(
            store.counter("c", 1).await,
            Err(BackendError::Protocol(_))
        ));
        assert_eq!(store.get("c").await.unwrap(), Value::from(i64::MAX));
    }

    #[tokio::test]
    async fn test_unsatisfiable_durability_does_not_mutate() {
        let store = SimulatedDocumentStore::new(ClusterOptions {
            replicas: 2,
            ..ClusterOptions::default()
        });
        store.upsert("c", Value::from(0));
        store.health().set_online_replicas(1);

        let two_replicas = Durability {
            replicate_to: 2,
            persist_to: 1,
        };
        assert_eq!(
            store.counter_durable("c", 10, two_replicas).await,
            Err(BackendError::DurabilityUnsatisfied {
                requested_replicas: 2,
                requested_persist: 1,
                online: 1,
            })
        );
        let persist_everywhere = Durability {
            replicate_to: 1,
            persist_to: 3,
        };
        assert!(store
            .counter_durable("c", 10, persist_everywhere)
            .await
            .is_err());
        assert_eq!(store.get("c").await.unwrap(), Value::from(0));

        let one_replica = Durability {
            replicate_to: 1,
            persist_to: 2,
        };
        assert_eq!(store.counter_durable("c", 10, one_replica).await, Ok(10));
    }
}
