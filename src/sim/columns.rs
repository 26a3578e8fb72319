use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ClusterHealth, ClusterOptions};
use crate::error::BackendError;
use crate::policy::Consistency;
use crate::stores::ColumnClient;

/// `balance_counters` table: one row per user with a `balance` counter column.
pub struct SimulatedColumnStore {
    rows: Mutex<HashMap<String, i64>>,
    health: ClusterHealth,
}

impl SimulatedColumnStore {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            health: ClusterHealth::new(&options),
        }
    }

    pub fn health(&self) -> &ClusterHealth {
        &self.health
    }

    pub fn provision(&self, user_id: &str, balance: i64) {
        self.rows.lock().insert(user_id.to_owned(), balance);
    }

    fn check_consistency(&self, level: Consistency) -> Result<(), BackendError> {
        let nodes = self.health.replicas() + 1;
        let online = self.health.online_replicas() + 1;
        let required = level.required_acks(nodes);
        if required > online {
            return Err(BackendError::Unavailable(format!(
                "consistency {level:?} requires {required} of {nodes} node(s), {online} online"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ColumnClient for SimulatedColumnStore {
    async fn read_balance(
        &self,
        user_id: &str,
        consistency: Consistency,
    ) -> Result<i64, BackendError> {
        self.health.enter().await?;
        self.check_consistency(consistency)?;
        self.rows
            .lock()
            .get(user_id)
            .copied()
            .ok_or_else(|| BackendError::KeyNotFound(user_id.to_owned()))
    }

    async fn add_to_balance(
        &self,
        user_id: &str,
        delta: i64,
        consistency: Consistency,
    ) -> Result<(), BackendError> {
        self.health.enter().await?;
        self.check_consistency(consistency)?;
        let mut rows = self.rows.lock();
        let balance = rows
            .get_mut(user_id)
            .ok_or_else(|| BackendError::KeyNotFound(user_id.to_owned()))?;
        *balance = balance
            .checked_add(delta)
            .ok_or_else(|| BackendError::Protocol(format!("counter {user_id} would overflow")))?;
        Ok(())
    }
}
