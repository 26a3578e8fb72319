use serde::{Deserialize, Serialize};

const BALANCE_REF_SUFFIX: &str = "_bal";

/// Derives the key under which the indirect backend keeps a user's counter.
pub fn balance_ref(user_id: &str) -> String {
    format!("{user_id}{BALANCE_REF_SUFFIX}")
}

/// A user's balance as returned by [`CounterStore::get`](crate::CounterStore::get).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRecord {
    pub user_id: String,
    pub balance: i64,
}

impl BalanceRecord {
    pub fn new(user_id: impl Into<String>, balance: i64) -> Self {
        Self {
            user_id: user_id.into(),
            balance,
        }
    }

    pub fn balance_ref(&self) -> String {
        balance_ref(&self.user_id)
    }
}

/// Identity document stored under `userId` by the indirect backend.
/// The counter itself lives under `balance_ref`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    pub user_id: String,
    pub balance_ref: String,
}

impl IdentityDocument {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let balance_ref = balance_ref(&user_id);
        Self {
            user_id,
            balance_ref,
        }
    }
}
