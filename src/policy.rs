//! Startup-fixed consistency and durability tuning.
//!
//! A [`ConsistencyPolicy`] is built once from configuration and handed to
//! whichever backend the process runs with. Nothing mutates it afterwards.

use std::time::Duration;

use clap::ValueEnum;

use crate::error::ConfigError;

/// Replica/persist acknowledgments the document store supports at most.
pub const MAX_REPLICATE_TO: u8 = 3;
pub const MAX_PERSIST_TO: u8 = 4;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// How many replicas must answer a native-backend read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Consistency {
    #[default]
    One,
    Quorum,
    All,
}

impl Consistency {
    /// Nodes that must acknowledge, out of `nodes` total.
    pub fn required_acks(self, nodes: usize) -> usize {
        match self {
            Consistency::One => 1,
            Consistency::Quorum => nodes / 2 + 1,
            Consistency::All => nodes,
        }
    }
}

/// Thresholds a durable counter write blocks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durability {
    /// Additional nodes the value must be replicated to.
    pub replicate_to: u8,
    /// Nodes (master included) the value must be persisted on.
    pub persist_to: u8,
}

/// Which storage backend the process runs against. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// Identity document plus separate counter key.
    #[default]
    Indirect,
    /// Single row with a native counter column.
    Native,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    durability: Durability,
    read_consistency: Consistency,
    write_consistency: Consistency,
    call_timeout: Option<Duration>,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            durability: Durability {
                replicate_to: 0,
                persist_to: 1,
            },
            read_consistency: Consistency::One,
            write_consistency: Consistency::One,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

impl ConsistencyPolicy {
    pub fn builder() -> ConsistencyPolicyBuilder {
        ConsistencyPolicyBuilder {
            policy: Self::default(),
        }
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    pub fn read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    pub fn write_consistency(&self) -> Consistency {
        self.write_consistency
    }

    /// `None` means backend calls are never cut short.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }
}

#[derive(Debug, Clone)]
pub struct ConsistencyPolicyBuilder {
    policy: ConsistencyPolicy,
}

impl ConsistencyPolicyBuilder {
    pub fn replicate_to(mut self, replicas: u8) -> Self {
        self.policy.durability.replicate_to = replicas;
        self
    }

    pub fn persist_to(mut self, nodes: u8) -> Self {
        self.policy.durability.persist_to = nodes;
        self
    }

    pub fn read_consistency(mut self, level: Consistency) -> Self {
        self.policy.read_consistency = level;
        self
    }

    pub fn write_consistency(mut self, level: Consistency) -> Self {
        self.policy.write_consistency = level;
        self
    }

    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.policy.call_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ConsistencyPolicy, ConfigError> {
        let Durability {
            replicate_to,
            persist_to,
        } = self.policy.durability;
        if replicate_to > MAX_REPLICATE_TO {
            return Err(ConfigError::ReplicateTo {
                max: MAX_REPLICATE_TO,
                got: replicate_to,
            });
        }
        if persist_to > MAX_PERSIST_TO {
            return Err(ConfigError::PersistTo {
                max: MAX_PERSIST_TO,
                got: persist_to,
            });
        }
        if self.policy.call_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_local_single_node_setup() {
        let policy = ConsistencyPolicy::default();
        assert_eq!(
            policy.durability(),
            Durability {
                replicate_to: 0,
                persist_to: 1
            }
        );
        assert_eq!(policy.read_consistency(), Consistency::One);
        assert_eq!(policy.call_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_builder_rejects_out_of_range_thresholds() {
        assert_eq!(
            ConsistencyPolicy::builder().replicate_to(4).build(),
            Err(ConfigError::ReplicateTo { max: 3, got: 4 })
        );
        assert_eq!(
            ConsistencyPolicy::builder().persist_to(5).build(),
            Err(ConfigError::PersistTo { max: 4, got: 5 })
        );
        assert_eq!(
            ConsistencyPolicy::builder()
                .call_timeout(Some(Duration::ZERO))
                .build(),
            Err(ConfigError::ZeroTimeout)
        );
    }

    #[test]
    fn test_required_acks() {
        assert_eq!(Consistency::One.required_acks(3), 1);
        assert_eq!(Consistency::Quorum.required_acks(3), 2);
        assert_eq!(Consistency::Quorum.required_acks(4), 3);
        assert_eq!(Consistency::All.required_acks(3), 3);
    }
}
