//! In-process stand-ins for the two external storage systems.
//!
//! Each simulated store implements one client contract from
//! [`stores`](crate::stores) and models just enough of a replicated cluster
//! to exercise the policy: a number of replicas that can go offline, a
//! durable-acknowledgment latency, whole-cluster outages and calls that
//! never complete.
//!
//! Provisioning (`provision`) creates every key of a record inside one
//! critical section, so a record is never observed half-created.

mod columns;
mod documents;

pub use columns::SimulatedColumnStore;
pub use documents::SimulatedDocumentStore;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::BackendError;
use crate::policy::{BackendKind, ConsistencyPolicy};
use crate::stores::{Backend, IndirectCounterBackend, NativeCounterBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterOptions {
    /// Nodes besides the active one.
    pub replicas: usize,
    /// Added to every call.
    pub op_latency: Duration,
    /// Extra wait a durable write pays after the local mutation.
    pub durable_ack_latency: Duration,
}

/// Runtime fault knobs of a simulated cluster.
#[derive(Debug)]
pub struct ClusterHealth {
    replicas: usize,
    online_replicas: AtomicUsize,
    unavailable: AtomicBool,
    hung: AtomicBool,
    op_latency: Duration,
}

impl ClusterHealth {
    fn new(options: &ClusterOptions) -> Self {
        Self {
            replicas: options.replicas,
            online_replicas: AtomicUsize::new(options.replicas),
            unavailable: AtomicBool::new(false),
            hung: AtomicBool::new(false),
            op_latency: options.op_latency,
        }
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    pub fn online_replicas(&self) -> usize {
        self.online_replicas.load(Ordering::Acquire)
    }

    /// Clamped to the configured replica count.
    pub fn set_online_replicas(&self, online: usize) {
        self.online_replicas
            .store(online.min(self.replicas), Ordering::Release);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// While set, every call blocks forever.
    pub fn set_hung(&self, hung: bool) {
        self.hung.store(hung, Ordering::Release);
    }

    /// Gate every simulated call passes before touching data.
    async fn enter(&self) -> Result<(), BackendError> {
        if self.hung.load(Ordering::Acquire) {
            std::future::pending::<()>().await;
        }
        if !self.op_latency.is_zero() {
            tokio::time::sleep(self.op_latency).await;
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(BackendError::Unavailable("simulated cluster outage".into()));
        }
        Ok(())
    }
}

/// One simulated cluster of either kind, plus the backend that talks to it.
#[derive(Clone)]
pub enum SimulatedCluster {
    Documents(Arc<SimulatedDocumentStore>),
    Columns(Arc<SimulatedColumnStore>),
}

impl SimulatedCluster {
    pub fn new(kind: BackendKind, options: ClusterOptions) -> Self {
        match kind {
            BackendKind::Indirect => {
                SimulatedCluster::Documents(Arc::new(SimulatedDocumentStore::new(options)))
            }
            BackendKind::Native => {
                SimulatedCluster::Columns(Arc::new(SimulatedColumnStore::new(options)))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            SimulatedCluster::Documents(_) => BackendKind::Indirect,
            SimulatedCluster::Columns(_) => BackendKind::Native,
        }
    }

    /// Creates (or resets) a user's record with the given balance.
    pub fn provision(&self, user_id: &str, balance: i64) {
        match self {
            SimulatedCluster::Documents(store) => store.provision(user_id, balance),
            SimulatedCluster::Columns(store) => store.provision(user_id, balance),
        }
    }

    pub fn health(&self) -> &ClusterHealth {
        match self {
            SimulatedCluster::Documents(store) => store.health(),
            SimulatedCluster::Columns(store) => store.health(),
        }
    }

    pub fn backend(&self, policy: ConsistencyPolicy) -> Backend {
        match self {
            SimulatedCluster::Documents(store) => {
                Backend::Indirect(IndirectCounterBackend::new(store.clone(), policy))
            }
            SimulatedCluster::Columns(store) => {
                Backend::Native(NativeCounterBackend::new(store.clone(), policy))
            }
        }
    }
}
