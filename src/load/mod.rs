//! Concurrent load generation against a [`CounterStore`].
//!
//! A run has two phases, executed in order:
//! - read phase: `readers` tasks, each one `get` on a random pooled user
//! - write phase: `writers` tasks, each one `apply_delta` on a random pooled
//!   user, with the delta taken from the shared [`Cadence`]
//!
//! Every task of a phase has finished before the phase is reported. Task
//! spawning is bounded by `max_in_flight` permits; failed calls are logged and
//! counted, they never abort the run.

mod cadence;
mod pool;
mod profile;
mod report;

pub use cadence::{Cadence, CREDIT_EVERY};
pub use pool::UserPool;
pub use report::{LatencySummary, LoadReport, Phase, PhaseReport};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::LoadError;
use crate::stores::CounterStore;
use profile::CpuProfile;
use report::Outcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub readers: usize,
    pub writers: usize,
    /// Upper bound on tasks alive at once, per phase.
    pub max_in_flight: usize,
    pub credit_amount: i64,
    pub debit_amount: i64,
    /// Where to write a flamegraph of the run, if anywhere.
    pub cpu_profile: Option<PathBuf>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            readers: 10_000,
            writers: 10_000,
            max_in_flight: 512,
            credit_amount: 100,
            debit_amount: 10,
            cpu_profile: None,
        }
    }
}

pub struct LoadGenerator<S> {
    store: Arc<S>,
    pool: Arc<UserPool>,
    cadence: Arc<Cadence>,
    config: LoadConfig,
}

impl<S> LoadGenerator<S>
where
    S: CounterStore + 'static,
{
    pub fn new(store: Arc<S>, pool: UserPool, config: LoadConfig) -> Self {
        let cadence = Arc::new(Cadence::new(config.credit_amount, config.debit_amount));
        Self {
            store,
            pool: Arc::new(pool),
            cadence,
            config,
        }
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Runs the read phase, then the write phase, and reports both.
    ///
    /// # Errors
    /// Returns an error if:
    /// * `max_in_flight` is zero
    /// * the CPU profile cannot be started or written
    /// * a load task panicked
    ///
    /// Failed store calls are not errors; they show up in the report.
    pub async fn run(&self) -> Result<LoadReport, LoadError> {
        if self.config.max_in_flight == 0 {
            return Err(LoadError::NoConcurrency);
        }
        let profile = self
            .config
            .cpu_profile
            .as_deref()
            .map(CpuProfile::start)
            .transpose()?;

        let report = self.run_phases().await;

        // The profile is written even when a phase failed.
        if let Some(profile) = profile {
            match (profile.finish(), &report) {
                (Ok(path), _) => info!(path = %path.display(), "cpu profile written"),
                (Err(err), Ok(_)) => return Err(err),
                (Err(err), Err(_)) => warn!(error = %err, "cpu profile lost"),
            }
        }
        report
    }

    async fn run_phases(&self) -> Result<LoadReport, LoadError> {
        let reads = self
            .run_phase(Phase::Read, self.config.readers, || self.read_task())
            .await?;
        let writes = self
            .run_phase(Phase::Write, self.config.writers, || self.write_task())
            .await?;
        Ok(LoadReport { reads, writes })
    }

    async fn run_phase<F, Fut>(
        &self,
        phase: Phase,
        tasks: usize,
        mut make_task: F,
    ) -> Result<PhaseReport, LoadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut running = JoinSet::new();
        let started = Instant::now();

        for _ in 0..tasks {
            let permit = permits.clone().acquire_owned().await?;
            let task = make_task();
            running.spawn(async move {
                let outcome = task.await;
                drop(permit);
                outcome
            });
        }

        let mut outcomes = Vec::with_capacity(tasks);
        while let Some(joined) = running.join_next().await {
            outcomes.push(joined?);
        }

        let report = PhaseReport::from_outcomes(phase, started.elapsed(), &outcomes);
        info!(
            %phase,
            operations = report.operations,
            errors = report.errors,
            credits = report.credits,
            debits = report.debits,
            elapsed_ms = report.elapsed.as_millis() as u64,
            ops_per_sec = report.throughput(),
            "load phase finished"
        );
        Ok(report)
    }

    fn read_task(&self) -> impl Future<Output = Outcome> + Send + 'static {
        let store = self.store.clone();
        let user_id = self.pool.pick().to_owned();
        async move {
            let started = Instant::now();
            let result = store.get(&user_id).await;
            let latency = started.elapsed();
            if let Err(err) = &result {
                warn!(%user_id, error = %err, "read failed");
            }
            Outcome {
                latency,
                ok: result.is_ok(),
                credit: None,
            }
        }
    }

    fn write_task(&self) -> impl Future<Output = Outcome> + Send + 'static {
        let store = self.store.clone();
        let user_id = self.pool.pick().to_owned();
        let delta = self.cadence.next_delta();
        async move {
            let started = Instant::now();
            let result = store.apply_delta(&user_id, delta).await;
            let latency = started.elapsed();
            if let Err(err) = &result {
                warn!(%user_id, delta, error = %err, "update failed");
            }
            Outcome {
                latency,
                ok: result.is_ok(),
                credit: Some(delta > 0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dto::BalanceRecord;
    use crate::error::Error;
    use crate::policy::{BackendKind, ConsistencyPolicy};
    use crate::sim::{ClusterOptions, SimulatedCluster};
    use crate::stores::Backend;

    fn seeded(
        kind: BackendKind,
        users: &[&str],
        balance: i64,
    ) -> (SimulatedCluster, Arc<Backend>) {
        let cluster = SimulatedCluster::new(kind, ClusterOptions::default());
        for user in users {
            cluster.provision(user, balance);
        }
        let backend = Arc::new(cluster.backend(ConsistencyPolicy::default()));
        (cluster, backend)
    }

    fn pool(users: &[&str]) -> UserPool {
        UserPool::new(users.iter().map(|u| u.to_string()).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_four_writes_on_one_key_follow_cadence() {
        for kind in [BackendKind::Indirect, BackendKind::Native] {
            let (_cluster, backend) = seeded(kind, &["only"], 1000);
            let config = LoadConfig {
                readers: 0,
                writers: 4,
                ..LoadConfig::default()
            };
            let generator = LoadGenerator::new(backend.clone(), pool(&["only"]), config);

            let report = generator.run().await.unwrap();
            assert_eq!(report.writes.operations, 4);
            assert_eq!(report.writes.credits, 1);
            assert_eq!(report.writes.debits, 3);
            assert_eq!(report.writes.errors, 0);
            assert_eq!(generator.cadence().issued(), 4);
            assert_eq!(backend.get("only").await.unwrap().balance, 1000 - 30 + 100);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bounded_run_preserves_total() {
        let users = ["a", "b", "c"];
        let (_cluster, backend) = seeded(BackendKind::Indirect, &users, 1000);
        let config = LoadConfig {
            readers: 200,
            writers: 400,
            max_in_flight: 8,
            ..LoadConfig::default()
        };
        let generator = LoadGenerator::new(backend.clone(), pool(&users), config);

        let report = generator.run().await.unwrap();
        assert_eq!(report.reads.operations, 200);
        assert_eq!(report.reads.errors, 0);
        assert_eq!(report.writes.credits, 100);
        assert_eq!(report.writes.debits, 300);

        let mut total = 0;
        for user in users {
            total += backend.get(user).await.unwrap().balance;
        }
        assert_eq!(total, 3 * 1000 + 100 * 100 - 300 * 10);
    }

    #[tokio::test]
    async fn test_failed_calls_are_counted_not_fatal() {
        let (cluster, backend) = seeded(BackendKind::Native, &["known"], 0);
        let config = LoadConfig {
            readers: 10,
            writers: 10,
            ..LoadConfig::default()
        };
        let generator = LoadGenerator::new(backend, pool(&["unknown"]), config);

        let report = generator.run().await.unwrap();
        assert_eq!(report.reads.errors, 10);
        assert_eq!(report.writes.errors, 10);

        cluster.health().set_unavailable(true);
        let report = generator.run().await.unwrap();
        assert_eq!(report.reads.errors, 10);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let (_cluster, backend) = seeded(BackendKind::Native, &["u"], 0);
        let config = LoadConfig {
            max_in_flight: 0,
            ..LoadConfig::default()
        };
        let generator = LoadGenerator::new(backend, pool(&["u"]), config);
        assert!(matches!(generator.run().await, Err(LoadError::NoConcurrency)));
    }

    /// Fails the write phase by panicking inside the store call.
    struct PanickingWrites(Arc<Backend>);

    #[async_trait::async_trait]
    impl CounterStore for PanickingWrites {
        async fn get(&self, user_id: &str) -> Result<BalanceRecord, Error> {
            self.0.get(user_id).await
        }

        async fn apply_delta(&self, _user_id: &str, _delta: i64) -> Result<(), Error> {
            panic!("store blew up");
        }
    }

    #[tokio::test]
    async fn test_panicking_task_fails_run() {
        let (_cluster, backend) = seeded(BackendKind::Native, &["u"], 0);
        let config = LoadConfig {
            readers: 2,
            writers: 2,
            ..LoadConfig::default()
        };
        let store = Arc::new(PanickingWrites(backend));
        let generator = LoadGenerator::new(store, pool(&["u"]), config);
        assert!(matches!(generator.run().await, Err(LoadError::Join(_))));
    }

    #[cfg(feature = "cpu-profile")]
    fn profile_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{name}-{}.svg", uuid::Uuid::new_v4()))
    }

    #[cfg(feature = "cpu-profile")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cpu_profile_written_for_run() {
        let users = ["a", "b"];
        let (_cluster, backend) = seeded(BackendKind::Indirect, &users, 1000);
        let path = profile_path("balance-run");
        let config = LoadConfig {
            readers: 2_000,
            writers: 2_000,
            cpu_profile: Some(path.clone()),
            ..LoadConfig::default()
        };
        let generator = LoadGenerator::new(backend, pool(&users), config);

        let report = generator.run().await.unwrap();
        assert_eq!(report.writes.operations, 2_000);
        let written = std::fs::metadata(&path).unwrap();
        assert!(written.len() > 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(feature = "cpu-profile")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cpu_profile_written_when_phase_fails() {
        let (_cluster, backend) = seeded(BackendKind::Indirect, &["u"], 0);
        let path = profile_path("balance-failed-run");
        let config = LoadConfig {
            readers: 2_000,
            writers: 1,
            cpu_profile: Some(path.clone()),
            ..LoadConfig::default()
        };
        let store = Arc::new(PanickingWrites(backend));
        let generator = LoadGenerator::new(store, pool(&["u"]), config);

        assert!(matches!(generator.run().await, Err(LoadError::Join(_))));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_phase_finishes_before_writes_start() {
        let cluster = SimulatedCluster::new(
            BackendKind::Native,
            ClusterOptions {
                op_latency: Duration::from_millis(10),
                ..ClusterOptions::default()
            },
        );
        cluster.provision("u", 0);
        let backend = Arc::new(cluster.backend(ConsistencyPolicy::default()));
        let config = LoadConfig {
            readers: 6,
            writers: 6,
            max_in_flight: 2,
            ..LoadConfig::default()
        };
        let generator = LoadGenerator::new(backend, pool(&["u"]), config);

        let report = generator.run().await.unwrap();
        // Three waves of two tasks per phase.
        for phase in report.phases() {
            assert!(phase.elapsed >= Duration::from_millis(30));
            assert!(phase.elapsed < Duration::from_millis(40));
        }
    }
}
