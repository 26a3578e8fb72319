//! Command-line and environment configuration for the two binaries.
//!
//! Every flag can also be set through a `BALANCE_*` environment variable;
//! flags win over the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

use crate::error::ConfigError;
use crate::load::LoadConfig;
use crate::policy::{BackendKind, Consistency, ConsistencyPolicy};
use crate::sim::ClusterOptions;

/// Backend choice, consistency policy and simulated cluster shape.
#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Storage backend to run against.
    #[arg(long, value_enum, default_value_t = BackendKind::Indirect, env = "BALANCE_BACKEND")]
    pub backend: BackendKind,

    /// Replicas a credit must reach before it is acknowledged (indirect backend).
    #[arg(long, default_value_t = 0, env = "BALANCE_REPLICATE_TO")]
    pub replicate_to: u8,

    /// Nodes a credit must be persisted on before it is acknowledged (indirect backend).
    #[arg(long, default_value_t = 1, env = "BALANCE_PERSIST_TO")]
    pub persist_to: u8,

    /// Read consistency level (native backend).
    #[arg(long, value_enum, default_value_t = Consistency::One, env = "BALANCE_READ_CONSISTENCY")]
    pub read_consistency: Consistency,

    /// Write consistency level (native backend).
    #[arg(long, value_enum, default_value_t = Consistency::One, env = "BALANCE_WRITE_CONSISTENCY")]
    pub write_consistency: Consistency,

    /// Per-call backend timeout in milliseconds; 0 disables it.
    #[arg(long, default_value_t = 5_000, env = "BALANCE_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Replicas in the simulated cluster besides the active node.
    #[arg(long, default_value_t = 0, env = "BALANCE_REPLICAS")]
    pub replicas: usize,

    /// Latency added to every simulated storage call, in microseconds.
    #[arg(long, default_value_t = 0, env = "BALANCE_OP_LATENCY_US")]
    pub op_latency_us: u64,

    /// Extra latency of a durable acknowledgment, in microseconds.
    #[arg(long, default_value_t = 0, env = "BALANCE_DURABLE_LATENCY_US")]
    pub durable_latency_us: u64,
}

impl BackendArgs {
    pub fn policy(&self) -> Result<ConsistencyPolicy, ConfigError> {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        ConsistencyPolicy::builder()
            .replicate_to(self.replicate_to)
            .persist_to(self.persist_to)
            .read_consistency(self.read_consistency)
            .write_consistency(self.write_consistency)
            .call_timeout(timeout)
            .build()
    }

    pub fn cluster_options(&self) -> ClusterOptions {
        ClusterOptions {
            replicas: self.replicas,
            op_latency: Duration::from_micros(self.op_latency_us),
            durable_ack_latency: Duration::from_micros(self.durable_latency_us),
        }
    }
}

/// A `USER=BALANCE` pair to provision at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub user_id: String,
    pub balance: i64,
}

impl std::str::FromStr for Seed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_id, balance) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::Seed(s.to_owned()))?;
        let user_id = user_id.trim();
        let balance = balance
            .trim()
            .parse()
            .map_err(|_| ConfigError::Seed(s.to_owned()))?;
        if user_id.is_empty() {
            return Err(ConfigError::Seed(s.to_owned()));
        }
        Ok(Self {
            user_id: user_id.to_owned(),
            balance,
        })
    }
}

/// Balance HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "balance-server", version)]
pub struct ServerCli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080", env = "BALANCE_LISTEN")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Record to provision before serving, as USER=BALANCE. Repeatable.
    #[arg(long = "seed", value_name = "USER=BALANCE")]
    pub seeds: Vec<Seed>,
}

/// Concurrent read/update load against a balance backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "balance-loadgen", version)]
pub struct LoadCli {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Number of reader tasks.
    #[arg(long, default_value_t = 10_000, env = "BALANCE_READERS")]
    pub readers: usize,

    /// Number of writer tasks.
    #[arg(long, default_value_t = 10_000, env = "BALANCE_UPDATERS")]
    pub updaters: usize,

    /// Tasks alive at once per phase.
    #[arg(long, default_value_t = 512, env = "BALANCE_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// File with the user ids to test (one per line, or uid,delta CSV).
    #[arg(long, env = "BALANCE_DUMP_FILE")]
    pub dump_file: Option<PathBuf>,

    /// Size of a freshly generated pool when no dump file is given.
    #[arg(long, default_value_t = 10_000, env = "BALANCE_USERS")]
    pub users: usize,

    /// Balance every pooled user starts from.
    #[arg(long, default_value_t = 1_000)]
    pub initial_balance: i64,

    /// Write a CPU flamegraph (SVG) of the run to this path.
    #[arg(long, env = "BALANCE_CPUPROFILE")]
    pub cpuprofile: Option<PathBuf>,

    /// Write the report as CSV to this path instead of stdout.
    #[arg(long)]
    pub report_csv: Option<PathBuf>,
}

impl LoadCli {
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            readers: self.readers,
            writers: self.updaters,
            max_in_flight: self.max_in_flight,
            cpu_profile: self.cpuprofile.clone(),
            ..LoadConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let cli = ServerCli::try_parse_from(["balance-server"]).unwrap();
        assert_eq!(cli.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cli.backend.backend, BackendKind::Indirect);
        assert_eq!(cli.backend.policy().unwrap(), ConsistencyPolicy::default());
        assert!(cli.seeds.is_empty());
    }

    #[test]
    fn test_server_flags() {
        let cli = ServerCli::try_parse_from([
            "balance-server",
            "--backend",
            "native",
            "--read-consistency",
            "quorum",
            "--timeout-ms",
            "0",
            "--seed",
            "test-user=1000",
            "--seed",
            "other=-5",
        ])
        .unwrap();
        assert_eq!(cli.backend.backend, BackendKind::Native);
        let policy = cli.backend.policy().unwrap();
        assert_eq!(policy.read_consistency(), Consistency::Quorum);
        assert_eq!(policy.call_timeout(), None);
        assert_eq!(
            cli.seeds,
            vec![
                Seed {
                    user_id: "test-user".into(),
                    balance: 1000
                },
                Seed {
                    user_id: "other".into(),
                    balance: -5
                },
            ]
        );
    }

    #[test]
    fn test_bad_seed_rejected() {
        for bad in ["nobalance", "=10", "u=ten"] {
            assert_eq!(bad.parse::<Seed>(), Err(ConfigError::Seed(bad.into())));
        }
        assert!(ServerCli::try_parse_from(["balance-server", "--seed", "x"]).is_err());
    }

    #[test]
    fn test_policy_validation_surfaces() {
        let cli = ServerCli::try_parse_from(["balance-server", "--replicate-to", "9"]).unwrap();
        assert!(matches!(
            cli.backend.policy(),
            Err(ConfigError::ReplicateTo { .. })
        ));
    }

    #[test]
    fn test_load_cli_maps_to_config() {
        let cli = LoadCli::try_parse_from([
            "balance-loadgen",
            "--readers",
            "5",
            "--updaters",
            "7",
            "--cpuprofile",
            "cpu.svg",
        ])
        .unwrap();
        let config = cli.load_config();
        assert_eq!(config.readers, 5);
        assert_eq!(config.writers, 7);
        assert_eq!(config.cpu_profile, Some(PathBuf::from("cpu.svg")));
        assert_eq!(config.credit_amount, 100);
        assert_eq!(config.debit_amount, 10);
    }
}
