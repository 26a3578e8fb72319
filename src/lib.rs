pub mod config;
mod csv_utils;
mod dto;
mod error;
pub mod http;
pub mod load;
mod policy;
pub mod sim;
pub mod stores;

pub use dto::{balance_ref, BalanceRecord, IdentityDocument};
pub use error::{BackendError, ConfigError, Error, LoadError};
pub use load::{LoadConfig, LoadGenerator, LoadReport, UserPool};
pub use policy::{BackendKind, Consistency, ConsistencyPolicy, Durability};
pub use stores::{Backend, CounterStore};

/// Installs the global `tracing` subscriber used by the binaries.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
