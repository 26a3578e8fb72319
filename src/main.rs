use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use rusty_balance::config::ServerCli;
use rusty_balance::http::{router, SharedStore};
use rusty_balance::sim::SimulatedCluster;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = ServerCli::parse();
    rusty_balance::init_logging();

    let policy = cli.backend.policy()?;
    let cluster = SimulatedCluster::new(cli.backend.backend, cli.backend.cluster_options());
    for seed in &cli.seeds {
        cluster.provision(&seed.user_id, seed.balance);
    }
    let store: SharedStore = Arc::new(cluster.backend(policy));

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(
        listen = %cli.listen,
        backend = ?cluster.kind(),
        seeded = cli.seeds.len(),
        "balance service listening"
    );
    axum::serve(listener, router(store)).await?;
    Ok(())
}
