use std::error::Error;
use std::fs::File;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use rusty_balance::config::LoadCli;
use rusty_balance::sim::SimulatedCluster;
use rusty_balance::{LoadGenerator, UserPool};

#[tokio::main]
async fn main() {
    if let Err(err) = run_app().await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run_app() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = LoadCli::parse();
    rusty_balance::init_logging();

    let policy = cli.backend.policy()?;
    let pool = match &cli.dump_file {
        Some(path) => UserPool::from_path(path).await?,
        None => UserPool::generate(cli.users)?,
    };

    let cluster = SimulatedCluster::new(cli.backend.backend, cli.backend.cluster_options());
    for user_id in pool.ids() {
        cluster.provision(user_id, cli.initial_balance);
    }
    info!(
        backend = ?cluster.kind(),
        users = pool.len(),
        readers = cli.readers,
        updaters = cli.updaters,
        "starting load run"
    );

    let store = Arc::new(cluster.backend(policy));
    let generator = LoadGenerator::new(store, pool, cli.load_config());
    let report = generator.run().await?;

    match &cli.report_csv {
        Some(path) => report.write_csv(File::create(path)?)?,
        None => report.write_csv(std::io::stdout())?,
    }
    Ok(())
}
