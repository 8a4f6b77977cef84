use anyhow::Context;
use blobmark::cli::{Cli, Commands};
use blobmark::logging;
use blobmark::runner::Runner;
use blobmark::seed::seed_objects;
use blobmark::shutdown::{ShutdownCoordinator, spawn_signal_listener};
use blobmark::store;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_format) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "An error occurred");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;
    match cli.command() {
        Commands::Run => {
            let store = store::connect(&config).await;

            let coordinator = Arc::new(ShutdownCoordinator::new());
            let listener = spawn_signal_listener(coordinator.clone())
                .context("failed to install signal handlers")?;

            let result = Runner::new(store, &config).run(&coordinator).await;
            listener.abort();
            result?;
        }
        Commands::Seed { count } => {
            let store = store::connect(&config).await;
            let names = seed_objects(
                store.as_ref(),
                &config.source_container,
                count as usize,
                config.pace(),
            )
            .await?;
            info!(
                container = %config.source_container,
                uploaded = names.len(),
                "Seeding finished"
            );
        }
    }
    Ok(())
}
