//! witness-maintainer binary
//!
//! Creates or updates the witness pool of a Web Ledger network from a list of
//! primary and secondary nodes.

mod args;

use args::{Command, Parsed};
use maintainer_core::{MaintainerConfig, MaintenanceOrchestrator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "witness_maintainer=info,maintainer_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match MaintainerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, config) = match args::parse(&args, config) {
        Ok(Parsed::Run(command, config)) => (command, *config),
        Ok(Parsed::Help) => {
            args::print_usage();
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            args::print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command, config).await {
        tracing::error!(error = %e, "Witness pool maintenance failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: MaintainerConfig) -> maintainer_core::Result<()> {
    let orchestrator = MaintenanceOrchestrator::with_web_connector(config)?;
    tracing::info!(command = ?command, did = %orchestrator.identity().did(), "Starting witness pool maintenance");

    let report = match command {
        Command::Create => orchestrator.create().await?,
        Command::Update => orchestrator.update().await?,
        Command::Sync => orchestrator.sync().await?,
    };

    println!(
        "{} {} primary={} secondary={} maxFaults={} digest={}",
        report.kind,
        report.witness_pool_id,
        report.summary.primary.len(),
        report.summary.secondary.len(),
        report.summary.budget.max_faults,
        report.digest
    );
    Ok(())
}
