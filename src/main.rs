//! Main entry point for the wb-report-loader CLI

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use wb_report_loader::cli::{Cli, Commands};
use wb_report_loader::metrics;
use wb_report_loader::shutdown::{self, ShutdownCoordinator};

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wb_report_loader=info"));

    // Logs go to stderr so stdout stays clean for summaries
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr).await {
            warn!("Metrics exporter disabled: {}", e);
        }
    }

    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    shutdown::cancel_on_ctrl_c(shutdown.clone());

    let result = match &cli.command {
        Commands::List(list_cmd) => list_cmd.execute().map_err(|e| anyhow::anyhow!(e)),
        Commands::Analyze(args) => args.execute().map_err(|e| anyhow::anyhow!(e)),
        Commands::Load(load_args) => load_args
            .execute(&cli, shutdown.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
