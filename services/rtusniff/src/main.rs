//! rtusniff - passive Modbus RTU bus sniffer

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rtusniff::bootstrap::{self, Args};
use rtusniff::runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config().context("Failed to load configuration")?;

    bootstrap::initialize_logging(&args, &config)?;

    // Validation mode: validate and exit
    if args.validate {
        bootstrap::validate_configuration(&config)?;
        info!("Validation completed successfully");
        return Ok(());
    }

    let token = CancellationToken::new();
    let shutdown_token = token.clone();
    tokio::spawn(async move {
        match bootstrap::wait_for_shutdown().await {
            Ok(()) => shutdown_token.cancel(),
            Err(e) => error!("Signal handler failed: {}", e),
        }
    });

    runtime::run(config, args.run_mode(), token)
        .await
        .context("Sniffer stopped with an error")?;

    info!("Sniffer stopped");
    Ok(())
}
