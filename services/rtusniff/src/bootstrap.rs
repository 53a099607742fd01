//! Command-line arguments and startup

use clap::Parser;
use rtu_sniff::ClassifierMode;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{CliOverrides, SnifferConfig};
use crate::error::Result;
use crate::runtime::RunMode;

/// Command-line arguments for rtusniff
#[derive(Parser, Clone, Debug)]
#[command(
    name = "rtusniff",
    version = env!("CARGO_PKG_VERSION"),
    about = "Passive Modbus RTU bus sniffer",
    long_about = None
)]
pub struct Args {
    /// Serial port to listen on (e.g., /dev/ttyUSB0, COM8)
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Baud rate; also sets the inter-frame silence threshold
    #[arg(short = 'b', long)]
    pub baud_rate: Option<u32>,

    /// Register whose decoded value is printed
    #[arg(short = 't', long)]
    pub target_register: Option<u16>,

    /// Inter-frame silence override in microseconds
    #[arg(long)]
    pub frame_gap_us: Option<u64>,

    /// Request/response classifier (length, strict)
    #[arg(long, value_parser = parse_classifier)]
    pub classifier: Option<ClassifierMode>,

    /// Configuration file (.toml, .yaml)
    #[arg(short = 'c', long, env = "RTUSNIFF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Print every frame as hex instead of decoding
    #[arg(long)]
    pub dump: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validation mode - only validate configuration without opening the port
    #[arg(long)]
    pub validate: bool,
}

fn parse_classifier(value: &str) -> std::result::Result<ClassifierMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "length" => Ok(ClassifierMode::Length),
        "strict" => Ok(ClassifierMode::Strict),
        other => Err(format!("unknown classifier '{}' (expected length or strict)", other)),
    }
}

impl From<&Args> for CliOverrides {
    fn from(args: &Args) -> Self {
        CliOverrides {
            port: args.port.clone(),
            baud_rate: args.baud_rate,
            target_register: args.target_register,
            frame_gap_us: args.frame_gap_us,
            classifier: args.classifier,
            log_level: args.log_level.clone(),
        }
    }
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        if self.dump {
            RunMode::Dump
        } else {
            RunMode::Sniff
        }
    }

    /// Resolve the layered configuration
    pub fn load_config(&self) -> Result<SnifferConfig> {
        SnifferConfig::load(self.config.as_deref(), &CliOverrides::from(self))
    }
}

/// Install logging for the resolved configuration
pub fn initialize_logging(args: &Args, config: &SnifferConfig) -> Result<()> {
    crate::logging::init(&config.log_level, !args.no_color)?;
    debug!("Resolved configuration: {:?}", config);
    Ok(())
}

/// Report the resolved configuration in validation mode
pub fn validate_configuration(config: &SnifferConfig) -> Result<()> {
    config.validate()?;
    info!(
        "Configuration valid: port={}, baud_rate={}, target_register={}, frame_gap={} µs",
        config.port,
        config.baud_rate,
        config.target_register,
        config.frame_gap().as_micros()
    );
    Ok(())
}

/// Wait for Ctrl-C
pub async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
