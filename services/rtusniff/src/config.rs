//! Sniffer configuration
//!
//! Layers, lowest to highest priority:
//! 1. Built-in defaults
//! 2. Config file (`.toml`, `.yaml`/`.yml`)
//! 3. Environment variables prefixed `RTUSNIFF_` (`__` separates nested keys,
//!    e.g. `RTUSNIFF_QUEUE__CAPACITY=512`)
//! 4. Command-line arguments

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use rtu_sniff::{silence_threshold, ClassifierMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RTUSNIFF_";

/// Serial parity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// What the reader does when the frame queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Reader waits for the processor
    #[default]
    Block,
    /// Oldest queued frames are overwritten
    DropOldest,
}

/// Frame queue between reader and processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued frames; unbounded when absent.
    ///
    /// Must be a power of two under `drop_oldest`: the ring rounds its size
    /// up to one.
    pub capacity: Option<usize>,
    pub overflow: OverflowPolicy,
}

/// Complete sniffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM8")
    pub port: String,
    pub baud_rate: u32,
    /// Register whose value is printed
    pub target_register: u16,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    pub parity: Parity,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Inter-frame silence override in microseconds
    pub frame_gap_us: Option<u64>,
    pub classifier: ClassifierMode,
    pub queue: QueueConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            target_register: 0,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            frame_gap_us: None,
            classifier: ClassifierMode::Length,
            queue: QueueConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line; `None` leaves lower layers untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_register: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_gap_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl SnifferConfig {
    /// Build the layered figment without extracting it
    pub fn figment(file: Option<&Path>, overrides: &CliOverrides) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SnifferConfig::default()));

        if let Some(path) = file {
            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    ServiceError::Config("Config file must have an extension".to_string())
                })?;

            figment = match extension {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                _ => {
                    return Err(ServiceError::Config(format!(
                        "Unsupported config file format: {}",
                        extension
                    )))
                },
            };
        }

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides)))
    }

    /// Load and validate configuration from all layers
    pub fn load(file: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        if let Some(path) = file {
            if !path.exists() {
                return Err(ServiceError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let config: SnifferConfig = Self::figment(file, overrides)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(ServiceError::Config(
                "Port path cannot be empty".to_string(),
            ));
        }

        if self.baud_rate == 0 {
            return Err(ServiceError::Config(
                "Baud rate must be greater than zero".to_string(),
            ));
        }

        if ![5, 6, 7, 8].contains(&self.data_bits) {
            return Err(ServiceError::Config(
                "Data bits must be 5, 6, 7, or 8".to_string(),
            ));
        }

        if ![1, 2].contains(&self.stop_bits) {
            return Err(ServiceError::Config(
                "Stop bits must be 1 or 2".to_string(),
            ));
        }

        if self.frame_gap_us == Some(0) {
            return Err(ServiceError::Config(
                "Frame gap must be greater than zero".to_string(),
            ));
        }

        if self.queue.capacity == Some(0) {
            return Err(ServiceError::Config(
                "Queue capacity must be greater than zero".to_string(),
            ));
        }

        if let Some(capacity) = self.queue.capacity {
            if self.queue.overflow == OverflowPolicy::DropOldest && !capacity.is_power_of_two() {
                return Err(ServiceError::Config(format!(
                    "Queue capacity {} must be a power of two with overflow = drop_oldest",
                    capacity
                )));
            }
        }

        Ok(())
    }

    /// Silence that ends a frame: the override if set, else derived from the baud rate
    pub fn frame_gap(&self) -> Duration {
        self.frame_gap_us
            .map(Duration::from_micros)
            .unwrap_or_else(|| silence_threshold(self.baud_rate))
    }
}
