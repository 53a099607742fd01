//! Serial port access
//!
//! The sniffer only ever reads from the port; nothing is written to the bus.

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::config::{Parity, SnifferConfig};
use crate::error::{Result, ServiceError};

/// Convert configured parity to tokio_serial parity
fn parse_parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}

/// Convert data bits to tokio_serial data bits
fn parse_data_bits(data_bits: u8) -> tokio_serial::DataBits {
    match data_bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

/// Convert stop bits to tokio_serial stop bits
fn parse_stop_bits(stop_bits: u8) -> tokio_serial::StopBits {
    match stop_bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    }
}

/// Open the configured serial port for passive listening
pub fn open_serial(config: &SnifferConfig) -> Result<SerialStream> {
    debug!(
        "Opening serial port: {} ({} baud, {} data bits, parity {:?}, {} stop bits)",
        config.port, config.baud_rate, config.data_bits, config.parity, config.stop_bits
    );

    let port = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(parse_data_bits(config.data_bits))
        .parity(parse_parity(config.parity))
        .stop_bits(parse_stop_bits(config.stop_bits))
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(config.frame_gap())
        .open_native_async()
        .map_err(|source| ServiceError::Transport {
            port: config.port.clone(),
            source,
        })?;

    info!("Serial port {} opened", config.port);
    Ok(port)
}
