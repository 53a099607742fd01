//! Passive Modbus RTU sniffer service
//!
//! Opens a serial port read-only, feeds the byte stream through the
//! `rtu_sniff` pipeline and prints the value of one target register each
//! time a request/response pair covering it is observed. Logs go to stderr.
//!
//! The active poller that normally drives such a bus (read-register
//! requests at a fixed slave id, address and count on a fixed interval)
//! is outside this crate; the sniffer never transmits.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod runtime;
pub mod transport;

pub use config::SnifferConfig;
pub use error::{Result, ServiceError};
pub use runtime::RunMode;
