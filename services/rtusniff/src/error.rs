//! Error handling for the sniffer service
//!
//! Protocol problems on the bus are recoverable and never surface here
//! (see `rtu_sniff::SniffError`). These variants end the process.

use thiserror::Error;

/// Fatal service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serial port could not be opened or was lost
    #[error("Transport error on {port}: {source}")]
    Transport {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Reading the byte stream or writing output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the sniffer service
pub type Result<T> = std::result::Result<T, ServiceError>;

impl From<figment::Error> for ServiceError {
    fn from(err: figment::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::Config("baud_rate must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: baud_rate must be greater than zero"
        );

        let err = ServiceError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        ));
        assert_eq!(err.to_string(), "IO error: stdout closed");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = ServiceError::Transport {
            port: "/dev/ttyUSB0".to_string(),
            source: tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "not found"),
        };
        assert!(err.to_string().starts_with("Transport error on /dev/ttyUSB0"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
