//! Protocol Error Types

use thiserror::Error;

/// Errors that can occur on the ECU byte link.
///
/// Read timeouts and malformed replies are not errors: they surface as an
/// empty frame or as invalid sample fields. Only link acquisition and
/// hard I/O faults are reported here.
#[derive(Debug, Error)]
pub enum EcuError {
    /// Serial port could not be acquired; fatal, reported once at startup
    #[error("Failed to open serial port {port}: {source}")]
    ChannelOpen {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Hard I/O failure on an open link
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
