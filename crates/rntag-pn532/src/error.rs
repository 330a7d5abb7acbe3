//! Error types for PN532 operations

use rntag_core::error::Error as CoreError;
use thiserror::Error;

/// PN532-specific errors
#[derive(Debug, Error)]
pub enum Pn532Error {
    /// Failed to open or wake up the reader
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The reader did not acknowledge a command frame
    #[error("No ACK for command 0x{0:02X}")]
    NoAck(u8),

    /// The reader rejected a frame (NACK or error frame)
    #[error("Reader rejected command 0x{0:02X}")]
    Rejected(u8),

    /// A received frame is malformed
    #[error("Invalid frame: {0}")]
    InvalidFrame(&'static str),

    /// Length or data checksum mismatch
    #[error("Checksum mismatch in {0}")]
    Checksum(&'static str),

    /// Response to a different command than the one sent
    #[error("Unexpected response 0x{actual:02X} to command 0x{command:02X}")]
    UnexpectedResponse { command: u8, actual: u8 },

    /// Non-zero status byte from InDataExchange / InCommunicateThru
    #[error("Reader status 0x{0:02X}")]
    Status(u8),

    /// No ISO14443A target in the field
    #[error("No target in the field")]
    NoTarget,

    /// Frame does not fit in a normal information frame
    #[error("Frame of {len} bytes exceeds {max} bytes")]
    FrameTooLong { len: usize, max: usize },

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

/// Result type for PN532 operations
pub type Result<T> = core::result::Result<T, Pn532Error>;

impl From<std::io::Error> for Pn532Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            Pn532Error::Timeout
        } else {
            Pn532Error::IoError(e.to_string())
        }
    }
}

/// Status code for "target did not answer in time"
pub const STATUS_TIMEOUT: u8 = 0x01;

impl From<Pn532Error> for CoreError {
    fn from(e: Pn532Error) -> Self {
        log::debug!("pn532: {}", e);
        match e {
            Pn532Error::Status(STATUS_TIMEOUT) | Pn532Error::NoTarget => CoreError::TagLost,
            Pn532Error::FrameTooLong { len, max } => CoreError::FrameTooLong { len, max },
            Pn532Error::ConnectionFailed(_) => CoreError::ConnectFailed,
            _ => CoreError::TransceiveFailed,
        }
    }
}
