//! Error types for rntag-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate and by driver implementations.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Capability errors
    /// No page or raw driver suitable for an NTAG215 was detected
    NoCompatibleTransport,
    /// The transport cannot carry even one page per exchange
    TransceiveBudgetTooSmall {
        /// Computed per-exchange byte budget of the adapter
        max_transceive_length: usize,
    },

    // Transport errors
    /// The driver refused to open a session with the tag
    ConnectFailed,
    /// An exchange was attempted without an open session
    NotConnected,
    /// The tag left the field during a session
    TagLost,
    /// The radio exchange failed
    TransceiveFailed,
    /// The command frame is longer than the driver can send
    FrameTooLong {
        /// Length of the rejected frame
        len: usize,
        /// Maximum frame length of the driver
        max: usize,
    },
    /// The tag answered with a 4-bit NAK
    Nak(u8),
    /// The tag answered, but with an unexpected number of bytes
    ResponseLength {
        /// Bytes the command should have returned
        expected: usize,
        /// Bytes actually returned
        actual: usize,
    },
    /// The tag answered with no data where data was required
    EmptyResponse,

    // Programmer errors
    /// Page index outside `[0, max_page_count)` on a single-page operation
    PageOutOfBounds {
        /// Offending page index
        page: u32,
        /// Page-count bound from the opcode table
        max: u32,
    },
    /// End page lies before start page
    InvalidRange {
        /// First page of the range
        start: u32,
        /// Last page of the range
        end: u32,
    },
    /// Data length is not acceptable for the operation
    InvalidDataLength {
        /// Length of the rejected buffer
        len: usize,
    },

    // Configuration errors
    /// Opcode table could not be loaded or parsed
    InvalidConfig,
}

impl Error {
    /// True for failures of the radio link or of the tag's answer
    ///
    /// These are the errors the bank-emulation commands used to fold into a
    /// single "no answer" result.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed
                | Self::NotConnected
                | Self::TagLost
                | Self::TransceiveFailed
                | Self::FrameTooLong { .. }
                | Self::Nak(_)
                | Self::ResponseLength { .. }
                | Self::EmptyResponse
        )
    }

    /// True for a page index that is outside the opcode table's page bound
    pub fn is_bounds_violation(&self) -> bool {
        matches!(self, Self::PageOutOfBounds { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCompatibleTransport => write!(f, "no NTAG215-compatible transport detected"),
            Self::TransceiveBudgetTooSmall {
                max_transceive_length,
            } => write!(
                f,
                "transceive budget of {} bytes cannot carry a single page",
                max_transceive_length
            ),
            Self::ConnectFailed => write!(f, "failed to connect to tag"),
            Self::NotConnected => write!(f, "tag is not connected"),
            Self::TagLost => write!(f, "tag was lost"),
            Self::TransceiveFailed => write!(f, "transceive failed"),
            Self::FrameTooLong { len, max } => {
                write!(f, "frame of {} bytes exceeds maximum of {} bytes", len, max)
            }
            Self::Nak(code) => write!(f, "tag answered NAK 0x{:X}", code),
            Self::ResponseLength { expected, actual } => write!(
                f,
                "unexpected response length: expected {} bytes, got {}",
                expected, actual
            ),
            Self::EmptyResponse => write!(f, "tag returned an empty response"),
            Self::PageOutOfBounds { page, max } => {
                write!(f, "page out of bounds: {} (max {})", page, max)
            }
            Self::InvalidRange { start, end } => {
                write!(f, "invalid page range: {} > {}", start, end)
            }
            Self::InvalidDataLength { len } => write!(f, "invalid data length: {}", len),
            Self::InvalidConfig => write!(f, "invalid opcode table"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
