//! Command frame construction
//!
//! Every exchange with a tag is `[opcode, operands...]`. Frames are built
//! fresh for each call and handed to the transport by reference.

use alloc::vec::Vec;

use super::opcodes::{ACK, ACK_MASK};
use crate::error::{Error, Result};

/// A single command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Create a frame with no operands (e.g., GET_VERSION, N2 LOCK)
    pub fn simple(opcode: u8) -> Self {
        Self::with_operands(opcode, &[])
    }

    /// Create a frame from an opcode and its operands
    pub fn with_operands(opcode: u8, operands: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + operands.len());
        bytes.push(opcode);
        bytes.extend_from_slice(operands);
        Self { bytes }
    }

    /// READ / WRITE style frame addressing one page: `[opcode, page]`
    ///
    /// Pages are encoded as a single byte; higher bits are dropped the same
    /// way the tag wraps out-of-range addresses.
    pub fn page(opcode: u8, page: u32) -> Self {
        Self::with_operands(opcode, &[page as u8])
    }

    /// Page frame followed by a data payload: `[opcode, page, data...]`
    pub fn page_write(opcode: u8, page: u32, data: &[u8]) -> Self {
        let mut frame = Self::page(opcode, page);
        frame.bytes.extend_from_slice(data);
        frame
    }

    /// Range frame: `[opcode, start, end]`
    pub fn range(opcode: u8, start: u32, end: u32) -> Self {
        Self::with_operands(opcode, &[start as u8, end as u8])
    }

    /// Append one operand byte
    pub fn push(mut self, byte: u8) -> Self {
        self.bytes.push(byte);
        self
    }

    /// Append several operand bytes
    pub fn extend(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// The encoded frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Check the answer to a write-type command
///
/// NTAG21x answers writes with a 4-bit ACK. Some readers strip it and hand
/// back nothing, others pass the tag's data through; only a lone non-ACK
/// nibble is treated as a rejection.
pub fn check_ack(response: &[u8]) -> Result<()> {
    match response {
        [code] if code & ACK_MASK != ACK => Err(Error::Nak(*code)),
        _ => Ok(()),
    }
}

/// Check that a response has exactly `expected` bytes
pub fn expect_len(response: &[u8], expected: usize) -> Result<()> {
    if response.len() != expected {
        return Err(Error::ResponseLength {
            expected,
            actual: response.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encoding() {
        assert_eq!(Frame::simple(0x60).as_bytes(), &[0x60]);
        assert_eq!(Frame::page(0x30, 4).as_bytes(), &[0x30, 0x04]);
        assert_eq!(
            Frame::page_write(0xA2, 16, &[1, 2, 3, 4]).as_bytes(),
            &[0xA2, 0x10, 1, 2, 3, 4]
        );
        assert_eq!(Frame::range(0x3A, 0, 0x86).as_bytes(), &[0x3A, 0x00, 0x86]);
        assert_eq!(
            Frame::range(0x3B, 1, 2).push(7).as_bytes(),
            &[0x3B, 1, 2, 7]
        );
    }

    #[test]
    fn test_addresses_wrap_to_one_byte() {
        assert_eq!(Frame::page(0x30, 0x101).as_bytes(), &[0x30, 0x01]);
        assert_eq!(Frame::range(0x3A, 0x100, 0x1FF).as_bytes(), &[0x3A, 0x00, 0xFF]);
    }

    #[test]
    fn test_check_ack() {
        assert!(check_ack(&[]).is_ok());
        assert!(check_ack(&[0x0A]).is_ok());
        assert!(check_ack(&[0xFA]).is_ok());
        assert_eq!(check_ack(&[0x00]), Err(Error::Nak(0x00)));
        assert_eq!(check_ack(&[0x05]), Err(Error::Nak(0x05)));
        assert!(check_ack(&[0x00, 0x00]).is_ok());
    }

    #[test]
    fn test_expect_len() {
        assert!(expect_len(&[0; 16], 16).is_ok());
        assert_eq!(
            expect_len(&[0; 4], 16),
            Err(Error::ResponseLength {
                expected: 16,
                actual: 4
            })
        );
    }
}
