//! NFC command codes and frames
//!
//! This module provides the NTAG21x / N2 opcode table and the command
//! frame type handed to transports.

mod frame;
pub mod opcodes;
#[cfg(feature = "std")]
mod toml;

pub use frame::{check_ack, expect_len, Frame};
pub use opcodes::{OpcodeTable, PAGE_SIZE};
