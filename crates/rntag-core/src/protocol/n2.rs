//! N2 bank-emulation command set
//!
//! Bank emulators hold several amiibo images ("banks") and expose extra
//! commands on top of NTAG215 to pick, fill, and protect them. Every call
//! here is one frame (or one chunked sequence of frames) through
//! [`TagAdapter::transceive`]; any state such as the two-phase unlock lives
//! on the hardware.
//!
//! Failures are reported as typed errors. A caller that only cares whether
//! the command went through can use `.is_ok()` or `.ok()`.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::nfc::{check_ack, Frame, OpcodeTable, PAGE_SIZE};
use crate::tag::bulk::{self, NoProgress, TransferProgress};
use crate::tag::TagAdapter;

/// Decoded answer to the N2 GET_INFO command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct N2Info {
    /// Currently active bank
    pub active_bank: u8,
    /// Number of banks in use
    pub bank_count: u8,
    /// Button state byte
    pub button: u8,
    /// Firmware version byte
    pub firmware: u8,
}

impl N2Info {
    /// Decode a GET_INFO response (at least 4 bytes)
    pub fn parse(response: &[u8]) -> Result<Self> {
        match response {
            [active_bank, bank_count, button, firmware, ..] => Ok(Self {
                active_bank: *active_bank,
                bank_count: *bank_count,
                button: *button,
                firmware: *firmware,
            }),
            _ => Err(Error::ResponseLength {
                expected: 4,
                actual: response.len(),
            }),
        }
    }
}

/// GET_INFO, raw answer (see [`N2Info::parse`])
pub fn get_version(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_get_version);
    tag.transceive(frame.as_bytes())
}

/// Query the bank count, raw answer
pub fn get_bank_count(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_bank_count);
    tag.transceive(frame.as_bytes())
}

/// Set how many banks the emulator cycles through
///
/// Only a NAK answer is treated as failure; any other answer is discarded.
pub fn set_bank_count(tag: &mut TagAdapter, count: u8) -> Result<()> {
    let frame = Frame::with_operands(tag.opcodes().n2_set_bank_count, &[count]);
    check_ack(&tag.transceive(frame.as_bytes())?)
}

/// Make `bank` the active emulated tag
pub fn activate_bank(tag: &mut TagAdapter, bank: u8) -> Result<()> {
    let frame = Frame::with_operands(tag.opcodes().n2_select_bank, &[bank]);
    check_ack(&tag.transceive(frame.as_bytes())?)
}

/// Read the stored signature, raw answer
pub fn read_signature(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_read_sig);
    tag.transceive(frame.as_bytes())
}

/// Read pages `start..=end` of `bank`, split to fit the transceive budget
pub fn fast_read(tag: &mut TagAdapter, start: u32, end: u32, bank: u8) -> Result<Vec<u8>> {
    fast_read_with_progress(tag, start, end, bank, &mut NoProgress)
}

/// [`fast_read`] with progress reporting
pub fn fast_read_with_progress<P>(
    tag: &mut TagAdapter,
    start: u32,
    end: u32,
    bank: u8,
    progress: &mut P,
) -> Result<Vec<u8>>
where
    P: TransferProgress + ?Sized,
{
    let opcode = tag.opcodes().n2_fast_read;
    let max = tag.max_transceive_length();
    bulk::fast_read_with_progress(
        max,
        start,
        end,
        |s, e| tag.transceive(Frame::range(opcode, s, e).push(bank).as_bytes()),
        progress,
    )
}

/// Write `data` to `bank` one page per exchange, starting at `addr`
///
/// `data` must be a whole number of pages; anything else is rejected
/// before the first exchange.
pub fn write(tag: &mut TagAdapter, addr: u32, bank: u8, data: &[u8]) -> Result<()> {
    write_with_progress(tag, addr, bank, data, &mut NoProgress)
}

/// [`write`] with progress reporting
pub fn write_with_progress<P>(
    tag: &mut TagAdapter,
    addr: u32,
    bank: u8,
    data: &[u8],
    progress: &mut P,
) -> Result<()>
where
    P: TransferProgress + ?Sized,
{
    if data.len() % PAGE_SIZE != 0 {
        return Err(Error::InvalidDataLength { len: data.len() });
    }
    let opcode = tag.opcodes().n2_write;
    bulk::write_pages_with_progress(
        addr,
        data,
        |page, chunk| {
            let frame = Frame::page(opcode, page).push(bank).extend(chunk);
            check_ack(&tag.transceive(frame.as_bytes())?)
        },
        progress,
    )
}

/// Write `data` to `bank` in 16-byte snippets starting at `addr`
pub fn fast_write(tag: &mut TagAdapter, addr: u32, bank: u8, data: &[u8]) -> Result<()> {
    fast_write_with_progress(tag, addr, bank, data, &mut NoProgress)
}

/// [`fast_write`] with progress reporting
pub fn fast_write_with_progress<P>(
    tag: &mut TagAdapter,
    addr: u32,
    bank: u8,
    data: &[u8],
    progress: &mut P,
) -> Result<()>
where
    P: TransferProgress + ?Sized,
{
    let opcode = tag.opcodes().n2_fast_write;
    bulk::fast_write_with_progress(
        addr,
        data,
        |page, snippet| {
            let frame = Frame::page(opcode, page)
                .push(bank)
                .push(snippet.len() as u8)
                .extend(snippet);
            check_ack(&tag.transceive(frame.as_bytes())?)
        },
        progress,
    )
}

/// Lock the emulator, raw answer
pub fn lock(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_lock);
    tag.transceive(frame.as_bytes())
}

/// First unlock phase, raw answer
pub fn prepare_unlock(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_unlock_1);
    tag.transceive(frame.as_bytes())
}

/// Second unlock phase, raw answer
///
/// The hardware only honours this after [`prepare_unlock`].
pub fn unlock(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = Frame::simple(tag.opcodes().n2_unlock_2);
    tag.transceive(frame.as_bytes())
}

/// Vendor initialisation frame sent to fresh bank emulators
pub fn init_apdu_frame(op: &OpcodeTable) -> Frame {
    Frame::with_operands(
        0xF4,
        &[
            0x49, 0x9B, 0x99, 0xC3, 0xDA, 0x57, 0x71, 0x0A, 0x64, 0x4A, 0x9E, 0xF8, op.write, op.read, 0xD9,
        ],
    )
}

/// Send the vendor initialisation frame, raw answer
pub fn init_apdu(tag: &mut TagAdapter) -> Result<Vec<u8>> {
    let frame = init_apdu_frame(tag.opcodes());
    tag.transceive(frame.as_bytes())
}
