//! NTAG21x and N2 bank-emulation opcodes
//!
//! The constants are the built-in defaults. Everything in the crate reads
//! codes through an [`OpcodeTable`] so that a different table can be
//! injected (see [`OpcodeTable::from_toml_str`] with the `std` feature).

// ============================================================================
// NTAG21x commands
// ============================================================================

/// GET_VERSION - returns the 8-byte product version
pub const CMD_GET_VERSION: u8 = 0x60;
/// READ - returns 4 pages (16 bytes) starting at the given page
pub const CMD_READ: u8 = 0x30;
/// FAST_READ - returns all pages from start to end (inclusive)
pub const CMD_FAST_READ: u8 = 0x3A;
/// WRITE - writes one page (4 bytes)
pub const CMD_WRITE: u8 = 0xA2;

// ============================================================================
// N2 bank-emulation commands
// ============================================================================

/// N2 GET_INFO - active bank, bank count, button state, firmware
pub const N2_GET_VERSION: u8 = 0x55;
/// N2 bank count query (answered with the GET_INFO layout)
pub const N2_BANK_COUNT: u8 = 0x55;
/// N2 SET_BANKCOUNT
pub const N2_SET_BANK_CNT: u8 = 0xA9;
/// N2 SELECT_BANK - make a bank the active emulated tag
pub const N2_SELECT_BANK: u8 = 0xA7;
/// N2 READ_SIG - read the stored signature
pub const N2_READ_SIG: u8 = 0x43;
/// N2 WRITE - write one page to a given bank
pub const N2_WRITE: u8 = 0xA5;
/// N2 FAST_READ - read a page range from a given bank
pub const N2_FAST_READ: u8 = 0x3B;
/// N2 FAST_WRITE - write up to 4 pages to a given bank
pub const N2_FAST_WRITE: u8 = 0xAE;
/// N2 LOCK
pub const N2_LOCK: u8 = 0x46;
/// N2 UNLOCK phase 1 (prepare)
pub const N2_UNLOCK_1: u8 = 0x44;
/// N2 UNLOCK phase 2 (commit)
pub const N2_UNLOCK_2: u8 = 0x45;

// ============================================================================
// Acknowledgements and identification
// ============================================================================

/// 4-bit ACK answered by NTAG21x on successful writes
pub const ACK: u8 = 0x0A;
/// Mask applied to single-byte answers to extract the 4-bit ACK/NAK
pub const ACK_MASK: u8 = 0x0F;

/// First UID byte of NXP-manufactured tags
pub const NXP_MANUFACTURER_ID: u8 = 0x04;
/// Upper bound used to validate single-page addresses
pub const MAX_PAGE_COUNT: u32 = 256;

/// Bytes per page
pub const PAGE_SIZE: usize = 4;
/// Pages returned by one READ command
pub const PAGES_PER_READ: usize = 4;

/// Opcode table used by the adapter and the bank protocol
///
/// This is the "externally supplied" command code table: [`Default`] gives
/// the codes above, and a table can be loaded from TOML to talk to hardware
/// that deviates from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeTable {
    /// READ
    pub read: u8,
    /// WRITE
    pub write: u8,
    /// GET_VERSION
    pub get_version: u8,
    /// FAST_READ
    pub fast_read: u8,
    /// N2 GET_INFO
    pub n2_get_version: u8,
    /// N2 bank count query
    pub n2_bank_count: u8,
    /// N2 SET_BANKCOUNT
    pub n2_set_bank_count: u8,
    /// N2 SELECT_BANK
    pub n2_select_bank: u8,
    /// N2 READ_SIG
    pub n2_read_sig: u8,
    /// N2 WRITE
    pub n2_write: u8,
    /// N2 FAST_READ
    pub n2_fast_read: u8,
    /// N2 FAST_WRITE
    pub n2_fast_write: u8,
    /// N2 LOCK
    pub n2_lock: u8,
    /// N2 UNLOCK phase 1
    pub n2_unlock_1: u8,
    /// N2 UNLOCK phase 2
    pub n2_unlock_2: u8,
    /// Manufacturer byte a raw-frame tag must carry in UID[0]
    pub manufacturer_id: u8,
    /// Page-count bound for single-page address validation
    pub max_page_count: u32,
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self {
            read: CMD_READ,
            write: CMD_WRITE,
            get_version: CMD_GET_VERSION,
            fast_read: CMD_FAST_READ,
            n2_get_version: N2_GET_VERSION,
            n2_bank_count: N2_BANK_COUNT,
            n2_set_bank_count: N2_SET_BANK_CNT,
            n2_select_bank: N2_SELECT_BANK,
            n2_read_sig: N2_READ_SIG,
            n2_write: N2_WRITE,
            n2_fast_read: N2_FAST_READ,
            n2_fast_write: N2_FAST_WRITE,
            n2_lock: N2_LOCK,
            n2_unlock_1: N2_UNLOCK_1,
            n2_unlock_2: N2_UNLOCK_2,
            manufacturer_id: NXP_MANUFACTURER_ID,
            max_page_count: MAX_PAGE_COUNT,
        }
    }
}
