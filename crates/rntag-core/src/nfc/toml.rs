//! TOML opcode table parsing
//!
//! Any key may be omitted and falls back to the built-in code:
//!
//! ```toml
//! [ntag]
//! read = 0x30
//! fast_read = "0x3A"
//! manufacturer_id = 0x04
//! max_page_count = 256
//!
//! [n2]
//! select_bank = 0xA7
//! unlock_1 = 0x44
//! unlock_2 = 0x45
//! ```

use std::fs;
use std::path::Path;
use std::string::String;

use super::OpcodeTable;
use crate::error::{Error, Result};

/// TOML opcode file structure
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlOpcodeFile {
    #[serde(default)]
    ntag: TomlNtag,
    #[serde(default)]
    n2: TomlN2,
}

/// NTAG21x section
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlNtag {
    read: Option<HexOrInt>,
    write: Option<HexOrInt>,
    get_version: Option<HexOrInt>,
    fast_read: Option<HexOrInt>,
    manufacturer_id: Option<HexOrInt>,
    max_page_count: Option<HexOrInt>,
}

/// N2 bank-emulation section
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlN2 {
    get_version: Option<HexOrInt>,
    bank_count: Option<HexOrInt>,
    set_bank_count: Option<HexOrInt>,
    select_bank: Option<HexOrInt>,
    read_sig: Option<HexOrInt>,
    write: Option<HexOrInt>,
    fast_read: Option<HexOrInt>,
    fast_write: Option<HexOrInt>,
    lock: Option<HexOrInt>,
    unlock_1: Option<HexOrInt>,
    unlock_2: Option<HexOrInt>,
}

/// A number written either as a TOML integer or as a "0x.." string
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

impl HexOrInt {
    fn value(&self) -> Result<u32> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Str(s) => parse_number(s),
        }
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidConfig)
    } else {
        s.parse().map_err(|_| Error::InvalidConfig)
    }
}

/// Overwrite `slot` with `value` if present; opcodes must fit in a byte
fn apply_u8(slot: &mut u8, value: &Option<HexOrInt>) -> Result<()> {
    if let Some(v) = value {
        *slot = u8::try_from(v.value()?).map_err(|_| Error::InvalidConfig)?;
    }
    Ok(())
}

impl OpcodeTable {
    /// Load an opcode table from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|_| Error::InvalidConfig)?;
        Self::from_toml_str(&content)
    }

    /// Parse an opcode table from a TOML string, starting from the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlOpcodeFile = toml::from_str(content).map_err(|e| {
            log::debug!("opcode table parse error: {}", e);
            Error::InvalidConfig
        })?;

        let mut table = OpcodeTable::default();

        let ntag = &file.ntag;
        apply_u8(&mut table.read, &ntag.read)?;
        apply_u8(&mut table.write, &ntag.write)?;
        apply_u8(&mut table.get_version, &ntag.get_version)?;
        apply_u8(&mut table.fast_read, &ntag.fast_read)?;
        apply_u8(&mut table.manufacturer_id, &ntag.manufacturer_id)?;
        if let Some(count) = &ntag.max_page_count {
            table.max_page_count = count.value()?;
        }

        let n2 = &file.n2;
        apply_u8(&mut table.n2_get_version, &n2.get_version)?;
        apply_u8(&mut table.n2_bank_count, &n2.bank_count)?;
        apply_u8(&mut table.n2_set_bank_count, &n2.set_bank_count)?;
        apply_u8(&mut table.n2_select_bank, &n2.select_bank)?;
        apply_u8(&mut table.n2_read_sig, &n2.read_sig)?;
        apply_u8(&mut table.n2_write, &n2.write)?;
        apply_u8(&mut table.n2_fast_read, &n2.fast_read)?;
        apply_u8(&mut table.n2_fast_write, &n2.fast_write)?;
        apply_u8(&mut table.n2_lock, &n2.lock)?;
        apply_u8(&mut table.n2_unlock_1, &n2.unlock_1)?;
        apply_u8(&mut table.n2_unlock_2, &n2.unlock_2)?;

        Ok(table)
    }
}
