//! CLI command implementations
//!
//! Every command that talks to a tag opens a session first and lets the
//! session guard close it again, whatever the outcome.

pub mod bank;
mod list;
mod progress;
pub mod tag;

use rntag_core::nfc::OpcodeTable;
use std::path::Path;

pub use list::list_drivers;

/// Load the opcode table from `path`, or the built-in table if none given
pub fn load_opcode_table(path: Option<&Path>) -> Result<OpcodeTable, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let table = OpcodeTable::from_toml_file(path)
                .map_err(|e| format!("Failed to load opcode table {}: {}", path.display(), e))?;
            log::info!("Loaded opcode table from {}", path.display());
            Ok(table)
        }
        None => Ok(OpcodeTable::default()),
    }
}

/// Format bytes as space-separated upper-case hex
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print a memory dump, one page per line
pub(crate) fn print_pages(start: u32, data: &[u8]) {
    for (i, page) in data.chunks(4).enumerate() {
        println!("  {:3}: {}", start as usize + i, hex(page));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x04, 0xAB, 0x00]), "04 AB 00");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_default_opcode_table() {
        assert_eq!(load_opcode_table(None).unwrap(), OpcodeTable::default());
    }

    #[test]
    fn test_missing_opcode_file() {
        let err = load_opcode_table(Some(Path::new("/nonexistent/opcodes.toml"))).unwrap_err();
        assert!(err.to_string().contains("opcodes.toml"));
    }
}
