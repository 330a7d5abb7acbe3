//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range (0-255): {}", s))
}

/// Last user-visible page of an NTAG215
const NTAG215_LAST_PAGE: u32 = 134;

#[derive(Parser)]
#[command(name = "rntag")]
#[command(author, version, about = "NTAG215 and N2 bank tag tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Opcode table (TOML) overriding the built-in command codes
    #[arg(long, global = true)]
    pub opcodes: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Driver selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DriverArgs {
    /// Driver to use, with options: name[:key=value,...]
    ///
    /// Examples: "dummy", "dummy:max=64,mode=raw",
    /// "pn532:dev=/dev/ttyUSB0,baud=115200,timeout=500,mode=page"
    #[arg(short, long)]
    pub driver: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tag identification and GET_VERSION
    Info {
        #[command(flatten)]
        driver: DriverArgs,
    },

    /// Read a page range to a file
    Read {
        #[command(flatten)]
        driver: DriverArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First page (hex with 0x prefix or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Last page, inclusive
        #[arg(long, value_parser = parse_hex_u32, default_value_t = NTAG215_LAST_PAGE)]
        end: u32,
    },

    /// Write a file page by page
    Write {
        #[command(flatten)]
        driver: DriverArgs,

        /// Input file path (length must be a multiple of 4)
        #[arg(short, long)]
        input: PathBuf,

        /// First page to write
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,
    },

    /// N2 bank operations
    Bank {
        #[command(flatten)]
        driver: DriverArgs,

        #[command(subcommand)]
        command: BankCommands,
    },

    /// List available drivers
    ListDrivers,
}

#[derive(Subcommand)]
pub enum BankCommands {
    /// Show active bank, bank count, button and firmware
    Info,

    /// Show the raw bank count answer
    Count,

    /// Set how many banks are in use
    SetCount {
        /// Number of banks
        #[arg(value_parser = parse_hex_u8)]
        count: u8,
    },

    /// Make a bank the active one
    Activate {
        /// Bank index
        #[arg(value_parser = parse_hex_u8)]
        bank: u8,
    },

    /// Read the 32-byte signature
    Signature,

    /// Lock the bank configuration
    Lock,

    /// Unlock the bank configuration (prepare, then unlock)
    Unlock,

    /// Send the init APDU
    Init,

    /// Read a page range of one bank to a file
    Read {
        /// Bank index
        #[arg(short, long, value_parser = parse_hex_u8)]
        bank: u8,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First page
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Last page, inclusive
        #[arg(long, value_parser = parse_hex_u32, default_value_t = NTAG215_LAST_PAGE)]
        end: u32,
    },

    /// Write a file into one bank
    Write {
        /// Bank index
        #[arg(short, long, value_parser = parse_hex_u8)]
        bank: u8,

        /// Input file path (length must be a multiple of 4)
        #[arg(short, long)]
        input: PathBuf,

        /// First page to write
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Use 16-byte fast writes instead of one write per page
        #[arg(long)]
        fast: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x10"), Ok(16));
        assert_eq!(parse_hex_u32("0X86"), Ok(134));
        assert_eq!(parse_hex_u32("42"), Ok(42));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("").is_err());
    }

    #[test]
    fn test_parse_hex_u8_range() {
        assert_eq!(parse_hex_u8("0xFF"), Ok(255));
        assert!(parse_hex_u8("256").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_defaults_cover_ntag215() {
        let cli = Cli::parse_from(["rntag", "read", "-d", "dummy", "-o", "dump.bin"]);
        match cli.command {
            Commands::Read { start, end, .. } => {
                assert_eq!(start, 0);
                assert_eq!(end, 134);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_bank_subcommand() {
        let cli = Cli::parse_from(["rntag", "bank", "-d", "dummy", "activate", "0x03"]);
        match cli.command {
            Commands::Bank {
                driver,
                command: BankCommands::Activate { bank },
            } => {
                assert_eq!(driver.driver, "dummy");
                assert_eq!(bank, 3);
            }
            _ => panic!("expected bank activate"),
        }
    }
}
