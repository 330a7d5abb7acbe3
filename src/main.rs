//! rntag - NTAG215 and N2 bank tag tool
//!
//! Reads and writes NTAG215 tags and drives N2 bank emulators through a
//! reader that exposes either page commands or raw frames.
//!
//! # Architecture
//!
//! Drivers (`dummy`, `pn532`) report the technologies a detected tag can be
//! reached through. `TagAdapter` picks one and offers the same page-level
//! operations over both, so the commands here do not care which reader is
//! attached.

mod cli;
mod commands;
mod registry;

use clap::Parser;
use cli::{Cli, Commands};
use registry::open_tag;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let opcodes = match commands::load_opcode_table(cli.opcodes.as_deref()) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Info { driver } => {
            let mut tag = open_tag(&driver.driver, opcodes)?;
            commands::tag::run_info(&mut tag)
        }
        Commands::Read {
            driver,
            output,
            start,
            end,
        } => {
            let mut tag = open_tag(&driver.driver, opcodes)?;
            commands::tag::run_read(&mut tag, &output, start, end)
        }
        Commands::Write {
            driver,
            input,
            start,
        } => {
            let mut tag = open_tag(&driver.driver, opcodes)?;
            commands::tag::run_write(&mut tag, &input, start)
        }
        Commands::Bank { driver, command } => {
            let mut tag = open_tag(&driver.driver, opcodes)?;
            commands::bank::run(&mut tag, command)
        }
        Commands::ListDrivers => {
            commands::list_drivers();
            Ok(())
        }
    }
}
