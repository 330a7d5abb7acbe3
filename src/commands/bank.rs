//! N2 bank commands

use std::fs;
use std::path::Path;

use rntag_core::nfc::PAGE_SIZE;
use rntag_core::protocol::{n2, N2Info};
use rntag_core::tag::TagAdapter;

use super::progress::IndicatifProgress;
use super::{hex, print_pages};
use crate::cli::BankCommands;

/// Run one bank subcommand inside a session
pub fn run(tag: &mut TagAdapter, command: BankCommands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        BankCommands::Info => {
            let info = tag.with_session(|t| {
                let raw = n2::get_version(t)?;
                log::debug!("N2 GET_INFO answer: {}", hex(&raw));
                N2Info::parse(&raw)
            })?;
            println!("Active bank:     {}", info.active_bank);
            println!("Bank count:      {}", info.bank_count);
            println!("Button:          0x{:02X}", info.button);
            println!("Firmware:        0x{:02X}", info.firmware);
        }
        BankCommands::Count => {
            let raw = tag.with_session(n2::get_bank_count)?;
            println!("Bank count answer: {}", hex(&raw));
        }
        BankCommands::SetCount { count } => {
            tag.with_session(|t| n2::set_bank_count(t, count))?;
            println!("Bank count set to {}", count);
        }
        BankCommands::Activate { bank } => {
            tag.with_session(|t| n2::activate_bank(t, bank))?;
            println!("Bank {} active", bank);
        }
        BankCommands::Signature => {
            let sig = tag.with_session(n2::read_signature)?;
            println!("Signature: {}", hex(&sig));
        }
        BankCommands::Lock => {
            let resp = tag.with_session(n2::lock)?;
            println!("Lock answer: {}", hex(&resp));
        }
        BankCommands::Unlock => {
            let (prepare, unlock) = tag.with_session(|t| {
                let prepare = n2::prepare_unlock(t)?;
                let unlock = n2::unlock(t)?;
                Ok((prepare, unlock))
            })?;
            println!("Prepare answer: {}", hex(&prepare));
            println!("Unlock answer:  {}", hex(&unlock));
        }
        BankCommands::Init => {
            let resp = tag.with_session(n2::init_apdu)?;
            println!("Init answer: {}", hex(&resp));
        }
        BankCommands::Read {
            bank,
            output,
            start,
            end,
        } => run_read(tag, bank, &output, start, end)?,
        BankCommands::Write {
            bank,
            input,
            start,
            fast,
        } => run_write(tag, bank, &input, start, fast)?,
    }
    Ok(())
}

fn run_read(
    tag: &mut TagAdapter,
    bank: u8,
    output: &Path,
    start: u32,
    end: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    let data =
        tag.with_session(|t| n2::fast_read_with_progress(t, start, end, bank, &mut progress))?;

    fs::write(output, &data)?;
    println!(
        "Read {} pages of bank {} to {}",
        data.len() / PAGE_SIZE,
        bank,
        output.display()
    );
    if log::log_enabled!(log::Level::Debug) {
        print_pages(start, &data);
    }
    Ok(())
}

fn run_write(
    tag: &mut TagAdapter,
    bank: u8,
    input: &Path,
    start: u32,
    fast: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    if data.is_empty() {
        return Err(format!("{} is empty", input.display()).into());
    }

    let mut progress = IndicatifProgress::default();
    tag.with_session(|t| {
        if fast {
            n2::fast_write_with_progress(t, start, bank, &data, &mut progress)
        } else {
            n2::write_with_progress(t, start, bank, &data, &mut progress)
        }
    })?;

    println!(
        "Wrote {} bytes to bank {} starting at page {}",
        data.len(),
        bank,
        start
    );
    Ok(())
}
