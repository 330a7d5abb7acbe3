//! Plain NTAG215 commands: info, read, write

use std::fs;
use std::path::Path;

use rntag_core::nfc::PAGE_SIZE;
use rntag_core::tag::TagAdapter;

use super::progress::IndicatifProgress;
use super::{hex, print_pages};

/// Show what was detected and what the tag reports about itself
pub fn run_info(tag: &mut TagAdapter) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = tag.session()?;

    let info = session.tag().clone();
    println!("Tag Information");
    println!("===============");
    println!();
    println!("UID:             {}", hex(&info.uid));
    println!("SAK:             0x{:02X}", info.sak);
    println!("ATQA:            {}", hex(&info.atqa));
    println!("Transport:       {}", session.kind());
    println!("Exchange budget: {} bytes", session.max_transceive_length());

    match session.get_version() {
        Ok(version) => println!("GET_VERSION:     {}", hex(&version)),
        Err(e) => println!("GET_VERSION:     failed ({})", e),
    }

    match session.read_pages(0) {
        Ok(pages) => {
            println!();
            println!("Pages 0-3:");
            print_pages(0, &pages);
        }
        Err(e) => log::warn!("Reading pages 0-3 failed: {}", e),
    }

    Ok(())
}

/// Fast-read pages `start..=end` into `output`
pub fn run_read(
    tag: &mut TagAdapter,
    output: &Path,
    start: u32,
    end: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    let data = tag.with_session(|t| t.fast_read_with_progress(start, end, &mut progress))?;

    fs::write(output, &data)?;
    println!(
        "Read {} pages ({} bytes) to {}",
        data.len() / PAGE_SIZE,
        data.len(),
        output.display()
    );
    Ok(())
}

/// Write `input` page by page starting at `start`
pub fn run_write(
    tag: &mut TagAdapter,
    input: &Path,
    start: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    if data.is_empty() {
        return Err(format!("{} is empty", input.display()).into());
    }

    let mut progress = IndicatifProgress::default();
    tag.with_session(|t| t.write_pages_with_progress(start, &data, &mut progress))?;

    println!(
        "Wrote {} pages starting at page {}",
        data.len() / PAGE_SIZE,
        start
    );
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use rntag_core::nfc::OpcodeTable;
    use rntag_dummy::DummyTag;

    fn adapter(dummy: &DummyTag) -> TagAdapter {
        TagAdapter::probe(dummy.technologies(), OpcodeTable::default()).unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rntag-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_then_read_file() {
        let dummy = DummyTag::new_default();
        let mut tag = adapter(&dummy);

        let input = temp_path("write.bin");
        let output = temp_path("read.bin");
        let payload: Vec<u8> = (0..32).collect();
        fs::write(&input, &payload).unwrap();

        run_write(&mut tag, &input, 4).unwrap();
        run_read(&mut tag, &output, 4, 11).unwrap();
        assert_eq!(fs::read(&output).unwrap(), payload);
        assert!(!tag.is_connected());

        let _ = fs::remove_file(input);
        let _ = fs::remove_file(output);
    }

    #[test]
    fn test_write_rejects_ragged_file() {
        let dummy = DummyTag::new_default();
        let mut tag = adapter(&dummy);

        let input = temp_path("ragged.bin");
        fs::write(&input, [1, 2, 3, 4, 5]).unwrap();
        assert!(run_write(&mut tag, &input, 4).is_err());
        assert!(!tag.is_connected());

        let _ = fs::remove_file(input);
    }

    #[test]
    fn test_info_closes_session() {
        let dummy = DummyTag::new_default();
        let mut tag = adapter(&dummy);
        run_info(&mut tag).unwrap();
        assert!(!tag.is_connected());
    }
}
