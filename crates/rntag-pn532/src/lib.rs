//! rntag-pn532 - PN532 reader support
//!
//! This crate drives an NXP PN532 over its serial (HSU) interface and
//! exposes a detected ISO14443A tag through both rntag driver kinds:
//!
//! - page driver: `InDataExchange`, the PN532 runs the MIFARE Ultralight
//!   READ/WRITE framing itself
//! - raw driver: `InCommunicateThru`, frames go to the tag unchanged
//!
//! # Example
//!
//! ```no_run
//! use rntag_core::nfc::OpcodeTable;
//! use rntag_core::tag::TagAdapter;
//! use rntag_pn532::TechnologyMode;
//!
//! let reader = rntag_pn532::open_serial("/dev/ttyUSB0", None, None)?;
//! let techs = reader.detect(TechnologyMode::Both)?;
//! let mut adapter = TagAdapter::probe(techs, OpcodeTable::default())?;
//! let dump = adapter.with_session(|tag| tag.fast_read(0, 134))?;
//! println!("{} bytes", dump.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod protocol;
pub mod transport;

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rntag_core::error::{Error as CoreError, Result as CoreResult};
use rntag_core::nfc::opcodes::{CMD_READ, CMD_WRITE, PAGE_SIZE, PAGES_PER_READ};
use rntag_core::transport::{PageDriver, RawDriver, TagInfo, TagTechnologies, TagTechnology};

// Re-exports
pub use device::Pn532;
pub use error::{Pn532Error, Result};
pub use protocol::{FirmwareVersion, TargetInfo};
pub use transport::serial::SerialTransport;
pub use transport::Transport;

/// Which driver kinds [`Pn532Reader::detect`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TechnologyMode {
    /// Page and raw driver
    #[default]
    Both,
    /// Page driver only (`InDataExchange`)
    Page,
    /// Raw driver only (`InCommunicateThru`)
    Raw,
}

impl FromStr for TechnologyMode {
    type Err = Pn532Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "page" => Ok(Self::Page),
            "raw" => Ok(Self::Raw),
            _ => Err(Pn532Error::InvalidParameter(format!(
                "mode {}, use page, raw or both",
                s
            ))),
        }
    }
}

/// Parse a serial read timeout given in milliseconds
pub fn parse_timeout_ms(s: &str) -> Result<Duration> {
    match s.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(Pn532Error::InvalidParameter(format!(
            "timeout {}, expected milliseconds > 0",
            s
        ))),
    }
}

struct Shared<T: Transport> {
    device: Pn532<T>,
    /// Logical number of the activated target, if any
    active: Option<u8>,
}

/// A PN532 shared by the drivers it hands out
pub struct Pn532Reader<T: Transport> {
    shared: Arc<Mutex<Shared<T>>>,
}

fn lock<T: Transport>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Transport + Send + 'static> Pn532Reader<T> {
    /// Wrap an initialized PN532
    pub fn new(device: Pn532<T>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                device,
                active: None,
            })),
        }
    }

    /// Firmware reported by the reader
    pub fn firmware(&self) -> FirmwareVersion {
        lock(&self.shared).device.firmware()
    }

    /// Look for a tag and return the drivers selected by `mode`
    pub fn detect(&self, mode: TechnologyMode) -> Result<TagTechnologies> {
        let target = {
            let mut shared = lock(&self.shared);
            let target = shared
                .device
                .list_passive_target()?
                .ok_or(Pn532Error::NoTarget)?;
            shared.active = Some(target.tg);
            target
        };
        log::info!("pn532: found tag {:02X?}", target.uid);

        let info = TagInfo {
            uid: target.uid,
            sak: target.sel_res,
            atqa: target.sens_res,
        };
        let driver = || Pn532Driver {
            shared: Arc::clone(&self.shared),
            info: info.clone(),
            connected: false,
        };

        let mut techs = TagTechnologies::default();
        if mode != TechnologyMode::Raw {
            techs.page = Some(Box::new(Pn532PageDriver(driver())));
        }
        if mode != TechnologyMode::Page {
            techs.raw = Some(Box::new(Pn532RawDriver(driver())));
        }
        Ok(techs)
    }
}

/// Open a PN532 on a serial port
///
/// `timeout` replaces the default one-second read timeout.
pub fn open_serial(
    device: &str,
    baud: Option<u32>,
    timeout: Option<Duration>,
) -> Result<Pn532Reader<SerialTransport>> {
    let mut transport = SerialTransport::open(device, baud)?;
    if let Some(timeout) = timeout {
        transport.set_timeout(timeout)?;
        log::debug!("pn532: read timeout {:?}", timeout);
    }
    Ok(Pn532Reader::new(Pn532::new(transport)?))
}

/// Session plumbing shared by both driver kinds
struct Pn532Driver<T: Transport> {
    shared: Arc<Mutex<Shared<T>>>,
    info: TagInfo,
    connected: bool,
}

impl<T: Transport> Pn532Driver<T> {
    fn connect(&mut self) -> CoreResult<()> {
        let mut shared = lock(&self.shared);
        if shared.active.is_none() {
            // Released by an earlier session; select it again
            let target = shared
                .device
                .list_passive_target()
                .map_err(|e| {
                    log::debug!("pn532: reselect failed: {}", e);
                    CoreError::ConnectFailed
                })?
                .ok_or(CoreError::ConnectFailed)?;
            if target.uid != self.info.uid {
                log::warn!("pn532: a different tag is in the field");
                return Err(CoreError::ConnectFailed);
            }
            shared.active = Some(target.tg);
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        let mut shared = lock(&self.shared);
        if let Some(tg) = shared.active.take() {
            shared.device.release(tg)?;
        }
        Ok(())
    }

    fn target(&self, shared: &Shared<T>) -> CoreResult<u8> {
        match shared.active {
            Some(tg) if self.connected => Ok(tg),
            _ => Err(CoreError::NotConnected),
        }
    }

    fn data_exchange(&mut self, data: &[u8]) -> CoreResult<Vec<u8>> {
        let mut shared = lock(&self.shared);
        let tg = self.target(&shared)?;
        Ok(shared.device.data_exchange(tg, data)?)
    }

    fn communicate_thru(&mut self, data: &[u8]) -> CoreResult<Vec<u8>> {
        let mut shared = lock(&self.shared);
        self.target(&shared)?;
        Ok(shared.device.communicate_thru(data)?)
    }
}

/// Page driver backed by `InDataExchange`
pub struct Pn532PageDriver<T: Transport>(Pn532Driver<T>);

/// Raw driver backed by `InCommunicateThru`
pub struct Pn532RawDriver<T: Transport>(Pn532Driver<T>);

impl<T: Transport> TagTechnology for Pn532PageDriver<T> {
    fn connect(&mut self) -> CoreResult<()> {
        self.0.connect()
    }

    fn close(&mut self) -> CoreResult<()> {
        self.0.close()
    }

    fn is_connected(&self) -> bool {
        self.0.connected
    }

    fn transceive(&mut self, frame: &[u8]) -> CoreResult<Vec<u8>> {
        self.0.data_exchange(frame)
    }

    fn max_transceive_length(&self) -> usize {
        protocol::MAX_TAG_FRAME
    }

    fn tag(&self) -> &TagInfo {
        &self.0.info
    }
}

impl<T: Transport> PageDriver for Pn532PageDriver<T> {
    fn read_pages(&mut self, page: u8) -> CoreResult<Vec<u8>> {
        let data = self.0.data_exchange(&[CMD_READ, page])?;
        rntag_core::nfc::expect_len(&data, PAGE_SIZE * PAGES_PER_READ)?;
        Ok(data)
    }

    fn write_page(&mut self, page: u8, data: &[u8]) -> CoreResult<()> {
        let mut frame = vec![CMD_WRITE, page];
        frame.extend_from_slice(data);
        self.0.data_exchange(&frame)?;
        Ok(())
    }
}

impl<T: Transport> TagTechnology for Pn532RawDriver<T> {
    fn connect(&mut self) -> CoreResult<()> {
        self.0.connect()
    }

    fn close(&mut self) -> CoreResult<()> {
        self.0.close()
    }

    fn is_connected(&self) -> bool {
        self.0.connected
    }

    fn transceive(&mut self, frame: &[u8]) -> CoreResult<Vec<u8>> {
        self.0.communicate_thru(frame)
    }

    fn max_transceive_length(&self) -> usize {
        protocol::MAX_TAG_FRAME
    }

    fn tag(&self) -> &TagInfo {
        &self.0.info
    }
}

impl<T: Transport> RawDriver for Pn532RawDriver<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::{initialized, MockTransport};
    use crate::protocol::*;
    use rntag_core::nfc::OpcodeTable;
    use rntag_core::protocol::n2;
    use rntag_core::tag::{TagAdapter, TransportKind};

    const TARGET: [u8; 13] = [
        0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04, 0x8A, 0x5C, 0x12, 0x34, 0x56, 0x80,
    ];

    fn reader_with_tag() -> Pn532Reader<MockTransport> {
        let mut pn532 = initialized();
        pn532.transport_mut().respond(CMD_IN_LIST_PASSIVE_TARGET, &TARGET);
        Pn532Reader::new(pn532)
    }

    fn script(reader: &Pn532Reader<MockTransport>, command: u8, data: &[u8]) {
        lock(&reader.shared).device.transport_mut().respond(command, data);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("page".parse::<TechnologyMode>().unwrap(), TechnologyMode::Page);
        assert_eq!("RAW".parse::<TechnologyMode>().unwrap(), TechnologyMode::Raw);
        assert!(matches!(
            "mifare".parse::<TechnologyMode>(),
            Err(Pn532Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_timeout_parse() {
        assert_eq!(parse_timeout_ms("250").unwrap(), Duration::from_millis(250));
        assert!(matches!(
            parse_timeout_ms("0"),
            Err(Pn532Error::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_timeout_ms("soon"),
            Err(Pn532Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_detect_reports_tag() {
        let reader = reader_with_tag();
        let techs = reader.detect(TechnologyMode::Raw).unwrap();
        assert!(techs.page.is_none());
        let raw = techs.raw.unwrap();
        assert_eq!(raw.tag().uid[0], 0x04);
        assert_eq!(raw.tag().sak, 0x00);
        assert_eq!(raw.max_transceive_length(), 252);
    }

    #[test]
    fn test_no_tag() {
        let mut pn532 = initialized();
        pn532.transport_mut().respond(CMD_IN_LIST_PASSIVE_TARGET, &[0x00]);
        let reader = Pn532Reader::new(pn532);
        assert!(matches!(
            reader.detect(TechnologyMode::Both),
            Err(Pn532Error::NoTarget)
        ));
    }

    #[test]
    fn test_page_session() {
        let reader = reader_with_tag();
        let techs = reader.detect(TechnologyMode::Both).unwrap();
        let mut adapter = TagAdapter::probe(techs, OpcodeTable::default()).unwrap();
        assert_eq!(adapter.kind(), TransportKind::Page);

        let mut answer = vec![0x00];
        answer.extend_from_slice(&[0x11; 16]);
        script(&reader, CMD_IN_DATA_EXCHANGE, &answer);
        script(&reader, CMD_IN_RELEASE, &[0x00]);

        let data = adapter.with_session(|tag| tag.read_pages(4)).unwrap();
        assert_eq!(data, vec![0x11; 16]);
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_raw_bank_command() {
        let reader = reader_with_tag();
        let techs = reader.detect(TechnologyMode::Raw).unwrap();
        let mut adapter = TagAdapter::probe(techs, OpcodeTable::default()).unwrap();

        script(&reader, CMD_IN_COMMUNICATE_THRU, &[0x00, 0x0A]);
        script(&reader, CMD_IN_RELEASE, &[0x00]);
        adapter
            .with_session(|tag| n2::activate_bank(tag, 2))
            .unwrap();
    }

    #[test]
    fn test_timeout_status_is_tag_lost() {
        let reader = reader_with_tag();
        let techs = reader.detect(TechnologyMode::Raw).unwrap();
        let mut adapter = TagAdapter::probe(techs, OpcodeTable::default()).unwrap();

        script(&reader, CMD_IN_COMMUNICATE_THRU, &[0x01]);
        script(&reader, CMD_IN_RELEASE, &[0x00]);
        let err = adapter.with_session(|tag| tag.get_version()).unwrap_err();
        assert_eq!(err, CoreError::TagLost);
    }

    #[test]
    fn test_transceive_requires_connect() {
        let reader = reader_with_tag();
        let mut techs = reader.detect(TechnologyMode::Raw).unwrap();
        let raw = techs.raw.as_mut().unwrap();
        assert_eq!(raw.transceive(&[0x60]), Err(CoreError::NotConnected));
    }
}
