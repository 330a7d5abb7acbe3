//! rntag-dummy - In-memory NTAG215 emulator for testing
//!
//! This crate emulates an NTAG215 that also understands the N2
//! bank-emulation commands. The same emulated tag can be reached through a
//! page driver and a raw driver at once, which makes it useful for tests
//! and for trying the CLI without a reader.

use std::sync::{Arc, Mutex, MutexGuard};

use rntag_core::error::{Error, Result};
use rntag_core::nfc::opcodes::{ACK, PAGE_SIZE, PAGES_PER_READ};
use rntag_core::nfc::OpcodeTable;
use rntag_core::protocol::n2;
use rntag_core::transport::{PageDriver, RawDriver, TagInfo, TagTechnologies, TagTechnology};

/// NAK answered for invalid arguments
pub const NAK_INVALID_ARGUMENT: u8 = 0x00;

/// Configuration for the dummy tag
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// 7-byte UID, first byte is the manufacturer
    pub uid: [u8; 7],
    /// SAK reported during anticollision
    pub sak: u8,
    /// ATQA reported during anticollision
    pub atqa: [u8; 2],
    /// Largest frame the emulated reader can carry, in bytes
    pub max_transceive_length: usize,
    /// Pages per bank (135 for NTAG215)
    pub page_count: usize,
    /// Banks the hardware has room for
    pub max_banks: u8,
    /// Banks enabled at start
    pub bank_count: u8,
    /// GET_VERSION answer
    pub version: [u8; 8],
    /// Firmware byte reported by N2 GET_INFO
    pub firmware: u8,
    /// Answer to N2 READ_SIG
    pub signature: [u8; 32],
    /// Command codes the emulator understands
    pub opcodes: OpcodeTable,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            uid: [0x04, 0x8A, 0x5C, 0x12, 0x34, 0x56, 0x80],
            sak: 0x00,
            atqa: [0x44, 0x00],
            max_transceive_length: 253,
            page_count: 135,
            max_banks: 200,
            bank_count: 10,
            // NTAG215
            version: [0x00, 0x04, 0x04, 0x02, 0x01, 0x00, 0x11, 0x03],
            firmware: 0x11,
            signature: [0x5A; 32],
            opcodes: OpcodeTable::default(),
        }
    }
}

struct State {
    config: DummyConfig,
    banks: Vec<Vec<u8>>,
    active_bank: u8,
    bank_count: u8,
    locked: bool,
    unlock_armed: bool,
    present: bool,
    fail_after: Option<usize>,
    exchanges: usize,
    history: Vec<Vec<u8>>,
}

fn nak() -> Vec<u8> {
    vec![NAK_INVALID_ARGUMENT]
}

fn ack() -> Vec<u8> {
    vec![ACK]
}

impl State {
    fn new(config: DummyConfig) -> Self {
        let bank_size = config.page_count * PAGE_SIZE;
        let banks = (0..config.max_banks.max(1))
            .map(|_| {
                let mut mem = vec![0u8; bank_size];
                mem[..config.uid.len().min(bank_size)]
                    .copy_from_slice(&config.uid[..config.uid.len().min(bank_size)]);
                mem
            })
            .collect();
        Self {
            bank_count: config.bank_count.clamp(1, config.max_banks.max(1)),
            config,
            banks,
            active_bank: 0,
            locked: false,
            unlock_armed: false,
            present: true,
            fail_after: None,
            exchanges: 0,
            history: Vec::new(),
        }
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        if !self.present {
            return Err(Error::TagLost);
        }
        if frame.is_empty() {
            return Err(Error::TransceiveFailed);
        }
        if frame.len() > self.config.max_transceive_length {
            return Err(Error::FrameTooLong {
                len: frame.len(),
                max: self.config.max_transceive_length,
            });
        }
        if let Some(limit) = self.fail_after {
            if self.exchanges >= limit {
                log::debug!("dummy: injected failure after {} exchanges", limit);
                return Err(Error::TransceiveFailed);
            }
        }
        self.exchanges += 1;
        self.history.push(frame.to_vec());

        let resp = self.handle(frame);
        if resp.len() > self.config.max_transceive_length {
            return Err(Error::TransceiveFailed);
        }
        Ok(resp)
    }

    fn handle(&mut self, frame: &[u8]) -> Vec<u8> {
        let op = self.config.opcodes;
        let cmd = frame[0];
        let args = &frame[1..];

        // Anything but UNLOCK_2 cancels a prepared unlock
        let armed = std::mem::take(&mut self.unlock_armed);

        if frame == n2::init_apdu_frame(&op).as_bytes() {
            return ack();
        }

        if cmd == op.read {
            match args {
                [page] => self.read(self.active_bank, *page as usize),
                _ => nak(),
            }
        } else if cmd == op.write {
            match args {
                [page, data @ ..] if data.len() == PAGE_SIZE => {
                    self.write(self.active_bank, *page as usize, data)
                }
                _ => nak(),
            }
        } else if cmd == op.get_version {
            self.config.version.to_vec()
        } else if cmd == op.fast_read {
            match args {
                [start, end] => self.fast_read(self.active_bank, *start as usize, *end as usize),
                _ => nak(),
            }
        } else if cmd == op.n2_get_version || cmd == op.n2_bank_count {
            vec![self.active_bank, self.bank_count, 0x00, self.config.firmware]
        } else if cmd == op.n2_set_bank_count {
            match args {
                [count] if *count >= 1 && *count <= self.config.max_banks => {
                    self.bank_count = *count;
                    if self.active_bank >= *count {
                        self.active_bank = 0;
                    }
                    ack()
                }
                _ => nak(),
            }
        } else if cmd == op.n2_select_bank {
            match args {
                [bank] if *bank < self.bank_count => {
                    self.active_bank = *bank;
                    ack()
                }
                _ => nak(),
            }
        } else if cmd == op.n2_read_sig {
            self.config.signature.to_vec()
        } else if cmd == op.n2_write {
            match args {
                [_, _, data @ ..] if self.locked || data.len() != PAGE_SIZE => nak(),
                [page, bank, data @ ..] if *bank < self.bank_count => {
                    self.write(*bank, *page as usize, data)
                }
                _ => nak(),
            }
        } else if cmd == op.n2_fast_read {
            match args {
                [start, end, bank] if *bank < self.bank_count => {
                    self.fast_read(*bank, *start as usize, *end as usize)
                }
                _ => nak(),
            }
        } else if cmd == op.n2_fast_write {
            match args {
                [page, bank, len, data @ ..]
                    if !self.locked && *bank < self.bank_count && *len as usize == data.len() =>
                {
                    self.write(*bank, *page as usize, data)
                }
                _ => nak(),
            }
        } else if cmd == op.n2_lock {
            self.locked = true;
            ack()
        } else if cmd == op.n2_unlock_1 {
            self.unlock_armed = true;
            ack()
        } else if cmd == op.n2_unlock_2 {
            if armed {
                self.locked = false;
                ack()
            } else {
                nak()
            }
        } else {
            log::debug!("dummy: unknown command 0x{:02x}", cmd);
            nak()
        }
    }

    /// READ answers 4 pages and wraps around past the last page
    fn read(&self, bank: u8, page: usize) -> Vec<u8> {
        let pages = self.config.page_count;
        if page >= pages {
            return nak();
        }
        let mem = &self.banks[bank as usize];
        (0..PAGES_PER_READ)
            .flat_map(|i| {
                let start = ((page + i) % pages) * PAGE_SIZE;
                mem[start..start + PAGE_SIZE].iter().copied()
            })
            .collect()
    }

    fn fast_read(&self, bank: u8, start: usize, end: usize) -> Vec<u8> {
        if start > end || end >= self.config.page_count {
            return nak();
        }
        self.banks[bank as usize][start * PAGE_SIZE..(end + 1) * PAGE_SIZE].to_vec()
    }

    fn write(&mut self, bank: u8, page: usize, data: &[u8]) -> Vec<u8> {
        let offset = page * PAGE_SIZE;
        let mem = &mut self.banks[bank as usize];
        if offset + data.len() > mem.len() {
            return nak();
        }
        mem[offset..offset + data.len()].copy_from_slice(data);
        ack()
    }
}

/// An emulated tag shared by the drivers created from it
#[derive(Clone)]
pub struct DummyTag {
    state: Arc<Mutex<State>>,
}

impl DummyTag {
    /// Create a new dummy tag with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(config))),
        }
    }

    /// Create a new dummy tag with default configuration (blank NTAG215)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tag_info(&self) -> TagInfo {
        let state = self.lock_state();
        TagInfo {
            uid: state.config.uid.to_vec(),
            sak: state.config.sak,
            atqa: state.config.atqa,
        }
    }

    /// A page driver for this tag
    pub fn page_driver(&self) -> DummyPageDriver {
        DummyPageDriver(DummyDriver::new(self))
    }

    /// A raw driver for this tag
    pub fn raw_driver(&self) -> DummyRawDriver {
        DummyRawDriver(DummyDriver::new(self))
    }

    /// Both driver kinds, as a reader that supports both would report them
    pub fn technologies(&self) -> TagTechnologies {
        TagTechnologies {
            page: Some(Box::new(self.page_driver())),
            raw: Some(Box::new(self.raw_driver())),
        }
    }

    /// Every frame the tag received, oldest first
    pub fn history(&self) -> Vec<Vec<u8>> {
        self.lock_state().history.clone()
    }

    /// Forget the frame history
    pub fn clear_history(&self) {
        self.lock_state().history.clear();
    }

    /// Move the tag into or out of the field
    pub fn set_present(&self, present: bool) {
        self.lock_state().present = present;
    }

    /// Fail every exchange after `exchanges` more successful ones
    pub fn fail_after(&self, exchanges: usize) {
        let mut state = self.lock_state();
        state.fail_after = Some(state.exchanges + exchanges);
    }

    /// Whether the N2 lock is engaged
    pub fn is_locked(&self) -> bool {
        self.lock_state().locked
    }

    /// Currently active bank
    pub fn active_bank(&self) -> u8 {
        self.lock_state().active_bank
    }

    /// Copy of one bank's memory
    pub fn bank(&self, bank: u8) -> Option<Vec<u8>> {
        self.lock_state().banks.get(bank as usize).cloned()
    }

    /// Copy of the active bank's memory
    pub fn memory(&self) -> Vec<u8> {
        let state = self.lock_state();
        state.banks[state.active_bank as usize].clone()
    }
}

/// Shared session plumbing of both driver kinds
struct DummyDriver {
    tag: DummyTag,
    info: TagInfo,
    connected: bool,
}

impl DummyDriver {
    fn new(tag: &DummyTag) -> Self {
        Self {
            tag: tag.clone(),
            info: tag.tag_info(),
            connected: false,
        }
    }

    fn connect(&mut self) -> Result<()> {
        if !self.tag.lock_state().present {
            return Err(Error::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.tag.lock_state().exchange(frame)
    }

    fn max_transceive_length(&self) -> usize {
        self.tag.lock_state().config.max_transceive_length
    }
}

macro_rules! impl_tag_technology {
    ($driver:ty) => {
        impl TagTechnology for $driver {
            fn connect(&mut self) -> Result<()> {
                self.0.connect()
            }

            fn close(&mut self) -> Result<()> {
                self.0.close()
            }

            fn is_connected(&self) -> bool {
                self.0.connected
            }

            fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
                self.0.transceive(frame)
            }

            fn max_transceive_length(&self) -> usize {
                self.0.max_transceive_length()
            }

            fn tag(&self) -> &TagInfo {
                &self.0.info
            }
        }
    };
}

/// Dummy driver with native page operations
pub struct DummyPageDriver(DummyDriver);

/// Dummy driver limited to raw frames
pub struct DummyRawDriver(DummyDriver);

impl_tag_technology!(DummyPageDriver);
impl_tag_technology!(DummyRawDriver);

impl PageDriver for DummyPageDriver {
    fn read_pages(&mut self, page: u8) -> Result<Vec<u8>> {
        let read = self.0.tag.lock_state().config.opcodes.read;
        let resp = self.0.transceive(&[read, page])?;
        match resp.as_slice() {
            [code] => Err(Error::Nak(*code)),
            _ => Ok(resp),
        }
    }

    fn write_page(&mut self, page: u8, data: &[u8]) -> Result<()> {
        let write = self.0.tag.lock_state().config.opcodes.write;
        let mut frame = vec![write, page];
        frame.extend_from_slice(data);
        let resp = self.0.transceive(&frame)?;
        rntag_core::nfc::check_ack(&resp)
    }
}

impl RawDriver for DummyRawDriver {}

#[cfg(test)]
mod tests {
    use super::*;
    use rntag_core::tag::{TagAdapter, Transport, TransportKind};

    fn raw_adapter(tag: &DummyTag) -> TagAdapter {
        TagAdapter::new(Transport::Raw(Box::new(tag.raw_driver())), OpcodeTable::default())
    }

    #[test]
    fn test_probe_prefers_page_driver() {
        let tag = DummyTag::new_default();
        let adapter = TagAdapter::probe(tag.technologies(), OpcodeTable::default()).unwrap();
        assert_eq!(adapter.kind(), TransportKind::Page);
        assert_eq!(adapter.max_transceive_length(), 64);
    }

    #[test]
    fn test_write_then_read_both_kinds() {
        let tag = DummyTag::new_default();
        let techs = tag.technologies();
        let transports = [
            Transport::Page(techs.page.unwrap()),
            Transport::Raw(techs.raw.unwrap()),
        ];

        for (i, transport) in transports.into_iter().enumerate() {
            let mut adapter = TagAdapter::new(transport, OpcodeTable::default());
            let data = [0xC0, 0xFF, 0xEE, i as u8];
            adapter
                .with_session(|t| {
                    t.write_page(16, &data)?;
                    let resp = t.read_pages(16)?;
                    assert_eq!(resp.len(), 16);
                    assert_eq!(&resp[..4], &data);
                    Ok(())
                })
                .unwrap();
        }
    }

    #[test]
    fn test_read_wraps_past_last_page() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();
        session.write_page(0, &[1, 2, 3, 4]).unwrap();
        let resp = session.read_pages(133).unwrap();
        assert_eq!(&resp[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_get_version() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let version = adapter.with_session(|t| t.get_version()).unwrap();
        assert_eq!(version, vec![0x00, 0x04, 0x04, 0x02, 0x01, 0x00, 0x11, 0x03]);
    }

    #[test]
    fn test_fast_read_whole_tag() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();
        session.write_pages(4, &[0xAB; 8]).unwrap();
        tag.clear_history();

        let dump = session.fast_read(0, 134).unwrap();
        assert_eq!(dump.len(), 135 * 4);
        assert_eq!(dump, tag.memory());
        // 15 pages per exchange
        assert_eq!(tag.history().len(), 9);
    }

    #[test]
    fn test_fast_read_out_of_range_fails() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();
        assert!(matches!(
            session.fast_read(130, 140),
            Err(Error::ResponseLength { .. })
        ));
    }

    #[test]
    fn test_bank_write_and_read() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();

        let image: Vec<u8> = (0..540).map(|i| i as u8).collect();
        n2::fast_write(&mut session, 0, 3, &image).unwrap();
        assert_eq!(tag.bank(3).unwrap(), image);

        n2::write(&mut session, 4, 5, &[9, 9, 9, 9]).unwrap();
        assert_eq!(&tag.bank(5).unwrap()[16..20], &[9, 9, 9, 9]);

        let back = n2::fast_read(&mut session, 0, 134, 3).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_bank_info_and_selection() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();

        n2::set_bank_count(&mut session, 20).unwrap();
        n2::activate_bank(&mut session, 7).unwrap();
        let info = n2::N2Info::parse(&n2::get_version(&mut session).unwrap()).unwrap();
        assert_eq!(info.active_bank, 7);
        assert_eq!(info.bank_count, 20);
        assert_eq!(tag.active_bank(), 7);

        assert_eq!(n2::activate_bank(&mut session, 20), Err(Error::Nak(0x00)));
        assert_eq!(n2::read_signature(&mut session).unwrap(), vec![0x5A; 32]);
    }

    #[test]
    fn test_lock_blocks_bank_writes() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();

        n2::lock(&mut session).unwrap();
        assert!(tag.is_locked());
        assert_eq!(n2::write(&mut session, 4, 0, &[0; 4]), Err(Error::Nak(0x00)));

        n2::prepare_unlock(&mut session).unwrap();
        assert_eq!(n2::unlock(&mut session).unwrap(), vec![ACK]);
        assert!(!tag.is_locked());
        n2::write(&mut session, 4, 0, &[0; 4]).unwrap();
    }

    #[test]
    fn test_unlock_requires_prepare() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();

        n2::lock(&mut session).unwrap();
        assert_eq!(n2::unlock(&mut session).unwrap(), vec![NAK_INVALID_ARGUMENT]);
        assert!(tag.is_locked());

        // An unrelated command in between cancels the prepared unlock
        n2::prepare_unlock(&mut session).unwrap();
        n2::get_version(&mut session).unwrap();
        assert_eq!(n2::unlock(&mut session).unwrap(), vec![NAK_INVALID_ARGUMENT]);
        assert!(tag.is_locked());

        let ops = OpcodeTable::default();
        let sent: Vec<u8> = tag.history().iter().map(|f| f[0]).collect();
        assert_eq!(
            sent,
            vec![
                ops.n2_lock,
                ops.n2_unlock_2,
                ops.n2_unlock_1,
                ops.n2_get_version,
                ops.n2_unlock_2
            ]
        );
    }

    #[test]
    fn test_init_apdu_is_accepted() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let resp = adapter.with_session(n2::init_apdu).unwrap();
        assert_eq!(resp, vec![ACK]);
    }

    #[test]
    fn test_fault_aborts_bulk_read() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();
        tag.fail_after(2);
        assert_eq!(session.fast_read(0, 134), Err(Error::TransceiveFailed));
        assert_eq!(tag.history().len(), 2);
    }

    #[test]
    fn test_tag_removed() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        {
            let mut session = adapter.session().unwrap();
            tag.set_present(false);
            assert!(session.read_pages(0).unwrap_err().is_transport());
        }
        assert!(!adapter.is_connected());
        assert_eq!(adapter.session().err(), Some(Error::ConnectFailed));
    }

    #[test]
    fn test_not_connected() {
        let tag = DummyTag::new_default();
        let mut adapter = raw_adapter(&tag);
        assert_eq!(adapter.read_pages(0), Err(Error::NotConnected));
    }

    #[test]
    fn test_small_reader_budget() {
        let tag = DummyTag::new(DummyConfig {
            max_transceive_length: 27,
            ..DummyConfig::default()
        });
        let mut adapter = raw_adapter(&tag);
        let mut session = adapter.session().unwrap();
        assert!(matches!(
            session.fast_read(0, 3),
            Err(Error::TransceiveBudgetTooSmall { .. })
        ));
        assert!(tag.history().is_empty());
    }
}
