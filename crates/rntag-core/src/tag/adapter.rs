//! NTAG215 adapter over either driver kind
//!
//! [`TagAdapter`] owns exactly one [`Transport`] and presents the same page
//! API whichever kind it is. Page-level calls validate their index against
//! the opcode table; range calls go through the chunking in [`super::bulk`].

use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use super::bulk::{self, NoProgress, TransferProgress};
use crate::error::{Error, Result};
use crate::nfc::{check_ack, Frame, OpcodeTable, PAGE_SIZE};
use crate::transport::{BoxedPageDriver, BoxedRawDriver, TagInfo, TagTechnologies};

/// The driver an adapter talks through
pub enum Transport {
    /// Driver with native page operations
    Page(BoxedPageDriver),
    /// Driver that only exchanges raw frames
    Raw(BoxedRawDriver),
}

/// Which kind of driver is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Page-oriented driver
    Page,
    /// Raw-frame driver
    Raw,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

impl Transport {
    /// Which kind of driver this is
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Page(_) => TransportKind::Page,
            Self::Raw(_) => TransportKind::Raw,
        }
    }

    fn connect(&mut self) -> Result<()> {
        match self {
            Self::Page(d) => d.connect(),
            Self::Raw(d) => d.connect(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Page(d) => d.close(),
            Self::Raw(d) => d.close(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Page(d) => d.is_connected(),
            Self::Raw(d) => d.is_connected(),
        }
    }

    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Page(d) => d.transceive(frame),
            Self::Raw(d) => d.transceive(frame),
        }
    }

    fn max_transceive_length(&self) -> usize {
        match self {
            Self::Page(d) => d.max_transceive_length(),
            Self::Raw(d) => d.max_transceive_length(),
        }
    }

    fn tag(&self) -> &TagInfo {
        match self {
            Self::Page(d) => d.tag(),
            Self::Raw(d) => d.tag(),
        }
    }
}

/// Lowercase hex rendering for trace logs
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Page-level access to one NTAG215 (or N2 emulator)
pub struct TagAdapter {
    transport: Transport,
    opcodes: OpcodeTable,
    max_transceive_length: usize,
}

impl TagAdapter {
    /// Wrap a driver
    ///
    /// The per-exchange byte budget is fixed here as
    /// `driver_max / 4 + 1`.
    pub fn new(transport: Transport, opcodes: OpcodeTable) -> Self {
        let max_transceive_length = transport.max_transceive_length() / 4 + 1;
        log::debug!(
            "{} transport, driver max {} bytes, adapter budget {} bytes",
            transport.kind(),
            transport.max_transceive_length(),
            max_transceive_length
        );
        Self {
            transport,
            opcodes,
            max_transceive_length,
        }
    }

    /// Pick a driver for a detected tag
    ///
    /// A page driver is always preferred. A raw driver is only accepted for
    /// a tag with SAK 0x00 whose UID starts with the table's manufacturer ID.
    pub fn probe(technologies: TagTechnologies, opcodes: OpcodeTable) -> Result<Self> {
        if let Some(driver) = technologies.page {
            return Ok(Self::new(Transport::Page(driver), opcodes));
        }

        if let Some(driver) = technologies.raw {
            let tag = driver.tag();
            if tag.sak == 0x00 && tag.manufacturer() == Some(opcodes.manufacturer_id) {
                return Ok(Self::new(Transport::Raw(driver), opcodes));
            }
            log::debug!(
                "raw tag rejected: sak 0x{:02x}, uid {}",
                tag.sak,
                Hex(&tag.uid)
            );
        }

        Err(Error::NoCompatibleTransport)
    }

    /// Open the session with the tag
    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect()
    }

    /// Close the session; harmless if it was never opened
    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }

    /// Whether a session is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect and return a guard that closes the session when dropped
    ///
    /// If connecting fails the transport is closed before returning.
    pub fn session(&mut self) -> Result<Session<'_>> {
        if let Err(e) = self.connect() {
            log::debug!("connect failed: {}", e);
            if let Err(close_err) = self.close() {
                log::debug!("close after failed connect: {}", close_err);
            }
            return Err(e);
        }
        Ok(Session { adapter: self })
    }

    /// Run `f` inside a session
    pub fn with_session<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TagAdapter) -> Result<T>,
    {
        let mut session = self.session()?;
        f(&mut *session)
    }

    /// The detected tag
    pub fn tag(&self) -> &TagInfo {
        self.transport.tag()
    }

    /// Which driver kind is active
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Opcode table in use
    pub fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    /// Per-exchange byte budget used to size bulk transfers
    pub fn max_transceive_length(&self) -> usize {
        self.max_transceive_length
    }

    fn validate_page(&self, page: u32) -> Result<()> {
        if page >= self.opcodes.max_page_count {
            return Err(Error::PageOutOfBounds {
                page,
                max: self.opcodes.max_page_count,
            });
        }
        Ok(())
    }

    /// Read 4 pages (16 bytes) starting at `page`
    pub fn read_pages(&mut self, page: u32) -> Result<Vec<u8>> {
        self.validate_page(page)?;
        if let Transport::Page(d) = &mut self.transport {
            return d.read_pages(page as u8);
        }
        let frame = Frame::page(self.opcodes.read, page);
        self.transceive(frame.as_bytes())
    }

    /// Write one page
    ///
    /// `data` should be 4 bytes; it is sent as given.
    pub fn write_page(&mut self, page: u32, data: &[u8]) -> Result<()> {
        self.validate_page(page)?;
        if data.len() != PAGE_SIZE {
            log::warn!("writing {} bytes to page {}", data.len(), page);
        }
        if let Transport::Page(d) = &mut self.transport {
            return d.write_page(page as u8, data);
        }
        let frame = Frame::page_write(self.opcodes.write, page, data);
        let resp = self.transceive(frame.as_bytes())?;
        check_ack(&resp)
    }

    /// Send a raw frame and return the tag's answer
    pub fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        log::trace!("> {}", Hex(frame));
        match self.transport.transceive(frame) {
            Ok(resp) => {
                log::trace!("< {}", Hex(&resp));
                Ok(resp)
            }
            Err(e) => {
                log::debug!("transceive of {} bytes failed: {}", frame.len(), e);
                Err(e)
            }
        }
    }

    /// GET_VERSION, raw answer
    pub fn get_version(&mut self) -> Result<Vec<u8>> {
        let frame = Frame::simple(self.opcodes.get_version);
        self.transceive(frame.as_bytes())
    }

    /// FAST_READ pages `start..=end`, split to fit the budget
    pub fn fast_read(&mut self, start: u32, end: u32) -> Result<Vec<u8>> {
        self.fast_read_with_progress(start, end, &mut NoProgress)
    }

    /// [`fast_read`](Self::fast_read) with progress reporting
    pub fn fast_read_with_progress<P>(&mut self, start: u32, end: u32, progress: &mut P) -> Result<Vec<u8>>
    where
        P: TransferProgress + ?Sized,
    {
        let opcode = self.opcodes.fast_read;
        let max = self.max_transceive_length;
        bulk::fast_read_with_progress(
            max,
            start,
            end,
            |s, e| self.transceive(Frame::range(opcode, s, e).as_bytes()),
            progress,
        )
    }

    /// Write consecutive pages starting at `start`, one exchange each
    pub fn write_pages(&mut self, start: u32, data: &[u8]) -> Result<()> {
        self.write_pages_with_progress(start, data, &mut NoProgress)
    }

    /// [`write_pages`](Self::write_pages) with progress reporting
    pub fn write_pages_with_progress<P>(&mut self, start: u32, data: &[u8], progress: &mut P) -> Result<()>
    where
        P: TransferProgress + ?Sized,
    {
        bulk::write_pages_with_progress(start, data, |page, chunk| self.write_page(page, chunk), progress)
    }
}

/// An open tag session; closes the transport on drop
pub struct Session<'a> {
    adapter: &'a mut TagAdapter,
}

impl Deref for Session<'_> {
    type Target = TagAdapter;

    fn deref(&self) -> &TagAdapter {
        self.adapter
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut TagAdapter {
        self.adapter
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.adapter.close() {
            log::warn!("failed to close tag session: {}", e);
        }
    }
}
