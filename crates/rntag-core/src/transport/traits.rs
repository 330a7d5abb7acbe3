//! Tag driver trait definitions
//!
//! A detected tag can be reached through two kinds of driver:
//!
//! - [`PageDriver`]: the reader firmware or OS stack speaks the page
//!   protocol itself and exposes `read_pages` / `write_page`.
//! - [`RawDriver`]: only raw ISO14443-3A frames can be exchanged; page
//!   commands have to be encoded by the caller.
//!
//! Both share the [`TagTechnology`] session interface.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::Result;

/// Identification of a detected ISO14443A tag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagInfo {
    /// UID as reported during anticollision (7 bytes for NTAG215)
    pub uid: Vec<u8>,
    /// SEL_RES / SAK byte
    pub sak: u8,
    /// SENS_RES / ATQA bytes
    pub atqa: [u8; 2],
}

impl TagInfo {
    /// First UID byte, which carries the manufacturer code
    pub fn manufacturer(&self) -> Option<u8> {
        self.uid.first().copied()
    }
}

/// Session-level interface shared by both driver kinds
///
/// Implementations are blocking: every call returns once the radio exchange
/// has completed or failed. Timeouts are the driver's business.
pub trait TagTechnology {
    /// Open an exclusive session with the tag
    fn connect(&mut self) -> Result<()>;

    /// Release the session
    ///
    /// Must be callable after a failed `connect` and when already closed.
    fn close(&mut self) -> Result<()>;

    /// Whether a session is currently open
    fn is_connected(&self) -> bool;

    /// Send a raw frame and return the tag's answer
    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>>;

    /// Maximum number of bytes the driver can carry in one exchange
    fn max_transceive_length(&self) -> usize;

    /// The tag this driver was created for
    fn tag(&self) -> &TagInfo;
}

/// Driver with native page operations
pub trait PageDriver: TagTechnology {
    /// Read 4 pages (16 bytes) starting at `page`
    fn read_pages(&mut self, page: u8) -> Result<Vec<u8>>;

    /// Write one page
    ///
    /// `data` is expected to be 4 bytes; drivers pass it through unchecked.
    fn write_page(&mut self, page: u8, data: &[u8]) -> Result<()>;
}

/// Driver limited to raw frame exchange
pub trait RawDriver: TagTechnology {}

/// Boxed page driver as held by the adapter
pub type BoxedPageDriver = Box<dyn PageDriver + Send>;

/// Boxed raw driver as held by the adapter
pub type BoxedRawDriver = Box<dyn RawDriver + Send>;

/// Everything a reader detected for one tag
///
/// Readers may offer either driver kind or both for the same tag; the
/// adapter's probe picks one.
#[derive(Default)]
pub struct TagTechnologies {
    /// Page-oriented access, if the reader supports it for this tag
    pub page: Option<BoxedPageDriver>,
    /// Raw-frame access, if the reader supports it for this tag
    pub raw: Option<BoxedRawDriver>,
}

impl TagTechnologies {
    /// Technologies offering only page access
    pub fn page(driver: BoxedPageDriver) -> Self {
        Self {
            page: Some(driver),
            raw: None,
        }
    }

    /// Technologies offering only raw access
    pub fn raw(driver: BoxedRawDriver) -> Self {
        Self {
            page: None,
            raw: Some(driver),
        }
    }

    /// True when no driver is available
    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.raw.is_none()
    }
}

/// Information about a driver, for listings
#[derive(Debug, Clone)]
pub struct DriverInfo {
    /// Name of the driver
    pub name: &'static str,
    /// Description
    pub description: &'static str,
}
