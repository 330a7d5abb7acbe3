//! NTAG215 adapter and bulk transfers
//!
//! - [`TagAdapter`]: one tag behind one driver, page-level API
//! - [`bulk`]: range reads and multi-page writes sized to the transceive budget

mod adapter;
pub mod bulk;
#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{Session, TagAdapter, Transport, TransportKind};
pub use bulk::{NoProgress, TransferProgress};
