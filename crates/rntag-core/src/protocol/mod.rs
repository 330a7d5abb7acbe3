//! Vendor protocol extensions
//!
//! This module contains the command sets layered on top of the plain
//! NTAG215 page protocol.

pub mod n2;

pub use n2::N2Info;
