//! rntag-core - Core library for NTAG215 tags and N2 bank emulators
//!
//! This crate provides page-level access to NTAG215-class NFC tags through
//! one of two driver kinds, chunked bulk transfers sized to the reader's
//! frame budget, and the N2 bank-emulation command set. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Features
//!
//! - `std` - Enable standard library support and TOML opcode tables
//!
//! # Example
//!
//! ```ignore
//! use rntag_core::{tag::TagAdapter, nfc::OpcodeTable};
//!
//! fn dump(techs: TagTechnologies) -> rntag_core::Result<Vec<u8>> {
//!     let mut adapter = TagAdapter::probe(techs, OpcodeTable::default())?;
//!     let mut session = adapter.session()?;
//!     session.fast_read(0, 134)
//! }
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

pub mod error;
pub mod nfc;
pub mod protocol;
pub mod tag;
pub mod transport;

pub use error::{Error, Result};
