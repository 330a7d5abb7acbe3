//! Tag driver traits and abstractions
//!
//! This module defines the traits that reader drivers implement to give
//! the adapter access to a tag.

mod traits;

pub use traits::*;
