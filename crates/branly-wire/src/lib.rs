//! Branly Wire Protocol - Binary packet format
//!
//! This crate implements the wire format for Branly packets:
//! - 2-byte header (type, sequence counter)
//! - Bit-packed contact entries
//! - 1 or 4 byte little-endian values
//! - A single 64-byte packet buffer

pub mod buffer;
pub mod codec;
pub mod entry;
pub mod flags;
pub mod frame;
pub mod packet;

pub use buffer::*;
pub use codec::*;
pub use entry::*;
pub use flags::*;
pub use frame::*;
pub use packet::*;
