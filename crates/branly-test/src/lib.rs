//! Branly Test Harness - simulation and end-to-end validation
//!
//! This crate provides:
//! - A seeded lossy radio implementing the node transport
//! - A virtual clock implementing node power control
//! - Node-to-collector scenarios over modem lines

pub mod clock;
pub mod radio;
pub mod scenario;

pub use clock::*;
pub use radio::*;
pub use scenario::*;
