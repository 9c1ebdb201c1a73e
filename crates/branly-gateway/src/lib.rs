//! Branly Gateway - collector side of the uplink
//!
//! Reads the gateway modem's serial lines, decodes the radio packets they
//! carry and keeps a registry of nodes, their contacts and the last value
//! each contact reported.

pub mod collector;
pub mod modem;

pub use collector::*;
pub use modem::*;
