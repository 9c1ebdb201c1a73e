//! Error types for the Branly node stack

use thiserror::Error;

/// Core Branly errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranlyError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Packet too large: needs {needed} bytes, buffer holds {capacity}")]
    PacketTooLarge { needed: usize, capacity: usize },

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u8),

    #[error("Contact id {id} does not fit in a {bits}-bit field")]
    ContactIdOutOfRange { id: u8, bits: u8 },

    // Gateway errors
    #[error("Malformed modem line: {0}")]
    MalformedModemLine(String),

    // Provisioning errors
    #[error("Node is not provisioned (factory state)")]
    NotProvisioned,

    #[error("Invalid provisioning image: {0}")]
    InvalidProvisioning(String),
}

/// Result type for Branly operations
pub type BranlyResult<T> = Result<T, BranlyError>;
