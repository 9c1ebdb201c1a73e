//! Branly Core - Fundamental types shared by node and collector
//!
//! This crate defines the core types used throughout the Branly stack:
//! - Identifiers (ContactId, NodeAddress)
//! - Contact kinds and reporting intervals
//! - The provisioned node identity
//! - Error types

pub mod id;
pub mod kind;
pub mod interval;
pub mod identity;
pub mod error;

pub use id::*;
pub use kind::*;
pub use interval::*;
pub use identity::*;
pub use error::*;
