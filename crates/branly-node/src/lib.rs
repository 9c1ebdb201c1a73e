//! Branly Node - sensor node runtime
//!
//! A node owns a set of contacts and a radio uplink. Driven by repeated
//! calls to [`Node::step`], it:
//! 1. Announces itself (Hello)
//! 2. Sends its contact list
//! 3. Sends a full contact report
//! 4. Reports each contact on its own timer or on demand
//!
//! Repeated bring-up failures back off and eventually degrade the node to
//! local-only operation with periodic uplink probes.

pub mod contact;
pub mod node;
pub mod retry;
pub mod source;
pub mod transport;

pub use contact::*;
pub use node::*;
pub use retry::*;
pub use source::*;
pub use transport::*;
