//! Identity types for Branly nodes and contacts
//!
//! Contact ids are 4-bit on the wire in value and report entries, so a
//! node can address at most 16 contacts.

use std::fmt;

use crate::{BranlyError, BranlyResult};

/// Width of the contact id field in value/report entries
pub const CONTACT_ID_BITS: u8 = 4;

/// Width of the contact id field in contact-list entries
pub const CONTACT_LIST_ID_BITS: u8 = 3;

/// Contact identity, unique within a node (0-15)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContactId(u8);

impl ContactId {
    pub const MAX: u8 = (1 << CONTACT_ID_BITS) - 1;

    /// Create a contact id, rejecting values that do not fit in 4 bits
    pub fn new(id: u8) -> BranlyResult<Self> {
        if id > Self::MAX {
            return Err(BranlyError::ContactIdOutOfRange {
                id,
                bits: CONTACT_ID_BITS,
            });
        }
        Ok(ContactId(id))
    }

    /// Create from the low nibble of a wire byte
    #[inline]
    pub fn from_nibble(n: u8) -> Self {
        ContactId(n & 0x0F)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Can this id be represented in a contact-list entry?
    #[inline]
    pub fn fits_contact_list(self) -> bool {
        self.0 < (1 << CONTACT_LIST_ID_BITS)
    }
}

impl TryFrom<u8> for ContactId {
    type Error = BranlyError;

    fn try_from(id: u8) -> BranlyResult<Self> {
        ContactId::new(id)
    }
}

impl fmt::Debug for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contact({})", self.0)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Radio address of a node within its network
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeAddress(pub u8);

impl NodeAddress {
    #[inline]
    pub fn new(id: u8) -> Self {
        NodeAddress(id)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:02x})", self.0)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
