//! Provisioned node identity
//!
//! Identity is written to non-volatile storage at the factory and read once
//! at startup. Image layout:
//! - Bytes 0-1: Magic (0xDE 0xAD)
//! - Byte 2: Provisioning state
//! - Byte 3: Network ID
//! - Byte 4: Node ID
//! - Bytes 5-20: Network key

use std::fmt;

use crate::{BranlyError, BranlyResult, NodeAddress};

/// Magic bytes marking a written image
pub const EEPROM_MAGIC: [u8; 2] = [0xDE, 0xAD];

/// Network key size in bytes
pub const NETWORK_KEY_SIZE: usize = 16;

const STATE_ADDR: usize = 2;
const NETWORK_ADDR: usize = 3;
const NODE_ID_ADDR: usize = 4;
const KEY_ADDR: usize = 5;

/// Total image size in bytes
pub const EEPROM_IMAGE_SIZE: usize = KEY_ADDR + NETWORK_KEY_SIZE;

/// Provisioning state stored in the image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ProvisioningState {
    /// Nothing written yet; the node has no id
    #[default]
    Factory = 0,
    /// Identity written by an installer
    Installer = 1,
    /// Deployed
    Production = 2,
}

impl ProvisioningState {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ProvisioningState::Factory),
            1 => Some(ProvisioningState::Installer),
            2 => Some(ProvisioningState::Production),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Node identity read from storage
#[derive(Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub state: ProvisioningState,
    pub network_id: u8,
    pub node: NodeAddress,
    pub key: [u8; NETWORK_KEY_SIZE],
}

impl NodeIdentity {
    /// Identity for an already provisioned node
    pub fn new(network_id: u8, node: NodeAddress, key: [u8; NETWORK_KEY_SIZE]) -> Self {
        NodeIdentity {
            state: ProvisioningState::Production,
            network_id,
            node,
            key,
        }
    }

    /// Parse a storage image. An image without magic is a factory-fresh node.
    pub fn from_eeprom(image: &[u8]) -> BranlyResult<Self> {
        if image.len() < EEPROM_IMAGE_SIZE {
            return Err(BranlyError::BufferTooShort {
                expected: EEPROM_IMAGE_SIZE,
                actual: image.len(),
            });
        }

        if image[0..2] != EEPROM_MAGIC {
            return Ok(NodeIdentity {
                state: ProvisioningState::Factory,
                network_id: 0,
                node: NodeAddress::default(),
                key: [0u8; NETWORK_KEY_SIZE],
            });
        }

        let state = ProvisioningState::from_byte(image[STATE_ADDR]).ok_or_else(|| {
            BranlyError::InvalidProvisioning(format!("unknown state {}", image[STATE_ADDR]))
        })?;

        let mut key = [0u8; NETWORK_KEY_SIZE];
        key.copy_from_slice(&image[KEY_ADDR..KEY_ADDR + NETWORK_KEY_SIZE]);

        Ok(NodeIdentity {
            state,
            network_id: image[NETWORK_ADDR],
            node: NodeAddress::new(image[NODE_ID_ADDR]),
            key,
        })
    }

    #[inline]
    pub fn is_provisioned(&self) -> bool {
        self.state != ProvisioningState::Factory
    }

    /// Fail unless the node left factory state
    pub fn require_provisioned(&self) -> BranlyResult<()> {
        if self.is_provisioned() {
            Ok(())
        } else {
            Err(BranlyError::NotProvisioned)
        }
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("state", &self.state)
            .field("network_id", &self.network_id)
            .field("node", &self.node)
            .field("key", &"<redacted>")
            .finish()
    }
}
