//! Fixed-capacity packet buffer

use branly_core::{BranlyError, BranlyResult};

/// Radio payload budget in bytes
pub const PACKET_CAPACITY: usize = 64;

/// Holds at most one packet
#[derive(Clone)]
pub struct PacketBuffer {
    data: [u8; PACKET_CAPACITY],
    len: usize,
}

impl PacketBuffer {
    pub fn new() -> Self {
        PacketBuffer {
            data: [0u8; PACKET_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        PACKET_CAPACITY - self.len
    }

    /// Append one byte
    pub fn push(&mut self, b: u8) -> BranlyResult<()> {
        self.ensure_room(1)?;
        self.data[self.len] = b;
        self.len += 1;
        Ok(())
    }

    /// Append a slice
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> BranlyResult<()> {
        self.ensure_room(bytes.len())?;
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Unfilled tail, for writers that encode in place
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `n` bytes of the tail as written
    pub fn advance(&mut self, n: usize) -> BranlyResult<()> {
        self.ensure_room(n)?;
        self.len += n;
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Fail unless `n` more bytes fit
    pub fn ensure_room(&self, n: usize) -> BranlyResult<()> {
        if n > self.remaining() {
            return Err(BranlyError::PacketTooLarge {
                needed: self.len + n,
                capacity: PACKET_CAPACITY,
            });
        }
        Ok(())
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PacketBuffer({:02x?})", self.as_slice())
    }
}
