//! Packet header for the Branly wire protocol
//!
//! Every packet starts with a 2-byte header:
//! - Byte 0: Packet type
//! - Byte 1: Sequence counter (wraps mod 256)

use branly_core::{BranlyError, BranlyResult};

/// Header size in bytes
pub const HEADER_SIZE: usize = 2;

/// Packet type identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Node identity: hw version, sw version, boot status
    Hello = 0,
    /// Header only, liveness
    Ping = 1,
    /// One entry per registered contact
    ContactList = 2,
    /// Values of every contact
    ContactReport = 3,
    /// Value of a single contact
    ContactValue = 4,
}

impl PacketType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(PacketType::Hello),
            1 => Some(PacketType::Ping),
            2 => Some(PacketType::ContactList),
            3 => Some(PacketType::ContactReport),
            4 => Some(PacketType::ContactValue),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Parsed packet header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: PacketType,
    pub seq: u8,
}

impl PacketHeader {
    pub fn new(packet_type: PacketType, seq: u8) -> Self {
        PacketHeader { packet_type, seq }
    }

    /// Parse header from the first two bytes
    pub fn parse(buf: &[u8]) -> BranlyResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(BranlyError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let packet_type =
            PacketType::from_byte(buf[0]).ok_or(BranlyError::UnknownPacketType(buf[0]))?;

        Ok(PacketHeader {
            packet_type,
            seq: buf[1],
        })
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        [self.packet_type.to_byte(), self.seq]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_roundtrip() {
        for t in [
            PacketType::Hello,
            PacketType::Ping,
            PacketType::ContactList,
            PacketType::ContactReport,
            PacketType::ContactValue,
        ] {
            assert_eq!(PacketType::from_byte(t.to_byte()), Some(t));
        }
        assert_eq!(PacketType::from_byte(5), None);
    }

    #[test]
    fn test_header_parse() {
        let header = PacketHeader::parse(&[0x04, 0x2A, 0xFF]).unwrap();
        assert_eq!(header.packet_type, PacketType::ContactValue);
        assert_eq!(header.seq, 0x2A);
        assert_eq!(header.to_bytes(), [0x04, 0x2A]);
    }

    #[test]
    fn test_header_too_short() {
        let result = PacketHeader::parse(&[0x00]);
        assert!(matches!(result, Err(BranlyError::BufferTooShort { .. })));
    }

    #[test]
    fn test_header_unknown_type() {
        let result = PacketHeader::parse(&[0x09, 0x00]);
        assert_eq!(result, Err(BranlyError::UnknownPacketType(9)));
    }
}
