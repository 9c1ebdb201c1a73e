//! Packet decoding for the collector side

use bytes::Buf;

use branly_core::{BranlyError, BranlyResult};

use crate::{
    unpack_value_header, ContactListEntry, PacketHeader, PacketType, ValueEntry, HEADER_SIZE,
    PACKET_CAPACITY,
};

/// Hello payload size
pub const HELLO_PAYLOAD_SIZE: usize = 3;

/// Decoded packet payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Hello {
        hw_version: u8,
        sw_version: u8,
        status: u8,
    },
    Ping,
    ContactList(Vec<ContactListEntry>),
    ContactReport(Vec<ValueEntry>),
    ContactValue(ValueEntry),
}

/// A decoded packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub seq: u8,
    pub payload: Payload,
}

impl Packet {
    /// Parse a complete packet
    pub fn parse(buf: &[u8]) -> BranlyResult<Self> {
        if buf.len() > PACKET_CAPACITY {
            return Err(BranlyError::InvalidWireFormat(format!(
                "Packet too large: {} > {}",
                buf.len(),
                PACKET_CAPACITY
            )));
        }

        let header = PacketHeader::parse(buf)?;
        let mut body = &buf[HEADER_SIZE..];

        let payload = match header.packet_type {
            PacketType::Hello => {
                if body.len() != HELLO_PAYLOAD_SIZE {
                    return Err(BranlyError::InvalidWireFormat(format!(
                        "Hello payload must be {} bytes, got {}",
                        HELLO_PAYLOAD_SIZE,
                        body.len()
                    )));
                }
                Payload::Hello {
                    hw_version: body.get_u8(),
                    sw_version: body.get_u8(),
                    status: body.get_u8(),
                }
            }
            PacketType::Ping => {
                if body.has_remaining() {
                    return Err(BranlyError::InvalidWireFormat(
                        "Ping carries no payload".into(),
                    ));
                }
                Payload::Ping
            }
            PacketType::ContactList => {
                let mut entries = Vec::with_capacity(body.len());
                while body.has_remaining() {
                    entries.push(ContactListEntry::decode(body.get_u8()));
                }
                Payload::ContactList(entries)
            }
            PacketType::ContactReport => {
                let mut entries = Vec::new();
                while body.has_remaining() {
                    entries.push(ValueEntry::decode(&mut body)?);
                }
                Payload::ContactReport(entries)
            }
            PacketType::ContactValue => {
                let entry = ValueEntry::decode(&mut body)?;
                if body.has_remaining() {
                    return Err(BranlyError::InvalidWireFormat(format!(
                        "{} trailing bytes after contact value",
                        body.remaining()
                    )));
                }
                Payload::ContactValue(entry)
            }
        };

        Ok(Packet {
            seq: header.seq,
            payload,
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self.payload {
            Payload::Hello { .. } => PacketType::Hello,
            Payload::Ping => PacketType::Ping,
            Payload::ContactList(_) => PacketType::ContactList,
            Payload::ContactReport(_) => PacketType::ContactReport,
            Payload::ContactValue(_) => PacketType::ContactValue,
        }
    }

    /// Value entries carried by report and value packets
    pub fn values(&self) -> &[ValueEntry] {
        match &self.payload {
            Payload::ContactReport(entries) => entries,
            Payload::ContactValue(entry) => std::slice::from_ref(entry),
            _ => &[],
        }
    }
}

impl ValueEntry {
    /// Decode one entry byte and its value from the front of `buf`
    pub fn decode<B: Buf>(buf: &mut B) -> BranlyResult<Self> {
        if !buf.has_remaining() {
            return Err(BranlyError::BufferTooShort {
                expected: 1,
                actual: 0,
            });
        }

        let (flags, size, id) = unpack_value_header(buf.get_u8());
        let len = size.byte_len();
        if buf.remaining() < len {
            return Err(BranlyError::BufferTooShort {
                expected: len,
                actual: buf.remaining(),
            });
        }

        // Sign-extends 1-3 byte values
        let value = buf.get_int_le(len) as i32;
        Ok(ValueEntry { flags, id, value })
    }
}
