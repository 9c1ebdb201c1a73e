//! Packet builders
//!
//! The codec owns the node's only packet buffer and the sequence counter.
//! Each builder overwrites the previous packet and hands back a borrow of
//! the new one, so a packet can only be transmitted before the next build.

use branly_core::BranlyResult;
use tracing::{debug, trace};

use crate::{
    ContactListEntry, PacketBuffer, PacketHeader, PacketType, ValueEntry, HEADER_SIZE,
    PACKET_CAPACITY,
};

/// Boot status byte carried in Hello (no reset cause reported yet)
pub const HELLO_STATUS_RESERVED: u8 = 0;

/// Builds packets into a single owned buffer
#[derive(Debug, Default)]
pub struct ProtocolCodec {
    buf: PacketBuffer,
    seq: u8,
}

impl ProtocolCodec {
    pub fn new() -> Self {
        Self::with_sequence(0)
    }

    /// Start the sequence counter at `seq`
    pub fn with_sequence(seq: u8) -> Self {
        ProtocolCodec {
            buf: PacketBuffer::new(),
            seq,
        }
    }

    /// Sequence number the next packet will carry
    #[inline]
    pub fn next_sequence(&self) -> u8 {
        self.seq
    }

    /// Last packet built (empty after a failed build)
    #[inline]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Hello: hw version, sw version, boot status
    pub fn build_hello(&mut self, hw_version: u8, sw_version: u8) -> BranlyResult<&[u8]> {
        self.build(PacketType::Hello, |buf| {
            buf.extend_from_slice(&[hw_version, sw_version, HELLO_STATUS_RESERVED])
        })
    }

    /// Ping: header only
    pub fn build_ping(&mut self) -> BranlyResult<&[u8]> {
        self.build(PacketType::Ping, |_| Ok(()))
    }

    /// Contact list: one packed byte per contact
    pub fn build_contact_list<I>(&mut self, entries: I) -> BranlyResult<&[u8]>
    where
        I: IntoIterator<Item = ContactListEntry>,
    {
        self.build(PacketType::ContactList, |buf| {
            for entry in entries {
                trace!(id = %entry.id, kind = entry.kind_tag, "contact list entry");
                buf.push(entry.encode()?)?;
            }
            Ok(())
        })
    }

    /// Contact report: entry byte and value for each contact
    pub fn build_contact_report<I>(&mut self, entries: I) -> BranlyResult<&[u8]>
    where
        I: IntoIterator<Item = ValueEntry>,
    {
        self.build(PacketType::ContactReport, |buf| {
            for entry in entries {
                trace!(
                    id = %entry.id,
                    value = entry.value,
                    flags = entry.flags.0,
                    size = entry.size().code(),
                    "contact report entry"
                );
                write_value(buf, &entry)?;
            }
            Ok(())
        })
    }

    /// Contact value: entry byte and value for exactly one contact
    pub fn build_contact_value(&mut self, entry: ValueEntry) -> BranlyResult<&[u8]> {
        self.build(PacketType::ContactValue, |buf| write_value(buf, &entry))
    }

    /// Write header, then the payload. The counter advances even if the
    /// payload does not fit.
    fn build<F>(&mut self, packet_type: PacketType, payload: F) -> BranlyResult<&[u8]>
    where
        F: FnOnce(&mut PacketBuffer) -> BranlyResult<()>,
    {
        self.buf.clear();
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        debug!(?packet_type, seq, "building packet");

        let result = self
            .buf
            .extend_from_slice(&PacketHeader::new(packet_type, seq).to_bytes())
            .and_then(|_| payload(&mut self.buf));

        match result {
            Ok(()) => Ok(self.buf.as_slice()),
            Err(e) => {
                self.buf.clear();
                Err(e)
            }
        }
    }
}

/// Split report entries into runs that each fit one contact report
///
/// Entries keep their order. An empty input gives no runs.
pub fn report_chunks(entries: &[ValueEntry]) -> Vec<&[ValueEntry]> {
    let budget = PACKET_CAPACITY - HEADER_SIZE;
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut used = 0;
    for (i, entry) in entries.iter().enumerate() {
        let len = entry.encoded_len();
        if used + len > budget && i > start {
            chunks.push(&entries[start..i]);
            start = i;
            used = 0;
        }
        used += len;
    }
    if start < entries.len() {
        chunks.push(&entries[start..]);
    }
    chunks
}

fn write_value(buf: &mut PacketBuffer, entry: &ValueEntry) -> BranlyResult<()> {
    buf.ensure_room(entry.encoded_len())?;
    let written = entry.encode_into(buf.spare_mut())?;
    buf.advance(written)
}
