//! Bit-packed contact entries
//!
//! Contact-list entry (1 byte):
//! - Bit 7: Writeable
//! - Bits 6-4: Contact id (3 bits)
//! - Bits 3-0: Contact kind (low nibble of the tag)
//!
//! Contact value/report entry (1 byte + value):
//! - Bits 7-6: Flags
//! - Bits 5-4: Value size code
//! - Bits 3-0: Contact id (4 bits)
//! - Value: 1 or 4 bytes, little endian, signed

use branly_core::{BranlyError, BranlyResult, ContactId, ContactKind, CONTACT_LIST_ID_BITS};

use crate::ValueFlags;

/// Encoded width of a contact value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueSize {
    Size8 = 0,
    Size16 = 1,
    Size24 = 2,
    Size32 = 3,
}

impl ValueSize {
    /// Width the encoder picks for a value. Only 1 and 4 byte widths are
    /// ever produced.
    #[inline]
    pub fn for_value(value: i32) -> Self {
        if (i8::MIN as i32..=i8::MAX as i32).contains(&value) {
            ValueSize::Size8
        } else {
            ValueSize::Size32
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0 => ValueSize::Size8,
            1 => ValueSize::Size16,
            2 => ValueSize::Size24,
            _ => ValueSize::Size32,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Number of value bytes following the entry byte
    #[inline]
    pub fn byte_len(self) -> usize {
        self.code() as usize + 1
    }
}

/// One entry of a contact-list packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactListEntry {
    pub writeable: bool,
    pub id: ContactId,
    /// Low nibble of the contact kind tag
    pub kind_tag: u8,
}

impl ContactListEntry {
    pub fn new(id: ContactId, kind: ContactKind, writeable: bool) -> Self {
        ContactListEntry {
            writeable,
            id,
            kind_tag: kind.wire_nibble(),
        }
    }

    /// Pack into one byte. Ids above 7 do not fit the 3-bit field.
    pub fn encode(&self) -> BranlyResult<u8> {
        if !self.id.fits_contact_list() {
            return Err(BranlyError::ContactIdOutOfRange {
                id: self.id.get(),
                bits: CONTACT_LIST_ID_BITS,
            });
        }
        Ok(((self.writeable as u8) << 7) | (self.id.get() << 4) | (self.kind_tag & 0x0F))
    }

    pub fn decode(b: u8) -> Self {
        ContactListEntry {
            writeable: (b >> 7) & 1 == 1,
            id: ContactId::from_nibble((b >> 4) & 0x07),
            kind_tag: b & 0x0F,
        }
    }

    /// Kind, when the tag is one of the predefined ones
    pub fn kind(&self) -> Option<ContactKind> {
        ContactKind::from_byte(self.kind_tag)
    }
}

/// One value of a contact report or contact value packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueEntry {
    pub flags: ValueFlags,
    pub id: ContactId,
    pub value: i32,
}

impl ValueEntry {
    pub fn new(id: ContactId, value: i32, violated: bool) -> Self {
        let mut flags = ValueFlags::NONE;
        flags.set_violated(violated);
        ValueEntry { flags, id, value }
    }

    #[inline]
    pub fn size(&self) -> ValueSize {
        ValueSize::for_value(self.value)
    }

    /// Entry byte: flags, size code and id
    #[inline]
    pub fn encode_header(&self) -> u8 {
        pack_value_header(self.flags, self.size(), self.id)
    }

    /// Total encoded length (entry byte + value)
    #[inline]
    pub fn encoded_len(&self) -> usize {
        1 + self.size().byte_len()
    }

    /// Write entry byte and value into `out`, returning bytes written
    pub fn encode_into(&self, out: &mut [u8]) -> BranlyResult<usize> {
        let len = self.encoded_len();
        if out.len() < len {
            return Err(BranlyError::BufferTooShort {
                expected: len,
                actual: out.len(),
            });
        }

        out[0] = self.encode_header();
        match self.size() {
            ValueSize::Size8 => out[1] = self.value as i8 as u8,
            _ => out[1..5].copy_from_slice(&self.value.to_le_bytes()),
        }
        Ok(len)
    }
}

/// Pack flags, size code and id into an entry byte
#[inline]
pub fn pack_value_header(flags: ValueFlags, size: ValueSize, id: ContactId) -> u8 {
    ((flags.0 & ValueFlags::MASK) << 6) | (size.code() << 4) | (id.get() & 0x0F)
}

/// Split an entry byte into flags, size code and id
#[inline]
pub fn unpack_value_header(b: u8) -> (ValueFlags, ValueSize, ContactId) {
    (
        ValueFlags::new(b >> 6),
        ValueSize::from_code(b >> 4),
        ContactId::from_nibble(b),
    )
}
