//! Value flags for contact report and contact value entries

/// Entry flags (2 bits on the wire)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValueFlags(pub u8);

impl ValueFlags {
    pub const NONE: ValueFlags = ValueFlags(0);

    // Flag bits
    pub const VIOLATED: u8 = 0b01;
    pub const RESERVED: u8 = 0b10;

    /// Mask of the 2-bit field
    pub const MASK: u8 = 0b11;

    #[inline]
    pub fn new(bits: u8) -> Self {
        ValueFlags(bits & Self::MASK)
    }

    #[inline]
    pub fn violated() -> Self {
        ValueFlags(Self::VIOLATED)
    }

    #[inline]
    pub fn is_violated(self) -> bool {
        self.0 & Self::VIOLATED != 0
    }

    #[inline]
    pub fn set_violated(&mut self, value: bool) {
        if value {
            self.0 |= Self::VIOLATED;
        } else {
            self.0 &= !Self::VIOLATED;
        }
    }
}

impl From<u8> for ValueFlags {
    fn from(bits: u8) -> Self {
        ValueFlags::new(bits)
    }
}

impl From<ValueFlags> for u8 {
    fn from(flags: ValueFlags) -> Self {
        flags.0
    }
}
