//! Contact kind definitions
//!
//! The kind tag tells the collector what a contact measures or drives.
//! Tags 1-10 are predefined; user-defined kinds start at 100.

/// First tag of the user-defined kind range
pub const USER_DEFINED_BASE: u8 = 100;

/// What a contact measures or actuates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Temperature sensor
    Temperature,
    /// Supply or battery voltage
    Voltage,
    /// Power consumption (watt usage)
    WattUsage,
    /// Relative humidity
    Humidity,
    /// Photocell (light dependent resistor)
    LightSensor,
    /// Motion detector
    Motion,
    /// Push button
    Button,
    /// Switchable power outlet
    PowerSwitch,
    /// Dimmable or on/off light
    Light,
    /// Color light
    RgbLight,
    /// Application specific kind (tag >= 100)
    UserDefined(u8),
}

impl ContactKind {
    /// Parse from a full tag byte
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(ContactKind::Temperature),
            2 => Some(ContactKind::Voltage),
            3 => Some(ContactKind::WattUsage),
            4 => Some(ContactKind::Humidity),
            5 => Some(ContactKind::LightSensor),
            6 => Some(ContactKind::Motion),
            7 => Some(ContactKind::Button),
            8 => Some(ContactKind::PowerSwitch),
            9 => Some(ContactKind::Light),
            10 => Some(ContactKind::RgbLight),
            n if n >= USER_DEFINED_BASE => Some(ContactKind::UserDefined(n)),
            _ => None,
        }
    }

    /// Convert to the full tag byte
    pub fn to_byte(self) -> u8 {
        match self {
            ContactKind::Temperature => 1,
            ContactKind::Voltage => 2,
            ContactKind::WattUsage => 3,
            ContactKind::Humidity => 4,
            ContactKind::LightSensor => 5,
            ContactKind::Motion => 6,
            ContactKind::Button => 7,
            ContactKind::PowerSwitch => 8,
            ContactKind::Light => 9,
            ContactKind::RgbLight => 10,
            ContactKind::UserDefined(n) => n.max(USER_DEFINED_BASE),
        }
    }

    /// Tag as it appears in a contact-list entry (low 4 bits only)
    #[inline]
    pub fn wire_nibble(self) -> u8 {
        self.to_byte() & 0x0F
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_kind_roundtrip() {
        for b in 1..=10u8 {
            let kind = ContactKind::from_byte(b).unwrap();
            assert_eq!(kind.to_byte(), b);
        }
        assert_eq!(ContactKind::from_byte(0), None);
        assert_eq!(ContactKind::from_byte(42), None);
        assert_eq!(
            ContactKind::from_byte(120),
            Some(ContactKind::UserDefined(120))
        );
    }

    #[test]
    fn test_user_defined_clamped_to_range() {
        assert_eq!(ContactKind::UserDefined(3).to_byte(), USER_DEFINED_BASE);
    }

    #[test]
    fn test_wire_nibble_truncates() {
        assert_eq!(ContactKind::RgbLight.wire_nibble(), 0x0A);
        // 100 = 0x64, only the low nibble survives a contact-list entry
        assert_eq!(ContactKind::UserDefined(100).wire_nibble(), 0x04);
    }

    proptest! {
        #[test]
        fn prop_byte_roundtrip(b in any::<u8>()) {
            if let Some(kind) = ContactKind::from_byte(b) {
                prop_assert_eq!(kind.to_byte(), b);
                prop_assert_eq!(kind.wire_nibble(), b & 0x0F);
            } else {
                prop_assert!(b == 0 || (11..USER_DEFINED_BASE).contains(&b));
            }
        }
    }
}
