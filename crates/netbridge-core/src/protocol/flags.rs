//! Send flags passed straight through to the transport.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Delivery flags for a single send.  The bit values are the transport's own.
///
/// `UNRELIABLE` is the empty set, so "reliable" is simply whether
/// [`Self::RELIABLE`] is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendFlags(pub u32);

impl SendFlags {
    pub const UNRELIABLE: Self = Self(0);
    pub const NO_NAGLE: Self = Self(1);
    pub const NO_DELAY: Self = Self(4);
    pub const RELIABLE: Self = Self(8);
    pub const USE_CURRENT_THREAD: Self = Self(16);

    pub const UNRELIABLE_NO_NAGLE: Self = Self(Self::UNRELIABLE.0 | Self::NO_NAGLE.0);
    pub const UNRELIABLE_NO_DELAY: Self = Self(Self::UNRELIABLE.0 | Self::NO_DELAY.0 | Self::NO_NAGLE.0);
    pub const RELIABLE_NO_NAGLE: Self = Self(Self::RELIABLE.0 | Self::NO_NAGLE.0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_reliable(self) -> bool {
        self.contains(Self::RELIABLE)
    }
}

impl BitOr for SendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SendFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for SendFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for SendFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_reliable() { "reliable" } else { "unreliable" };
        write!(f, "{kind}(0x{:02x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliable_and_unreliable_are_distinct() {
        assert!(SendFlags::RELIABLE.is_reliable());
        assert!(!SendFlags::UNRELIABLE.is_reliable());
        assert_ne!(SendFlags::RELIABLE, SendFlags::UNRELIABLE);
    }

    #[test]
    fn test_combined_flags_keep_reliability() {
        let flags = SendFlags::RELIABLE | SendFlags::NO_NAGLE;
        assert_eq!(flags, SendFlags::RELIABLE_NO_NAGLE);
        assert!(flags.is_reliable());
        assert!(flags.contains(SendFlags::NO_NAGLE));
    }

    #[test]
    fn test_unreliable_no_delay_is_not_reliable() {
        assert!(!SendFlags::UNRELIABLE_NO_DELAY.is_reliable());
        assert_eq!(SendFlags::UNRELIABLE_NO_DELAY.bits(), 5);
    }
}
