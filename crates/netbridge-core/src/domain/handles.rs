//! Opaque handles for transport-owned resources.
//!
//! A handle is just a number the transport hands out when it creates a listen
//! socket, a connection, or a poll group.  This layer never owns the resource
//! behind the number; it only passes the number back to the transport.
//!
//! Each handle type reserves `0` as its "invalid" value.  Transports never
//! mint `0` and never reuse a number after the resource is closed.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved "no such resource" value.
            pub const INVALID: Self = Self(0);

            /// Wraps a raw handle value returned by a transport.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw handle value.
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Returns `true` unless this is [`Self::INVALID`].
            pub const fn is_valid(self) -> bool {
                self.0 != Self::INVALID.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}#{}", $label, self.0)
                } else {
                    write!(f, "{}#invalid", $label)
                }
            }
        }

        impl From<$name> for u32 {
            fn from(handle: $name) -> u32 {
                handle.0
            }
        }
    };
}

define_handle!(
    /// Identifies a listen socket created by `create_ip_listen_socket` or
    /// `create_identity_listen_socket`.
    ListenSocketHandle,
    "listen"
);

define_handle!(
    /// Identifies a single connection, inbound or outbound.
    ConnectionHandle,
    "conn"
);

define_handle!(
    /// Identifies a poll group.
    PollGroupHandle,
    "group"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handles_are_invalid() {
        assert!(!ConnectionHandle::default().is_valid());
        assert!(!ListenSocketHandle::default().is_valid());
        assert!(!PollGroupHandle::default().is_valid());
    }

    #[test]
    fn test_nonzero_handle_is_valid() {
        assert!(ConnectionHandle::from_raw(42).is_valid());
        assert_eq!(ConnectionHandle::from_raw(42).raw(), 42);
    }

    #[test]
    fn test_handle_display_names_the_category() {
        assert_eq!(ConnectionHandle(7).to_string(), "conn#7");
        assert_eq!(PollGroupHandle::INVALID.to_string(), "group#invalid");
    }
}
