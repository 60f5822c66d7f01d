//! Connection lifecycle states and end-reason codes.
//!
//! # Connection lifecycle (for beginners)
//!
//! ```text
//! None ──► Connecting ──► FindingRoute ──► Connected ──► ClosedByPeer
//!               │          (P2P only)          │
//!               └──────────────────────────────┴──► ProblemDetectedLocally
//! ```
//!
//! The transport reports every transition through a status callback; the
//! manager turns each one into an [`crate::Event`].  `FinWait`, `Linger` and
//! `Dead` are transport-internal states that may still show up in a
//! connection info snapshot while a close is being flushed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a connection.  The discriminants are the raw values the
/// transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConnectionState {
    #[default]
    None = 0,
    Connecting = 1,
    FindingRoute = 2,
    Connected = 3,
    ClosedByPeer = 4,
    ProblemDetectedLocally = 5,
    FinWait = -1,
    Linger = -2,
    Dead = -3,
}

impl ConnectionState {
    /// Returns the raw transport value.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Returns `true` for the two states that mean the connection is over and
    /// the application should close its handle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ClosedByPeer | Self::ProblemDetectedLocally)
    }
}

impl TryFrom<i32> for ConnectionState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Connecting),
            2 => Ok(Self::FindingRoute),
            3 => Ok(Self::Connected),
            4 => Ok(Self::ClosedByPeer),
            5 => Ok(Self::ProblemDetectedLocally),
            -1 => Ok(Self::FinWait),
            -2 => Ok(Self::Linger),
            -3 => Ok(Self::Dead),
            other => Err(other),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Connecting => "connecting",
            Self::FindingRoute => "finding-route",
            Self::Connected => "connected",
            Self::ClosedByPeer => "closed-by-peer",
            Self::ProblemDetectedLocally => "problem-detected-locally",
            Self::FinWait => "fin-wait",
            Self::Linger => "linger",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// End-reason codes carried in [`crate::ConnectionInfo::end_reason`].
///
/// Ranges follow the transport's convention: `1000..2000` application-normal,
/// `2000..3000` application-exceptional, `3000..4000` local problems,
/// `4000..5000` remote problems, `5000..6000` miscellaneous.
pub mod end_reason {
    pub const INVALID: i32 = 0;
    pub const APP_MIN: i32 = 1000;
    pub const APP_GENERIC: i32 = APP_MIN;
    pub const APP_EXCEPTION_MIN: i32 = 2000;
    pub const LOCAL_MIN: i32 = 3000;
    pub const LOCAL_OFFLINE_MODE: i32 = 3001;
    pub const REMOTE_MIN: i32 = 4000;
    pub const REMOTE_TIMEOUT: i32 = 4001;
    pub const REMOTE_BAD_CONNECT: i32 = 4004;
    pub const MISC_MIN: i32 = 5000;
    pub const MISC_GENERIC: i32 = 5001;
    pub const MISC_NO_RELAY_SESSIONS: i32 = 5003;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_raw_values_round_trip() {
        for state in [
            ConnectionState::None,
            ConnectionState::Connecting,
            ConnectionState::FindingRoute,
            ConnectionState::Connected,
            ConnectionState::ClosedByPeer,
            ConnectionState::ProblemDetectedLocally,
            ConnectionState::FinWait,
            ConnectionState::Linger,
            ConnectionState::Dead,
        ] {
            assert_eq!(ConnectionState::try_from(state.as_raw()), Ok(state));
        }
    }

    #[test]
    fn test_connection_state_rejects_unknown_raw_value() {
        assert_eq!(ConnectionState::try_from(99), Err(99));
    }

    #[test]
    fn test_only_closed_and_problem_states_are_terminal() {
        assert!(ConnectionState::ClosedByPeer.is_terminal());
        assert!(ConnectionState::ProblemDetectedLocally.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert!(!ConnectionState::None.is_terminal());
    }
}
