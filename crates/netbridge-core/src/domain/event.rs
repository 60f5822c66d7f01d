//! Connection state-transition events.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::handles::ConnectionHandle;
use super::state::ConnectionState;

/// One connection state transition reported by the transport.
///
/// Events are produced only by the transport's status callback during a pump
/// and are handed out by the manager in the order they were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    connection: ConnectionHandle,
    old_state: ConnectionState,
    state: ConnectionState,
}

impl Event {
    pub fn new(connection: ConnectionHandle, old_state: ConnectionState, state: ConnectionState) -> Self {
        Self {
            connection,
            old_state,
            state,
        }
    }

    pub fn connection(&self) -> ConnectionHandle {
        self.connection
    }

    pub fn old_state(&self) -> ConnectionState {
        self.old_state
    }

    /// The state the connection moved into.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// A remote peer is knocking on one of our listen sockets and is waiting
    /// for `accept_connection`.
    pub fn is_incoming_request(&self) -> bool {
        self.old_state == ConnectionState::None && self.state == ConnectionState::Connecting
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.connection, self.old_state, self.state)
    }
}
