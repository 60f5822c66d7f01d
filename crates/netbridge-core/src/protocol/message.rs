//! A received network message: payload, read cursor and source connection.

use crate::domain::handles::ConnectionHandle;
use crate::protocol::datagram::{Datagram, DatagramIterator};

/// A message pulled from the transport.
///
/// The message owns its bytes outright; the transport buffer it was copied
/// from has already been released by the time the caller sees it.  Setting a
/// new datagram always puts the cursor back at offset 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    cursor: DatagramIterator,
    connection: ConnectionHandle,
}

impl Message {
    /// An empty message not yet tied to a connection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_received(connection: ConnectionHandle, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: DatagramIterator::new(Datagram::from_bytes(payload)),
            connection,
        }
    }

    /// Replaces the payload and resets the cursor to offset 0.
    pub fn set_datagram(&mut self, datagram: Datagram) {
        self.cursor = DatagramIterator::new(datagram);
    }

    pub fn datagram(&self) -> &Datagram {
        self.cursor.datagram()
    }

    pub fn payload(&self) -> &[u8] {
        self.cursor.datagram().as_bytes()
    }

    /// The read cursor over the payload.
    pub fn iterator(&mut self) -> &mut DatagramIterator {
        &mut self.cursor
    }

    pub fn set_connection(&mut self, connection: ConnectionHandle) {
        self.connection = connection;
    }

    /// The connection the message arrived on.
    pub fn connection(&self) -> ConnectionHandle {
        self.connection
    }

    pub fn into_datagram(self) -> Datagram {
        self.cursor.into_datagram()
    }
}
