//! The transport port: everything the manager needs from the layer that
//! actually moves bytes.
//!
//! The manager never talks to sockets directly.  It drives an object that
//! implements [`Transport`], which owns every listen socket, connection and
//! poll group and refers to them by handle.  The in-process implementation
//! lives in `infrastructure::transport::local`; tests substitute the
//! `mockall`-generated `MockTransport`.
//!
//! # Status callbacks
//!
//! Creating a listen socket or starting a connection registers a
//! [`StatusCallback`].  The transport invokes it once per state transition of
//! any connection created through that call, and only from inside
//! [`Transport::run_callbacks`].

use std::sync::Arc;

use netbridge_core::{
    ConnectionHandle, ConnectionInfo, ConnectionState, ListenSocketHandle, NetworkAddress,
    PeerIdentity, PollGroupHandle, SendFlags,
};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Errors a transport reports back for a rejected operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The handle does not name a live resource.
    #[error("invalid handle {0}")]
    InvalidHandle(u32),
    /// The resource exists but is not in a state that allows the operation.
    #[error("resource {handle} is {state}")]
    InvalidState { handle: u32, state: ConnectionState },
    /// Another listen socket already owns this port.
    #[error("{0} is already in use")]
    AddressInUse(String),
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },
    /// No route to the requested peer could even be attempted.
    #[error("no route to {0}")]
    NoRoute(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// One connection state transition, as handed to a [`StatusCallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub connection: ConnectionHandle,
    pub old_state: ConnectionState,
    /// Snapshot taken right after the transition; `info.state` is the new state.
    pub info: ConnectionInfo,
}

/// Callback registered with listen sockets and outbound connections.
pub type StatusCallback = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// A message taken out of the transport.  Dropping it releases the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub connection: ConnectionHandle,
    pub payload: Vec<u8>,
    /// Transport-assigned, increasing in arrival order.
    pub message_number: u64,
}

/// Connection-oriented datagram transport.
///
/// Every call is non-blocking.  Receives return `None` when nothing is
/// pending rather than waiting.
#[cfg_attr(test, automock)]
pub trait Transport: Send {
    fn create_listen_socket_ip(
        &mut self,
        local: NetworkAddress,
        on_status: StatusCallback,
    ) -> Result<ListenSocketHandle, TransportError>;

    fn create_listen_socket_p2p(
        &mut self,
        virtual_port: i32,
        on_status: StatusCallback,
    ) -> Result<ListenSocketHandle, TransportError>;

    fn close_listen_socket(&mut self, socket: ListenSocketHandle) -> Result<(), TransportError>;

    fn connect_by_ip_address(
        &mut self,
        remote: NetworkAddress,
        on_status: StatusCallback,
    ) -> Result<ConnectionHandle, TransportError>;

    fn connect_p2p(
        &mut self,
        identity: PeerIdentity,
        virtual_port: i32,
        on_status: StatusCallback,
    ) -> Result<ConnectionHandle, TransportError>;

    fn accept_connection(&mut self, connection: ConnectionHandle) -> Result<(), TransportError>;

    /// Closes a connection.  `reason` and `debug` are reported to the peer.
    fn close_connection(
        &mut self,
        connection: ConnectionHandle,
        reason: i32,
        debug: &str,
        linger: bool,
    ) -> Result<(), TransportError>;

    fn connection_info(&self, connection: ConnectionHandle) -> Result<ConnectionInfo, TransportError>;

    fn send_message_to_connection(
        &mut self,
        connection: ConnectionHandle,
        payload: &[u8],
        flags: SendFlags,
    ) -> Result<(), TransportError>;

    fn receive_message_on_connection(&mut self, connection: ConnectionHandle) -> Option<ReceivedMessage>;

    fn receive_message_on_poll_group(&mut self, group: PollGroupHandle) -> Option<ReceivedMessage>;

    fn create_poll_group(&mut self) -> Result<PollGroupHandle, TransportError>;

    fn destroy_poll_group(&mut self, group: PollGroupHandle) -> Result<(), TransportError>;

    /// Moves a connection into `group`, or out of any group when `group` is
    /// [`PollGroupHandle::INVALID`].
    fn set_connection_poll_group(
        &mut self,
        connection: ConnectionHandle,
        group: PollGroupHandle,
    ) -> Result<(), TransportError>;

    /// Delivers every pending status callback on the calling thread.
    fn run_callbacks(&mut self);
}
