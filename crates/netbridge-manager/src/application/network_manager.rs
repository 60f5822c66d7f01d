//! NetworkManager: owns the transport, opens listen sockets and connections,
//! moves messages, and turns status callbacks into a pollable event queue.
//!
//! # Degraded mode
//!
//! A manager may be built without a transport (the transport was not ready
//! when the host asked for one).  Every operation then returns its documented
//! default (an invalid handle, `None`, or nothing at all) instead of failing
//! loudly, so the manager is safe to call at any point of the host's startup.
//!
//! # The tick loop (for beginners)
//!
//! ```text
//! loop {
//!     manager.pump();                                  // transport runs callbacks
//!     while let Some(event) = manager.poll_next_event() { .. }
//!     while let Some(msg) = manager.receive_next_message_on_group(group) { .. }
//! }
//! ```
//!
//! Events only ever appear during `pump()`.  Each `receive_*` call hands out
//! at most one message.

use std::sync::Arc;

use netbridge_core::{
    AddressError, ConnectionHandle, ConnectionInfo, Event, IdentityError, ListenSocketHandle,
    Message, NetworkAddress, PeerIdentity, PollGroupHandle, SendFlags,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::event_queue::EventQueue;
use super::transport::{ReceivedMessage, StatusCallback, StatusChange, Transport, TransportError};

/// Virtual port used by [`NetworkManager::connect_by_identity`].
pub const DEFAULT_VIRTUAL_PORT: i32 = 0;

/// Why a manager operation failed.  Only ever logged; public operations
/// degrade to default return values instead of returning this.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("transport interface not initialised")]
    Unavailable,
    #[error("malformed address: {0}")]
    Address(#[from] AddressError),
    #[error("malformed identity: {0}")]
    Identity(#[from] IdentityError),
    #[error("transport rejected {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },
}

impl NetworkError {
    fn transport(operation: &'static str) -> impl FnOnce(TransportError) -> Self {
        move |source| Self::Transport { operation, source }
    }
}

/// Connection manager over a pluggable [`Transport`].
pub struct NetworkManager {
    transport: Option<Box<dyn Transport>>,
    events: Arc<EventQueue>,
    client_connection: ConnectionHandle,
    is_client: bool,
}

impl NetworkManager {
    /// Creates a manager over `transport`, or a degraded manager when `None`.
    pub fn new(transport: Option<Box<dyn Transport>>) -> Self {
        Self::with_event_capacity(transport, None)
    }

    /// Creates a manager whose event queue holds at most `capacity` events.
    pub fn with_event_capacity(transport: Option<Box<dyn Transport>>, capacity: Option<usize>) -> Self {
        if transport.is_none() {
            error!("failed to acquire transport interface; network manager is degraded");
        }
        Self {
            transport,
            events: Arc::new(EventQueue::with_capacity(capacity)),
            client_connection: ConnectionHandle::INVALID,
            is_client: false,
        }
    }

    /// A manager with no transport.
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    /// `true` when a transport was acquired.
    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    /// `true` once an outbound connect has succeeded.
    pub fn is_client(&self) -> bool {
        self.is_client
    }

    /// The connection remembered by the last successful outbound connect.
    pub fn client_connection(&self) -> Option<ConnectionHandle> {
        self.is_client.then_some(self.client_connection)
    }

    // ── Listen sockets and outbound connections ──────────────────────────────

    /// Opens a listen socket on all interfaces at `port`.
    ///
    /// Returns [`ListenSocketHandle::INVALID`] and logs when the transport is
    /// missing or refuses.
    pub fn create_ip_listen_socket(&mut self, port: u16) -> ListenSocketHandle {
        let on_status = self.status_callback();
        let result = self.transport_mut().and_then(|t| {
            t.create_listen_socket_ip(NetworkAddress::any(port), on_status)
                .map_err(NetworkError::transport("create IP listen socket"))
        });
        match result {
            Ok(socket) => {
                info!("listening on UDP port {port} ({socket})");
                socket
            }
            Err(e) => {
                error!("cannot listen on port {port}: {e}");
                ListenSocketHandle::INVALID
            }
        }
    }

    /// Opens an identity-addressed (peer-to-peer) listen socket.
    pub fn create_identity_listen_socket(&mut self, virtual_port: i32) -> ListenSocketHandle {
        let on_status = self.status_callback();
        let result = self.transport_mut().and_then(|t| {
            t.create_listen_socket_p2p(virtual_port, on_status)
                .map_err(NetworkError::transport("create P2P listen socket"))
        });
        match result {
            Ok(socket) => {
                info!("listening on virtual port {virtual_port} ({socket})");
                socket
            }
            Err(e) => {
                error!("cannot listen on virtual port {virtual_port}: {e}");
                ListenSocketHandle::INVALID
            }
        }
    }

    /// Closes a listen socket.  Connections already accepted on it stay open.
    pub fn close_listen_socket(&mut self, socket: ListenSocketHandle) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        if let Err(e) = transport.close_listen_socket(socket) {
            warn!("close {socket} failed: {e}");
        }
    }

    /// Connects to `address` (`"ip:port"` or `"[ipv6]:port"`).
    ///
    /// On success the connection becomes the remembered client connection
    /// used by [`Self::send_to_client`].  On failure the invalid handle is
    /// returned and any previously remembered client connection is kept.
    pub fn connect_by_address(&mut self, address: &str) -> ConnectionHandle {
        let result = address
            .parse::<NetworkAddress>()
            .map_err(NetworkError::from)
            .and_then(|remote| {
                let on_status = self.status_callback();
                self.transport_mut()?
                    .connect_by_ip_address(remote, on_status)
                    .map_err(NetworkError::transport("connect by address"))
            });
        self.finish_connect(result, address)
    }

    /// Connects to the peer with the decimal 64-bit `identity` on
    /// [`DEFAULT_VIRTUAL_PORT`].  Same success/failure contract as
    /// [`Self::connect_by_address`].
    pub fn connect_by_identity(&mut self, identity: &str) -> ConnectionHandle {
        self.connect_by_identity_on_port(identity, DEFAULT_VIRTUAL_PORT)
    }

    /// Connects to the peer with `identity` on the P2P listen socket bound to
    /// `virtual_port`.
    pub fn connect_by_identity_on_port(&mut self, identity: &str, virtual_port: i32) -> ConnectionHandle {
        let result = identity
            .parse::<PeerIdentity>()
            .map_err(NetworkError::from)
            .and_then(|peer| {
                let on_status = self.status_callback();
                self.transport_mut()?
                    .connect_p2p(peer, virtual_port, on_status)
                    .map_err(NetworkError::transport("connect by identity"))
            });
        self.finish_connect(result, identity)
    }

    fn finish_connect(&mut self, result: Result<ConnectionHandle, NetworkError>, target: &str) -> ConnectionHandle {
        match result {
            Ok(connection) if connection.is_valid() => {
                info!("connecting to {target} ({connection})");
                self.client_connection = connection;
                self.is_client = true;
                connection
            }
            Ok(_) => {
                error!("failed to connect to {target}: transport returned an invalid handle");
                ConnectionHandle::INVALID
            }
            Err(e) => {
                error!("failed to connect to {target}: {e}");
                ConnectionHandle::INVALID
            }
        }
    }

    // ── Connection operations ────────────────────────────────────────────────

    /// Returns a fresh snapshot of `connection`, or `None` when the transport
    /// is missing or does not know the handle.
    pub fn get_connection_info(&self, connection: ConnectionHandle) -> Option<ConnectionInfo> {
        let transport = self.transport.as_deref()?;
        match transport.connection_info(connection) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("no info for {connection}: {e}");
                None
            }
        }
    }

    /// Gracefully closes `connection` without lingering.
    ///
    /// Events already queued for the connection are left in the queue.
    pub fn close_connection(&mut self, connection: ConnectionHandle) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        match transport.close_connection(connection, 0, "", false) {
            Ok(()) => debug!("closed {connection}"),
            Err(e) => warn!("close {connection} failed: {e}"),
        }
    }

    /// Accepts an incoming connection announced by a `None -> Connecting`
    /// event.
    pub fn accept_connection(&mut self, connection: ConnectionHandle) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        match transport.accept_connection(connection) {
            Ok(()) => info!("accepted {connection}"),
            Err(e) => warn!("accept {connection} failed: {e}"),
        }
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Takes at most one pending message from `connection`.
    pub fn receive_next_message(&mut self, connection: ConnectionHandle) -> Option<Message> {
        let received = self.transport.as_deref_mut()?.receive_message_on_connection(connection)?;
        Some(into_message(received))
    }

    /// Takes at most one pending message from any connection in `group`.
    ///
    /// A connection in a group can still be read with
    /// [`Self::receive_next_message`]; pick one strategy per connection.
    pub fn receive_next_message_on_group(&mut self, group: PollGroupHandle) -> Option<Message> {
        let received = self.transport.as_deref_mut()?.receive_message_on_poll_group(group)?;
        Some(into_message(received))
    }

    /// Sends `payload` on `connection`.  Failures are logged, not returned.
    pub fn send(&mut self, connection: ConnectionHandle, payload: &[u8], flags: SendFlags) {
        let Some(transport) = self.transport.as_deref_mut() else {
            debug!("send to {connection} skipped: no transport");
            return;
        };
        if let Err(e) = transport.send_message_to_connection(connection, payload, flags) {
            warn!("send {} bytes {flags} to {connection} failed: {e}", payload.len());
        }
    }

    /// Sends `payload` on the remembered client connection.  Does nothing
    /// unless an outbound connect has succeeded.
    pub fn send_to_client(&mut self, payload: &[u8], flags: SendFlags) {
        if !self.is_client {
            debug!("send_to_client skipped: no outbound connection");
            return;
        }
        self.send(self.client_connection, payload, flags);
    }

    // ── Poll groups ──────────────────────────────────────────────────────────

    pub fn create_poll_group(&mut self) -> PollGroupHandle {
        let Some(transport) = self.transport.as_deref_mut() else {
            return PollGroupHandle::INVALID;
        };
        transport.create_poll_group().unwrap_or_else(|e| {
            warn!("create poll group failed: {e}");
            PollGroupHandle::INVALID
        })
    }

    pub fn destroy_poll_group(&mut self, group: PollGroupHandle) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        if let Err(e) = transport.destroy_poll_group(group) {
            warn!("destroy {group} failed: {e}");
        }
    }

    /// Adds `connection` to `group`.  Pass [`PollGroupHandle::INVALID`] to
    /// remove it from its current group.
    pub fn assign_connection_to_group(&mut self, connection: ConnectionHandle, group: PollGroupHandle) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        if let Err(e) = transport.set_connection_poll_group(connection, group) {
            warn!("assign {connection} to {group} failed: {e}");
        }
    }

    // ── Event pump ───────────────────────────────────────────────────────────

    /// Lets the transport deliver pending status callbacks.  Call once per
    /// tick; events are only ever produced here.
    pub fn pump(&mut self) {
        if let Some(transport) = self.transport.as_deref_mut() {
            transport.run_callbacks();
        }
    }

    /// Removes and returns the oldest queued event.
    pub fn poll_next_event(&self) -> Option<Event> {
        self.events.pop()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Events discarded because the bounded queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Builds the callback handed to the transport.  It only holds a weak
    /// reference to the queue: once the manager is gone, late notifications
    /// are dropped.
    fn status_callback(&self) -> StatusCallback {
        let queue = Arc::downgrade(&self.events);
        Arc::new(move |change: &StatusChange| {
            if let Some(queue) = queue.upgrade() {
                queue.push(Event::new(change.connection, change.old_state, change.info.state));
            }
        })
    }

    fn transport_mut(&mut self) -> Result<&mut (dyn Transport + 'static), NetworkError> {
        self.transport.as_deref_mut().ok_or(NetworkError::Unavailable)
    }
}

fn into_message(received: ReceivedMessage) -> Message {
    Message::from_received(received.connection, received.payload)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
