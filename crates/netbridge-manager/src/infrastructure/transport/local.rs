//! In-process transport: both ends of every connection live in the same
//! [`LocalTransport`], so a server and a client can run side by side in one
//! process (the echo binary, integration tests).
//!
//! # Addressing
//!
//! - IP connects reach a listen socket when the target is a loopback or
//!   unspecified address and the port matches an IP listen socket.
//! - Identity connects reach a listen socket when the identity equals
//!   [`LocalTransport::local_identity`] and the virtual port matches a P2P
//!   listen socket.
//!
//! IP connects to any other host are refused with `NoRoute`.  Everything
//! else that finds no listener starts a connection that fails on the next
//! pump with `ProblemDetectedLocally`.
//!
//! # Callbacks
//!
//! State changes are recorded when they happen but the registered callbacks
//! only run inside [`Transport::run_callbacks`], in the order the changes
//! happened.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr};

use netbridge_core::{
    end_reason, ConnectionHandle, ConnectionInfo, ConnectionState, ListenSocketHandle,
    NetworkAddress, PeerIdentity, PollGroupHandle, SendFlags,
};
use tracing::{debug, info, trace};

use crate::application::transport::{
    ReceivedMessage, StatusCallback, StatusChange, Transport, TransportError,
};

/// Largest payload accepted by [`Transport::send_message_to_connection`].
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024;

/// First port handed out as the apparent remote port of inbound connections.
const EPHEMERAL_PORT_BASE: u16 = 49_152;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Endpoint {
    Ip(u16),
    P2p(i32),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip(port) => write!(f, "UDP port {port}"),
            Self::P2p(vport) => write!(f, "virtual port {vport}"),
        }
    }
}

struct ListenSocket {
    endpoint: Endpoint,
    on_status: StatusCallback,
}

struct Connection {
    /// The other end, while it is still open.
    peer: Option<ConnectionHandle>,
    listen_socket: ListenSocketHandle,
    peer_address: NetworkAddress,
    remote_identity: Option<PeerIdentity>,
    state: ConnectionState,
    end_reason: i32,
    end_debug: String,
    poll_group: PollGroupHandle,
    /// `(message_number, payload)` in arrival order.
    inbox: VecDeque<(u64, Vec<u8>)>,
    on_status: StatusCallback,
}

impl Connection {
    fn new(on_status: StatusCallback) -> Self {
        Self {
            peer: None,
            listen_socket: ListenSocketHandle::INVALID,
            peer_address: NetworkAddress::default(),
            remote_identity: None,
            state: ConnectionState::None,
            end_reason: end_reason::INVALID,
            end_debug: String::new(),
            poll_group: PollGroupHandle::INVALID,
            inbox: VecDeque::new(),
            on_status,
        }
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            listen_socket: self.listen_socket,
            peer_address: self.peer_address,
            remote_identity: self.remote_identity,
            state: self.state,
            end_reason: self.end_reason,
            end_debug: self.end_debug.clone(),
        }
    }
}

/// A [`Transport`] whose connections never leave the process.
pub struct LocalTransport {
    local_identity: PeerIdentity,
    /// Shared by all handle kinds; values are never reused.
    next_handle: u32,
    next_message_number: u64,
    listen_sockets: HashMap<ListenSocketHandle, ListenSocket>,
    connections: HashMap<ConnectionHandle, Connection>,
    poll_groups: HashSet<PollGroupHandle>,
    pending: VecDeque<(StatusCallback, StatusChange)>,
}

impl LocalTransport {
    pub fn new(local_identity: PeerIdentity) -> Self {
        Self {
            local_identity,
            next_handle: 1,
            next_message_number: 1,
            listen_sockets: HashMap::new(),
            connections: HashMap::new(),
            poll_groups: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// The identity identity-addressed connects must use to reach this
    /// transport's P2P listen sockets.
    pub fn local_identity(&self) -> PeerIdentity {
        self.local_identity
    }

    /// Number of status changes waiting for the next `run_callbacks`.
    pub fn pending_callbacks(&self) -> usize {
        self.pending.len()
    }

    fn allocate(&mut self) -> Result<u32, TransportError> {
        let raw = self.next_handle;
        self.next_handle = raw
            .checked_add(1)
            .ok_or_else(|| TransportError::Rejected("handle space exhausted".into()))?;
        Ok(raw)
    }

    fn listen(&mut self, endpoint: Endpoint, on_status: StatusCallback) -> Result<ListenSocketHandle, TransportError> {
        if self.listen_sockets.values().any(|s| s.endpoint == endpoint) {
            return Err(TransportError::AddressInUse(endpoint.to_string()));
        }
        let socket = ListenSocketHandle(self.allocate()?);
        self.listen_sockets.insert(socket, ListenSocket { endpoint, on_status });
        debug!("{socket} listening on {endpoint}");
        Ok(socket)
    }

    fn find_listener(&self, endpoint: Endpoint) -> Option<(ListenSocketHandle, StatusCallback)> {
        self.listen_sockets
            .iter()
            .find(|(_, s)| s.endpoint == endpoint)
            .map(|(handle, s)| (*handle, s.on_status.clone()))
    }

    /// Moves `conn` to `state` and records the change for the next pump.
    fn transition(&mut self, conn: ConnectionHandle, state: ConnectionState) {
        let Some(c) = self.connections.get_mut(&conn) else {
            return;
        };
        let old_state = c.state;
        c.state = state;
        let change = StatusChange {
            connection: conn,
            old_state,
            info: c.info(),
        };
        trace!("{conn}: {old_state} -> {state}");
        self.pending.push_back((c.on_status.clone(), change));
    }

    fn fail(&mut self, conn: ConnectionHandle, reason: i32, debug: &str) {
        if let Some(c) = self.connections.get_mut(&conn) {
            c.end_reason = reason;
            c.end_debug = debug.to_owned();
        }
        self.transition(conn, ConnectionState::ProblemDetectedLocally);
    }

    /// Creates the outbound half of a connection in `Connecting`.
    fn start_outbound(
        &mut self,
        peer_address: NetworkAddress,
        remote_identity: Option<PeerIdentity>,
        on_status: StatusCallback,
    ) -> Result<ConnectionHandle, TransportError> {
        let conn = ConnectionHandle(self.allocate()?);
        let mut c = Connection::new(on_status);
        c.peer_address = peer_address;
        c.remote_identity = remote_identity;
        self.connections.insert(conn, c);
        self.transition(conn, ConnectionState::Connecting);
        Ok(conn)
    }

    /// Creates the inbound half of `client` on `listen_socket` and announces
    /// it to the listener as `None -> Connecting`.
    fn start_inbound(
        &mut self,
        client: ConnectionHandle,
        listen_socket: ListenSocketHandle,
        on_status: StatusCallback,
        remote_identity: Option<PeerIdentity>,
    ) -> Result<ConnectionHandle, TransportError> {
        let server = ConnectionHandle(self.allocate()?);
        let mut c = Connection::new(on_status);
        c.peer = Some(client);
        c.listen_socket = listen_socket;
        c.remote_identity = remote_identity;
        if remote_identity.is_none() {
            let port = EPHEMERAL_PORT_BASE + (client.raw() % 16_384) as u16;
            c.peer_address = NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        }
        self.connections.insert(server, c);
        if let Some(c) = self.connections.get_mut(&client) {
            c.peer = Some(server);
        }
        self.transition(server, ConnectionState::Connecting);
        Ok(server)
    }

    fn connection_mut(&mut self, conn: ConnectionHandle) -> Result<&mut Connection, TransportError> {
        self.connections
            .get_mut(&conn)
            .ok_or(TransportError::InvalidHandle(conn.raw()))
    }

    fn take_message(&mut self, conn: ConnectionHandle) -> Option<ReceivedMessage> {
        let (message_number, payload) = self.connections.get_mut(&conn)?.inbox.pop_front()?;
        Some(ReceivedMessage {
            connection: conn,
            payload,
            message_number,
        })
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new(PeerIdentity::DEFAULT_LOCAL)
    }
}

impl Transport for LocalTransport {
    fn create_listen_socket_ip(
        &mut self,
        local: NetworkAddress,
        on_status: StatusCallback,
    ) -> Result<ListenSocketHandle, TransportError> {
        self.listen(Endpoint::Ip(local.port()), on_status)
    }

    fn create_listen_socket_p2p(
        &mut self,
        virtual_port: i32,
        on_status: StatusCallback,
    ) -> Result<ListenSocketHandle, TransportError> {
        self.listen(Endpoint::P2p(virtual_port), on_status)
    }

    fn close_listen_socket(&mut self, socket: ListenSocketHandle) -> Result<(), TransportError> {
        self.listen_sockets
            .remove(&socket)
            .map(|s| debug!("{socket} stopped listening on {}", s.endpoint))
            .ok_or(TransportError::InvalidHandle(socket.raw()))
    }

    fn connect_by_ip_address(
        &mut self,
        remote: NetworkAddress,
        on_status: StatusCallback,
    ) -> Result<ConnectionHandle, TransportError> {
        if !remote.ip().is_loopback() && !remote.ip().is_unspecified() {
            return Err(TransportError::NoRoute(remote.to_string()));
        }
        let client = self.start_outbound(remote, None, on_status)?;
        match self.find_listener(Endpoint::Ip(remote.port())) {
            Some((socket, listener_cb)) => {
                self.start_inbound(client, socket, listener_cb, None)?;
            }
            None => self.fail(client, end_reason::REMOTE_BAD_CONNECT, "no listener at remote address"),
        }
        Ok(client)
    }

    fn connect_p2p(
        &mut self,
        identity: PeerIdentity,
        virtual_port: i32,
        on_status: StatusCallback,
    ) -> Result<ConnectionHandle, TransportError> {
        let client = self.start_outbound(NetworkAddress::default(), Some(identity), on_status)?;
        if identity != self.local_identity {
            self.fail(client, end_reason::MISC_NO_RELAY_SESSIONS, "no route to remote identity");
            return Ok(client);
        }
        match self.find_listener(Endpoint::P2p(virtual_port)) {
            Some((socket, listener_cb)) => {
                self.transition(client, ConnectionState::FindingRoute);
                let local = self.local_identity;
                self.start_inbound(client, socket, listener_cb, Some(local))?;
            }
            None => self.fail(client, end_reason::REMOTE_BAD_CONNECT, "no listener on virtual port"),
        }
        Ok(client)
    }

    fn accept_connection(&mut self, connection: ConnectionHandle) -> Result<(), TransportError> {
        let c = self.connection_mut(connection)?;
        let invalid_state = TransportError::InvalidState {
            handle: connection.raw(),
            state: c.state,
        };
        if !c.listen_socket.is_valid() || c.state != ConnectionState::Connecting {
            return Err(invalid_state);
        }
        let peer = c.peer.ok_or(invalid_state)?;
        self.transition(connection, ConnectionState::Connected);
        self.transition(peer, ConnectionState::Connected);
        info!("{connection} accepted, peer {peer} connected");
        Ok(())
    }

    fn close_connection(
        &mut self,
        connection: ConnectionHandle,
        reason: i32,
        debug: &str,
        linger: bool,
    ) -> Result<(), TransportError> {
        let closed = self
            .connections
            .remove(&connection)
            .ok_or(TransportError::InvalidHandle(connection.raw()))?;
        debug!("{connection} closed (reason {reason}, linger {linger})");

        let Some(peer) = closed.peer else {
            return Ok(());
        };
        let Some(p) = self.connections.get_mut(&peer) else {
            return Ok(());
        };
        p.peer = None;
        if p.state.is_terminal() {
            return Ok(());
        }
        p.end_reason = if reason == end_reason::INVALID {
            end_reason::APP_GENERIC
        } else {
            reason
        };
        p.end_debug = debug.to_owned();
        self.transition(peer, ConnectionState::ClosedByPeer);
        Ok(())
    }

    fn connection_info(&self, connection: ConnectionHandle) -> Result<ConnectionInfo, TransportError> {
        self.connections
            .get(&connection)
            .map(Connection::info)
            .ok_or(TransportError::InvalidHandle(connection.raw()))
    }

    fn send_message_to_connection(
        &mut self,
        connection: ConnectionHandle,
        payload: &[u8],
        flags: SendFlags,
    ) -> Result<(), TransportError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let c = self.connection_mut(connection)?;
        let peer = match (c.state, c.peer) {
            (ConnectionState::Connected, Some(peer)) => peer,
            (state, _) => {
                return Err(TransportError::InvalidState {
                    handle: connection.raw(),
                    state,
                })
            }
        };
        let number = self.next_message_number;
        self.next_message_number += 1;
        let inbox = &mut self.connection_mut(peer)?.inbox;
        inbox.push_back((number, payload.to_vec()));
        trace!("{connection} -> {peer}: message {number}, {} bytes {flags}", payload.len());
        Ok(())
    }

    fn receive_message_on_connection(&mut self, connection: ConnectionHandle) -> Option<ReceivedMessage> {
        self.take_message(connection)
    }

    fn receive_message_on_poll_group(&mut self, group: PollGroupHandle) -> Option<ReceivedMessage> {
        if !self.poll_groups.contains(&group) {
            return None;
        }
        let oldest = self
            .connections
            .iter()
            .filter(|(_, c)| c.poll_group == group)
            .filter_map(|(handle, c)| c.inbox.front().map(|(number, _)| (*number, *handle)))
            .min()?;
        self.take_message(oldest.1)
    }

    fn create_poll_group(&mut self) -> Result<PollGroupHandle, TransportError> {
        let group = PollGroupHandle(self.allocate()?);
        self.poll_groups.insert(group);
        Ok(group)
    }

    fn destroy_poll_group(&mut self, group: PollGroupHandle) -> Result<(), TransportError> {
        if !self.poll_groups.remove(&group) {
            return Err(TransportError::InvalidHandle(group.raw()));
        }
        for c in self.connections.values_mut().filter(|c| c.poll_group == group) {
            c.poll_group = PollGroupHandle::INVALID;
        }
        Ok(())
    }

    fn set_connection_poll_group(
        &mut self,
        connection: ConnectionHandle,
        group: PollGroupHandle,
    ) -> Result<(), TransportError> {
        if group.is_valid() && !self.poll_groups.contains(&group) {
            return Err(TransportError::InvalidHandle(group.raw()));
        }
        self.connection_mut(connection)?.poll_group = group;
        Ok(())
    }

    fn run_callbacks(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (on_status, change) in pending {
            on_status(&change);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
