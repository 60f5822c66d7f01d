//! Point-in-time connection snapshot.

use serde::{Deserialize, Serialize};

use super::address::{NetworkAddress, PeerIdentity};
use super::handles::ListenSocketHandle;
use super::state::ConnectionState;

/// What the transport knew about a connection at the moment it was queried.
///
/// A snapshot is built fresh for every query and never updated afterwards;
/// query again to observe later transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Listen socket the connection was accepted on, or
    /// [`ListenSocketHandle::INVALID`] for outbound connections.
    pub listen_socket: ListenSocketHandle,
    /// Remote IP address, unspecified when the route is relayed.
    pub peer_address: NetworkAddress,
    /// Remote identity, when the connection was made by identity.
    pub remote_identity: Option<PeerIdentity>,
    pub state: ConnectionState,
    /// One of the [`crate::domain::state::end_reason`] codes, `0` while open.
    pub end_reason: i32,
    /// Human-readable close explanation supplied by whoever closed it.
    pub end_debug: String,
}

impl ConnectionInfo {
    /// `true` when the connection was accepted on one of our listen sockets.
    pub fn is_inbound(&self) -> bool {
        self.listen_socket.is_valid()
    }
}
