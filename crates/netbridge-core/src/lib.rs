//! # netbridge-core
//!
//! Shared value types for the netbridge connection manager: opaque resource
//! handles, connection states and snapshots, state-change events, peer
//! addressing, send flags, and the datagram payload builder/reader.
//!
//! This crate has no dependency on any transport or socket API.
//!
//! # Architecture overview (for beginners)
//!
//! netbridge sits between an application and a datagram transport.  The
//! application opens listen sockets or connects to peers, the transport reports
//! connection state changes through a callback, and the manager turns those
//! into a queue of events the application drains once per tick.
//!
//! This crate defines the vocabulary shared by every layer:
//!
//! - **`domain`** – handles, [`ConnectionState`], [`ConnectionInfo`]
//!   snapshots, [`Event`]s, and the [`NetworkAddress`] / [`PeerIdentity`]
//!   parsers.
//!
//! - **`protocol`** – [`Datagram`] for packing fields into a payload,
//!   [`DatagramIterator`] for reading them back, the received [`Message`], and
//!   [`SendFlags`].

pub mod domain;
pub mod protocol;

pub use domain::address::{AddressError, IdentityError, NetworkAddress, PeerIdentity};
pub use domain::event::Event;
pub use domain::handles::{ConnectionHandle, ListenSocketHandle, PollGroupHandle};
pub use domain::info::ConnectionInfo;
pub use domain::state::{end_reason, ConnectionState};
pub use protocol::{Datagram, DatagramError, DatagramIterator, Message, SendFlags};
