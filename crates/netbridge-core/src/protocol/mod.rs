//! Payload types: the datagram builder/reader, received messages, and send
//! flags.

pub mod datagram;
pub mod flags;
pub mod message;

pub use datagram::{Datagram, DatagramError, DatagramIterator};
pub use flags::SendFlags;
pub use message::Message;
