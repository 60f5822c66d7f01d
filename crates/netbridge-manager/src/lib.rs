//! netbridge-manager library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::event_queue::EventQueue;
pub use application::network_manager::{NetworkError, NetworkManager, DEFAULT_VIRTUAL_PORT};
pub use application::transport::{
    ReceivedMessage, StatusCallback, StatusChange, Transport, TransportError,
};
pub use infrastructure::transport::LocalTransport;
