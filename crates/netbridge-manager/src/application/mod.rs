//! Application layer: the connection manager and the seams it depends on.
//!
//! # Sub-modules
//!
//! - **`transport`** – The [`Transport`](transport::Transport) trait the
//!   manager drives, plus the callback and message types crossing it.
//!
//! - **`event_queue`** – Mutex-guarded FIFO filled by transport status
//!   callbacks and drained by the application's poll loop.
//!
//! - **`network_manager`** – [`NetworkManager`](network_manager::NetworkManager):
//!   listen sockets, connections, poll groups, sends, receives and the event
//!   pump.  Contains no socket code of its own.

pub mod event_queue;
pub mod network_manager;
pub mod transport;
