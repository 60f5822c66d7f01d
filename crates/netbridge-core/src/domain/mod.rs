//! Domain value objects for netbridge.
//!
//! Everything in here is a plain value: handles, states, snapshots, events and
//! addresses.  None of it talks to a transport, so it can be unit-tested on any
//! platform without setup.

pub mod address;
pub mod event;
pub mod handles;
pub mod info;
pub mod state;
