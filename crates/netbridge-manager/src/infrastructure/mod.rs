//! Infrastructure layer: concrete transports, the process-wide manager
//! instance, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `netbridge_core`, but MUST NOT be imported by the `application` layer.

pub mod global;
pub mod storage;
pub mod transport;
