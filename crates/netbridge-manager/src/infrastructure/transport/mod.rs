//! Transport implementations.
//!
//! - **`local`** – [`LocalTransport`](local::LocalTransport), an in-process
//!   transport where both ends of a connection share one object.  Used by the
//!   echo binary and the integration tests.

pub mod local;

pub use local::{LocalTransport, MAX_MESSAGE_SIZE};
