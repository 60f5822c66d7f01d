//! Process-wide [`NetworkManager`] for hosts that want a single shared
//! instance instead of passing one around.
//!
//! The instance is built on first use.  Construction asks the registered
//! transport provider for a transport; with no provider, or a provider that
//! returns `None`, the instance is degraded and stays degraded for the life of
//! the process.
//!
//! ```no_run
//! use netbridge_manager::infrastructure::global;
//! use netbridge_manager::LocalTransport;
//!
//! global::register_transport_provider(|| Some(Box::new(LocalTransport::default())));
//! let socket = global::with_instance(|mgr| mgr.create_ip_listen_socket(27015));
//! ```

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::application::network_manager::NetworkManager;
use crate::application::transport::Transport;

type TransportProvider = Box<dyn Fn() -> Option<Box<dyn Transport>> + Send + Sync>;

/// Provider registration state.  `sealed` is set under the lock when the
/// instance reads the slot; registrations after that are refused.
struct ProviderSlot {
    provider: Option<TransportProvider>,
    sealed: bool,
}

static PROVIDER: Mutex<ProviderSlot> = Mutex::new(ProviderSlot {
    provider: None,
    sealed: false,
});
static INSTANCE: OnceLock<Mutex<NetworkManager>> = OnceLock::new();

fn provider_slot() -> MutexGuard<'static, ProviderSlot> {
    PROVIDER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registers the function the global instance uses to acquire its transport.
///
/// Returns `false` when a provider was already registered or the instance has
/// already been built; the call then has no effect.
pub fn register_transport_provider<F>(provider: F) -> bool
where
    F: Fn() -> Option<Box<dyn Transport>> + Send + Sync + 'static,
{
    let mut slot = provider_slot();
    if slot.sealed {
        warn!("transport provider registered after the global network manager was built; ignored");
        return false;
    }
    if slot.provider.is_some() {
        warn!("a transport provider is already registered; ignored");
        return false;
    }
    slot.provider = Some(Box::new(provider));
    true
}

/// Returns the process-wide manager, building it on first use.
pub fn instance() -> &'static Mutex<NetworkManager> {
    INSTANCE.get_or_init(|| {
        let mut slot = provider_slot();
        slot.sealed = true;
        let transport = slot.provider.take().and_then(|provide| provide());
        debug!("building global network manager (transport acquired: {})", transport.is_some());
        Mutex::new(NetworkManager::new(transport))
    })
}

/// Locks the process-wide manager, recovering a poisoned lock.
pub fn lock() -> MutexGuard<'static, NetworkManager> {
    instance().lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `f` with exclusive access to the process-wide manager.
pub fn with_instance<R>(f: impl FnOnce(&mut NetworkManager) -> R) -> R {
    f(&mut lock())
}
