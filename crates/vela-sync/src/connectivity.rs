//! Soft connectivity tracking.
//!
//! Wraps the remote health probe and remembers the last observed state.
//! Connectivity here is advisory only: a positive probe does not guarantee
//! the next request succeeds, and every network call path handles failure
//! on its own. The cached state exists so cheap "are we probably online"
//! checks do not hit the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::remote::RemoteApi;

/// Tracks whether the backend looked reachable at the last probe.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    remote: Arc<dyn RemoteApi>,
    last_online: Arc<AtomicBool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor that starts out assuming we are offline until the
    /// first probe says otherwise.
    pub fn new(remote: Arc<dyn RemoteApi>) -> Self {
        ConnectivityMonitor {
            remote,
            last_online: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Probes the backend and records the result.
    pub async fn probe(&self) -> bool {
        let online = self.remote.health_check().await;
        self.last_online.store(online, Ordering::Relaxed);
        debug!(online, "Connectivity probe");
        online
    }

    /// Last observed state without touching the network.
    pub fn last_known_online(&self) -> bool {
        self.last_online.load(Ordering::Relaxed)
    }

    /// Lets callers that just saw a request fail (or succeed) feed that
    /// observation back in, keeping the cached state honest between probes.
    pub fn observe(&self, online: bool) {
        self.last_online.store(online, Ordering::Relaxed);
    }
}
