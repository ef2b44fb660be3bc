//! Connectivity Probe Port
//!
//! Defines the interface for asking whether the network is reachable.

use async_trait::async_trait;

/// Reports whether the host is currently online.
///
/// Used to gate periodic flushes: an offline tick makes no network calls.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;

    /// Record an explicit `{online}` signal. Probes that measure the network
    /// themselves ignore it.
    fn observe(&self, _online: bool) {}
}
