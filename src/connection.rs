//! Connection state shared by the queue and store adapters.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Notify;

/// Readiness and reconnection bookkeeping for one backing-service connection.
///
/// # Memory Ordering
///
/// All atomics use `SeqCst`. Readiness gates whether a request may touch the
/// backing service at all, so it must be visible to every handler at once.
///
/// # Reconnection Coordination
///
/// Only one task reconnects at a time. Others call [`wait_for_reconnection`]
/// and are woken through `Notify` when the attempt finishes, then inspect
/// [`is_connected`] for the outcome.
///
/// [`wait_for_reconnection`]: ConnectionState::wait_for_reconnection
/// [`is_connected`]: ConnectionState::is_connected
#[derive(Debug)]
pub struct ConnectionState {
    connected: AtomicBool,
    /// Failures since the last successful operation (for logging)
    consecutive_failures: AtomicU32,
    reconnecting: AtomicBool,
    reconnect_complete: Notify,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            reconnecting: AtomicBool::new(false),
            reconnect_complete: Notify::new(),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        if connected {
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Mark the connection lost and return how many failures happened in a row.
    pub fn record_failure(&self) -> u32 {
        self.connected.store(false, Ordering::SeqCst);
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[cfg(test)]
    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Claim the reconnect slot. Returns `false` if another task holds it.
    pub fn start_reconnecting(&self) -> bool {
        !self.reconnecting.swap(true, Ordering::SeqCst)
    }

    pub fn stop_reconnecting(&self) {
        self.reconnecting.store(false, Ordering::SeqCst);
        self.reconnect_complete.notify_waiters();
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    /// Wait for an ongoing reconnection to complete.
    ///
    /// Returns immediately if no reconnection is in progress. The notification
    /// is registered before checking the flag so a reconnect finishing in
    /// between cannot be missed.
    pub async fn wait_for_reconnection(&self) {
        let notified = self.reconnect_complete.notified();
        if self.is_reconnecting() {
            notified.await;
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
