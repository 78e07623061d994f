//! Teardown: closing one controller, or everything.

use crate::error::Result;
use crate::manager::WiimoteManager;
use tracing::{debug, info};

impl WiimoteManager {
    /// Close the controller at `path` and forget it.
    ///
    /// Reports already queued for it stay in the queue and are dropped by the writer
    /// when their turn comes. Returns `false` if no such device was registered.
    pub fn cleanup(&mut self, path: &str) -> bool {
        let Some(device) = self.registry.remove(path) else {
            return false;
        };
        device.handle().close();
        debug!(path = %path, "closed {}", device.class());
        true
    }

    /// Stop the writer thread, close every controller, and drop all queued reports.
    ///
    /// Teardown always completes. If the writer thread is stuck in a transport write
    /// past the configured `shutdown_timeout`, it is detached and the timeout is
    /// returned after everything else has been cleaned up. Calling this again (or with
    /// no writer ever started) is harmless.
    pub fn shutdown(&mut self) -> Result<()> {
        let stopped = self.dispatcher.stop(self.config.shutdown_timeout());

        let devices = self.registry.drain();
        for device in &devices {
            device.handle().close();
        }
        let discarded = self.dispatcher.clear();

        if !devices.is_empty() || discarded > 0 {
            info!(
                "shut down: closed {} device(s), discarded {} queued report(s)",
                devices.len(),
                discarded
            );
        }
        stopped
    }
}
