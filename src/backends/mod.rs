//! HID transport backends for `motelink`.
//!
//! The manager never talks to an OS API directly. It goes through two traits:
//! [`HidTransport`] (enumerate + open) and [`HidConnection`] (one open device).
//!
//! # Feature flags
//! - **`hid`**: enables [`hid::HidApiTransport`], backed by the `hidapi` crate.
//!
//! [`virtual_hid::VirtualTransport`] is always available. It is an in-memory bus with
//! scripted devices, used by the test suite and handy for running a host application
//! without hardware.

use crate::device::DeviceDescriptor;
use crate::error::Result;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;
pub mod virtual_hid;

/// Source of devices: enumeration and opening by path.
pub trait HidTransport: Send + Sync {
    /// All currently visible devices matching `vendor_id`/`product_id`.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Enumeration>;

    /// Open the device at `path` for reading and writing.
    fn open_path(&self, path: &str) -> Result<Box<dyn HidConnection>>;
}

/// One open device connection.
pub trait HidConnection: Send {
    /// Write one output report; returns the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read one input report into `buf`. In non-blocking mode `Ok(0)` means no data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()>;

    /// Last error the transport recorded for this connection, if it keeps one.
    fn last_error(&self) -> Option<String> {
        None
    }

    /// Close the connection. The default drops it.
    fn close(self: Box<Self>) {}
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Descriptor sequence returned by [`HidTransport::enumerate`].
///
/// Backends that hold transport-side memory for the listing attach a release hook,
/// which runs exactly once when the `Enumeration` is dropped, on every exit path.
pub struct Enumeration {
    descriptors: Vec<DeviceDescriptor>,
    release: Option<ReleaseHook>,
}

impl Enumeration {
    pub fn new(descriptors: Vec<DeviceDescriptor>) -> Self {
        Self {
            descriptors,
            release: None,
        }
    }

    pub fn with_release(
        descriptors: Vec<DeviceDescriptor>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            descriptors,
            release: Some(Box::new(release)),
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceDescriptor> {
        self.descriptors.iter()
    }
}

impl<'a> IntoIterator for &'a Enumeration {
    type Item = &'a DeviceDescriptor;
    type IntoIter = std::slice::Iter<'a, DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

impl Drop for Enumeration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Enumeration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enumeration")
            .field("descriptors", &self.descriptors)
            .field("release", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let list = Enumeration::with_release(Vec::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(list.is_empty());
        drop(list);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
