//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a registered controller
//! suitable for UI display, logging, and persistence. It is captured once, from the
//! enumeration descriptor, when the device is first registered.
//!
//! ## Persistence notes
//! - `vid`/`pid` and `serial_number` (when present) are generally stable.
//! - `path` is platform-specific and changes across reconnects; it identifies a device
//!   within one session, not across sessions.
//!
//! # Example
//! ```no_run
//! # fn demo(mgr: &motelink::WiimoteManager) {
//! for dev in mgr.devices() {
//!     println!("{}: {:?}", dev, dev.meta());
//! }
//! # }
//! ```

use crate::device::{DeviceClass, DeviceDescriptor};
use serde::{Deserialize, Serialize};

/// Snapshot of metadata describing a single controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Class resolved at discovery time.
    pub class: DeviceClass,

    /// USB/Bluetooth Vendor ID.
    pub vid: u16,

    /// USB/Bluetooth Product ID.
    pub pid: u16,

    /// Human-readable product name reported by the transport, if any.
    ///
    /// For Wii Remotes this is usually `"Nintendo RVL-CNT-01"` with a `-TR` or `-UC`
    /// suffix on newer hardware.
    pub product_string: Option<String>,

    /// Device serial number (on Bluetooth stacks, usually the remote's address).
    pub serial_number: Option<String>,

    /// Transport path. Opaque.
    pub path: String,
}

impl DeviceMeta {
    pub(crate) fn from_descriptor(descriptor: &DeviceDescriptor, class: DeviceClass) -> Self {
        Self {
            class,
            vid: descriptor.vendor_id,
            pid: descriptor.product_id,
            product_string: descriptor.product_string.clone(),
            serial_number: descriptor.serial_number.clone(),
            path: descriptor.path.clone(),
        }
    }
}
