//! Device classes, enumeration records and registry entries.
//!
//! A Wii Remote is identified on the HID bus by one of two (vendor, product) pairs:
//! the classic remote (`057e:0306`) and the newer Remote Plus (`057e:0330`). The Wii U
//! Pro Controller reuses the Plus identifiers and only differs by its product string,
//! so its class is resolved after matching, from the descriptor.

use crate::handle::DeviceHandle;
use crate::metadata::DeviceMeta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nintendo's USB/Bluetooth vendor id.
pub const NINTENDO_VENDOR_ID: u16 = 0x057e;
pub const WIIMOTE_PRODUCT_ID: u16 = 0x0306;
pub const WIIMOTE_PLUS_PRODUCT_ID: u16 = 0x0330;

/// Product string suffix carried by Wii U Pro Controllers ("Nintendo RVL-CNT-01-UC").
pub const PRO_CONTROLLER_SUFFIX: &str = "UC";

/// Which kind of controller a device is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Wiimote,
    WiimotePlus,
    ProController,
}

impl DeviceClass {
    /// The (vendor, product) pair enumerated for this class.
    ///
    /// `WiimotePlus` and `ProController` share a pair.
    pub fn hid_ids(self) -> (u16, u16) {
        match self {
            DeviceClass::Wiimote => (NINTENDO_VENDOR_ID, WIIMOTE_PRODUCT_ID),
            DeviceClass::WiimotePlus | DeviceClass::ProController => {
                (NINTENDO_VENDOR_ID, WIIMOTE_PLUS_PRODUCT_ID)
            }
        }
    }

    /// Resolve the final class of a device matched while enumerating for `self`.
    ///
    /// On the shared Plus pair the product string decides: a `"UC"` suffix is a Pro
    /// Controller, anything else (including a missing string) is a Remote Plus.
    pub fn resolve(self, product_string: Option<&str>) -> DeviceClass {
        match self {
            DeviceClass::Wiimote => DeviceClass::Wiimote,
            DeviceClass::WiimotePlus | DeviceClass::ProController => {
                if product_string.is_some_and(|s| s.trim_end().ends_with(PRO_CONTROLLER_SUFFIX)) {
                    DeviceClass::ProController
                } else {
                    DeviceClass::WiimotePlus
                }
            }
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::Wiimote => "Wii Remote",
            DeviceClass::WiimotePlus => "Wii Remote Plus",
            DeviceClass::ProController => "Wii U Pro Controller",
        };
        f.write_str(s)
    }
}

/// One enumerated device, before a handle is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Opaque, transport-unique path. Used as the registry key.
    pub path: String,
    pub product_string: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            product_string: None,
            serial_number: None,
        }
    }

    pub fn with_product_string(mut self, product: impl Into<String>) -> Self {
        self.product_string = Some(product.into());
        self
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }
}

/// A connected controller owned by the registry.
///
/// The entry exclusively owns its [`DeviceHandle`]; removing it from the registry
/// through [`WiimoteManager::cleanup`](crate::manager::WiimoteManager::cleanup) closes
/// the handle.
#[derive(Debug)]
pub struct ManagedDevice {
    path: String,
    class: DeviceClass,
    handle: DeviceHandle,
    meta: DeviceMeta,
}

impl ManagedDevice {
    pub(crate) fn new(descriptor: &DeviceDescriptor, class: DeviceClass, handle: DeviceHandle) -> Self {
        Self {
            path: descriptor.path.clone(),
            class,
            handle,
            meta: DeviceMeta::from_descriptor(descriptor, class),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Handle used with `send_raw` / `receive_raw`.
    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    /// `true` until the handle is closed.
    pub fn is_connected(&self) -> bool {
        self.handle.is_open()
    }
}

impl fmt::Display for ManagedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.class, self.path)
    }
}
