//! Registry of connected controllers, keyed by transport path.

use crate::device::ManagedDevice;

/// Ordered list of [`ManagedDevice`]s, in discovery order.
///
/// Read access is public. Only discovery and the lifecycle operations of
/// [`WiimoteManager`](crate::manager::WiimoteManager) insert or remove entries.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<ManagedDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[ManagedDevice] {
        &self.devices
    }

    pub fn contains(&self, path: &str) -> bool {
        self.devices.iter().any(|d| d.path() == path)
    }

    pub fn lookup(&self, path: &str) -> Option<&ManagedDevice> {
        self.devices.iter().find(|d| d.path() == path)
    }

    /// Whether a controller is connected.
    ///
    /// Only the first registered entry is checked. A closed handle further down the
    /// list is not noticed, and an open one behind a closed head is not counted.
    pub fn has_any(&self) -> bool {
        self.devices.first().is_some_and(ManagedDevice::is_connected)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Add a device unless its path is already registered. Returns whether it was added.
    pub(crate) fn insert(&mut self, device: ManagedDevice) -> bool {
        if self.contains(device.path()) {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub(crate) fn remove(&mut self, path: &str) -> Option<ManagedDevice> {
        let idx = self.devices.iter().position(|d| d.path() == path)?;
        Some(self.devices.remove(idx))
    }

    pub(crate) fn drain(&mut self) -> Vec<ManagedDevice> {
        std::mem::take(&mut self.devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::VirtualTransport;
    use crate::backends::HidTransport;
    use crate::device::{DeviceClass, DeviceDescriptor};
    use crate::handle::DeviceHandle;

    fn device(bus: &VirtualTransport, path: &str) -> ManagedDevice {
        let desc = DeviceDescriptor::new(0x057e, 0x0306, path);
        bus.attach(desc.clone());
        let handle = DeviceHandle::new(path, bus.open_path(path).unwrap());
        ManagedDevice::new(&desc, DeviceClass::Wiimote, handle)
    }

    #[test]
    fn insert_rejects_duplicate_path() {
        let bus = VirtualTransport::new();
        let mut reg = DeviceRegistry::new();
        assert!(reg.insert(device(&bus, "P1")));
        assert!(!reg.insert(device(&bus, "P1")));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains("P1"));
        assert_eq!(reg.lookup("P1").map(ManagedDevice::class), Some(DeviceClass::Wiimote));
    }

    #[test]
    fn has_any_follows_head_entry() {
        let bus = VirtualTransport::new();
        let mut reg = DeviceRegistry::new();
        assert!(!reg.has_any());

        reg.insert(device(&bus, "P1"));
        reg.insert(device(&bus, "P2"));
        assert!(reg.has_any());

        reg.list()[0].handle().close();
        assert!(!reg.has_any());

        let removed = reg.remove("P1").unwrap();
        assert_eq!(removed.path(), "P1");
        assert!(reg.has_any());
    }

    #[test]
    fn drain_empties_registry_in_order() {
        let bus = VirtualTransport::new();
        let mut reg = DeviceRegistry::new();
        reg.insert(device(&bus, "P1"));
        reg.insert(device(&bus, "P2"));

        let drained: Vec<String> = reg.drain().iter().map(|d| d.path().to_string()).collect();
        assert_eq!(drained, vec!["P1", "P2"]);
        assert!(reg.is_empty());
    }
}
