//! Controller discovery.
//!
//! Discovery is run per [`DeviceClass`]: the transport is asked for every device
//! matching the class's (vendor, product) pair and each unseen path is opened,
//! classified, registered, and put into buttons-only reporting mode with a status
//! request queued behind it.
//!
//! Paths already in the registry are skipped, so discovery can be repeated freely
//! (for example from a "connect" button) without duplicating devices.

use crate::device::{DeviceClass, DeviceDescriptor, ManagedDevice};
use crate::error::Result;
use crate::handle::DeviceHandle;
use crate::manager::WiimoteManager;
use crate::report;
use tracing::{debug, info, warn};

/// Outcome of one discovery pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Descriptors the transport reported for the class's identifiers.
    pub matched: usize,
    /// Devices newly added to the registry by this pass.
    pub registered: usize,
}

impl Discovery {
    /// At least one matching controller is present, new or already registered.
    pub fn found(&self) -> bool {
        self.matched > 0
    }
}

impl WiimoteManager {
    /// Look for Wii Remotes and Wii Remote Plus controllers (Pro Controllers are
    /// found by the Plus pass). Both passes always run.
    ///
    /// Returns `true` if either pass matched a device. A pass whose enumeration fails
    /// is logged and counts as no match; the error is returned only when both fail.
    pub fn find_wiimotes(&mut self) -> Result<bool> {
        let classic = self.discover(DeviceClass::Wiimote);
        let plus = self.discover(DeviceClass::WiimotePlus);

        match (classic, plus) {
            (Err(e), Err(plus_err)) => {
                warn!("{} discovery failed: {plus_err}", DeviceClass::WiimotePlus);
                Err(e)
            }
            (classic, plus) => {
                let mut found = false;
                for (class, pass) in [(DeviceClass::Wiimote, classic), (DeviceClass::WiimotePlus, plus)] {
                    match pass {
                        Ok(outcome) => found |= outcome.found(),
                        Err(e) => warn!("{class} discovery failed: {e}"),
                    }
                }
                Ok(found)
            }
        }
    }

    /// Enumerate devices for `class` and register the ones not seen before.
    ///
    /// Only a failure to enumerate at all is an error. A device that cannot be opened
    /// is logged and left out of the registry; the pass continues with the rest.
    pub fn discover(&mut self, class: DeviceClass) -> Result<Discovery> {
        let (vendor_id, product_id) = class.hid_ids();
        let listing = self.transport.enumerate(vendor_id, product_id)?;

        let mut outcome = Discovery {
            matched: listing.len(),
            registered: 0,
        };
        if listing.is_empty() {
            debug!("no {class} found ({vendor_id:04x}:{product_id:04x})");
            return Ok(outcome);
        }

        for descriptor in &listing {
            if self.registry.contains(&descriptor.path) {
                continue;
            }
            if self.register(descriptor, class) {
                outcome.registered += 1;
            }
        }

        if outcome.registered > 0 {
            info!(
                "discovered {} new device(s) for {class} ({} matched)",
                outcome.registered, outcome.matched
            );
        }
        Ok(outcome)
    }

    fn register(&mut self, descriptor: &DeviceDescriptor, class: DeviceClass) -> bool {
        let conn = match self.transport.open_path(&descriptor.path) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(path = %descriptor.path, "skipping device: {e}");
                return false;
            }
        };

        let class = class.resolve(descriptor.product_string.as_deref());
        let handle = DeviceHandle::new(descriptor.path.clone(), conn);
        if !self.registry.insert(ManagedDevice::new(descriptor, class, handle.clone())) {
            return false;
        }

        if self.dispatcher.debug_messages() {
            debug!(path = %descriptor.path, "Found new remote: {class}");
        }

        let mode = report::data_report_mode(report::MODE_BUTTONS, false);
        let status = report::status_request();
        for setup in [&mode[..], &status[..]] {
            if let Err(e) = self.dispatcher.enqueue(&handle, setup) {
                warn!(path = %descriptor.path, "could not queue setup report: {e}");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::VirtualTransport;
    use crate::error::Error;

    fn remote(path: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(0x057e, 0x0306, path).with_product_string("Nintendo RVL-CNT-01")
    }

    #[test]
    fn empty_bus_matches_nothing_and_releases_listing() {
        let bus = VirtualTransport::new();
        let mut mgr = WiimoteManager::new(bus.clone());

        let outcome = mgr.discover(DeviceClass::Wiimote).unwrap();
        assert_eq!(outcome, Discovery::default());
        assert!(!outcome.found());
        assert_eq!(bus.enumerations_outstanding(), 0);
        assert_eq!(bus.enumerations_released(), 1);
    }

    #[test]
    fn enumeration_failure_is_an_error() {
        let bus = VirtualTransport::new();
        bus.set_enumeration_failure(true);
        let mut mgr = WiimoteManager::new(bus.clone());

        let err = mgr.discover(DeviceClass::Wiimote).unwrap_err();
        assert!(matches!(err, Error::EnumerationFailed(_)));
        assert!(mgr.find_wiimotes().is_err());
    }

    #[test]
    fn new_device_is_registered_once() {
        let bus = VirtualTransport::new();
        bus.attach(remote("P1"));
        let mut mgr = WiimoteManager::new(bus.clone());

        let first = mgr.discover(DeviceClass::Wiimote).unwrap();
        assert_eq!(first, Discovery { matched: 1, registered: 1 });

        let second = mgr.discover(DeviceClass::Wiimote).unwrap();
        assert_eq!(second, Discovery { matched: 1, registered: 0 });
        assert!(second.found());

        assert_eq!(mgr.devices().len(), 1);
        assert_eq!(bus.open_count("P1"), 1);
        assert_eq!(bus.enumerations_outstanding(), 0);
        assert_eq!(bus.enumerations_released(), 2);
    }

    #[test]
    fn unopenable_device_is_skipped() {
        let bus = VirtualTransport::new();
        bus.attach(remote("P1"));
        bus.attach(remote("P2"));
        bus.fail_open("P1");
        let mut mgr = WiimoteManager::new(bus.clone());

        let outcome = mgr.discover(DeviceClass::Wiimote).unwrap();
        assert_eq!(outcome, Discovery { matched: 2, registered: 1 });
        assert!(mgr.device("P1").is_none());
        assert!(mgr.device("P2").is_some());
    }

    #[test]
    fn pro_controller_is_reclassified() {
        let bus = VirtualTransport::new();
        bus.attach(
            DeviceDescriptor::new(0x057e, 0x0330, "PRO").with_product_string("Nintendo RVL-CNT-01-UC"),
        );
        bus.attach(
            DeviceDescriptor::new(0x057e, 0x0330, "PLUS").with_product_string("Nintendo RVL-CNT-01-TR"),
        );
        let mut mgr = WiimoteManager::new(bus.clone());

        mgr.discover(DeviceClass::WiimotePlus).unwrap();
        assert_eq!(mgr.device("PRO").map(|d| d.class()), Some(DeviceClass::ProController));
        assert_eq!(mgr.device("PLUS").map(|d| d.class()), Some(DeviceClass::WiimotePlus));
    }

    #[test]
    fn find_wiimotes_runs_both_passes() {
        let bus = VirtualTransport::new();
        bus.attach(remote("CLASSIC"));
        bus.attach(DeviceDescriptor::new(0x057e, 0x0330, "PLUS"));
        let mut mgr = WiimoteManager::new(bus.clone());

        assert!(mgr.find_wiimotes().unwrap());
        assert_eq!(mgr.devices().len(), 2);
        assert_eq!(mgr.device("PLUS").map(|d| d.class()), Some(DeviceClass::WiimotePlus));
    }

    #[test]
    fn failed_classic_pass_still_runs_plus_pass() {
        let bus = VirtualTransport::new();
        bus.attach(remote("CLASSIC"));
        bus.attach(DeviceDescriptor::new(0x057e, 0x0330, "PLUS"));
        bus.fail_enumeration_for(0x0306);
        let mut mgr = WiimoteManager::new(bus.clone());

        assert!(mgr.find_wiimotes().unwrap());
        assert!(mgr.device("PLUS").is_some());
        assert!(mgr.device("CLASSIC").is_none());
        assert_eq!(bus.enumerations_outstanding(), 0);
    }

    #[test]
    fn failed_plus_pass_keeps_classic_result() {
        let bus = VirtualTransport::new();
        bus.attach(remote("CLASSIC"));
        bus.fail_enumeration_for(0x0330);
        let mut mgr = WiimoteManager::new(bus.clone());

        assert!(mgr.find_wiimotes().unwrap());
        assert_eq!(mgr.devices().len(), 1);
    }

    #[test]
    fn failed_pass_with_no_match_elsewhere_is_false() {
        let bus = VirtualTransport::new();
        bus.fail_enumeration_for(0x0306);
        let mut mgr = WiimoteManager::new(bus.clone());
        assert!(!mgr.find_wiimotes().unwrap());
    }

    #[test]
    fn find_wiimotes_on_empty_bus_is_false() {
        let bus = VirtualTransport::new();
        let mut mgr = WiimoteManager::new(bus.clone());
        assert!(!mgr.find_wiimotes().unwrap());
        assert_eq!(bus.enumerations_released(), 2);
    }
}
