//! In-memory HID bus.
//!
//! [`VirtualTransport`] behaves like a HID transport populated with scripted devices.
//! It records every write (with a timestamp), every close, and every enumeration
//! listing that was handed out and later released, so callers can assert on exactly
//! what the manager did to the bus.
//!
//! ```
//! use motelink::backends::virtual_hid::VirtualTransport;
//! use motelink::{DeviceClass, DeviceDescriptor, WiimoteManager};
//!
//! let bus = VirtualTransport::new();
//! bus.attach(DeviceDescriptor::new(0x057e, 0x0306, "P1"));
//!
//! let mut mgr = WiimoteManager::new(bus.clone());
//! assert!(mgr.discover(DeviceClass::Wiimote).unwrap().found());
//! assert_eq!(mgr.devices().len(), 1);
//! ```

use crate::backends::{Enumeration, HidConnection, HidTransport};
use crate::device::DeviceDescriptor;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One write observed on the virtual bus.
#[derive(Clone, Debug)]
pub struct WriteRecord {
    pub path: String,
    pub data: Vec<u8>,
    pub at: Instant,
}

#[derive(Default)]
struct BusState {
    devices: Vec<DeviceDescriptor>,
    inbound: HashMap<String, VecDeque<Vec<u8>>>,
    writes: Vec<WriteRecord>,
    opens: HashMap<String, usize>,
    closes: HashMap<String, usize>,
    blocking_reads: usize,
    enumerations_outstanding: usize,
    enumerations_released: usize,
    fail_enumeration: bool,
    fail_enumeration_pids: HashSet<u16>,
    fail_open: HashSet<String>,
    fail_write: HashSet<String>,
    write_delay: Option<Duration>,
    writes_in_flight: usize,
    max_writes_in_flight: usize,
}

/// Shared, cloneable virtual bus. Clones observe the same state.
#[derive(Clone, Default)]
pub struct VirtualTransport {
    state: Arc<Mutex<BusState>>,
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        lock(&self.state)
    }

    /// Plug a device into the bus.
    pub fn attach(&self, descriptor: DeviceDescriptor) {
        self.state().devices.push(descriptor);
    }

    /// Unplug a device. Open connections stay usable; enumeration no longer lists it.
    pub fn detach(&self, path: &str) {
        self.state().devices.retain(|d| d.path != path);
    }

    /// Queue an input report for the device at `path`.
    pub fn push_input(&self, path: &str, report: &[u8]) {
        self.state()
            .inbound
            .entry(path.to_string())
            .or_default()
            .push_back(report.to_vec());
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state().writes.clone()
    }

    pub fn writes_to(&self, path: &str) -> Vec<Vec<u8>> {
        self.state()
            .writes
            .iter()
            .filter(|w| w.path == path)
            .map(|w| w.data.clone())
            .collect()
    }

    pub fn open_count(&self, path: &str) -> usize {
        self.state().opens.get(path).copied().unwrap_or(0)
    }

    pub fn close_count(&self, path: &str) -> usize {
        self.state().closes.get(path).copied().unwrap_or(0)
    }

    /// Reads performed while a connection was in blocking mode.
    pub fn blocking_reads(&self) -> usize {
        self.state().blocking_reads
    }

    /// Listings handed out by `enumerate` that have not been dropped yet.
    pub fn enumerations_outstanding(&self) -> usize {
        self.state().enumerations_outstanding
    }

    pub fn enumerations_released(&self) -> usize {
        self.state().enumerations_released
    }

    pub fn set_enumeration_failure(&self, fail: bool) {
        self.state().fail_enumeration = fail;
    }

    /// Fail enumeration only for devices with `product_id`.
    pub fn fail_enumeration_for(&self, product_id: u16) {
        self.state().fail_enumeration_pids.insert(product_id);
    }

    pub fn fail_open(&self, path: &str) {
        self.state().fail_open.insert(path.to_string());
    }

    pub fn fail_writes(&self, path: &str) {
        self.state().fail_write.insert(path.to_string());
    }

    /// Make every write take at least `delay`.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.state().write_delay = delay;
    }

    /// Highest number of writes that were ever inside the transport at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.state().max_writes_in_flight
    }
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HidTransport for VirtualTransport {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Enumeration> {
        let mut state = self.state();
        if state.fail_enumeration {
            return Err(Error::EnumerationFailed("virtual bus offline".into()));
        }
        if state.fail_enumeration_pids.contains(&product_id) {
            return Err(Error::EnumerationFailed(format!(
                "{vendor_id:04x}:{product_id:04x} unavailable"
            )));
        }

        let found: Vec<DeviceDescriptor> = state
            .devices
            .iter()
            .filter(|d| d.vendor_id == vendor_id && d.product_id == product_id)
            .cloned()
            .collect();

        state.enumerations_outstanding += 1;
        let bus = Arc::clone(&self.state);
        Ok(Enumeration::with_release(found, move || {
            let mut state = lock(&bus);
            state.enumerations_outstanding -= 1;
            state.enumerations_released += 1;
        }))
    }

    fn open_path(&self, path: &str) -> Result<Box<dyn HidConnection>> {
        let mut state = self.state();
        if state.fail_open.contains(path) || !state.devices.iter().any(|d| d.path == path) {
            return Err(Error::OpenFailed {
                path: path.to_string(),
                reason: "no such device".into(),
            });
        }
        *state.opens.entry(path.to_string()).or_default() += 1;

        Ok(Box::new(VirtualConnection {
            path: path.to_string(),
            nonblocking: false,
            last_error: None,
            bus: Arc::clone(&self.state),
        }))
    }
}

struct VirtualConnection {
    path: String,
    nonblocking: bool,
    last_error: Option<String>,
    bus: Arc<Mutex<BusState>>,
}

impl HidConnection for VirtualConnection {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let (delay, fail) = {
            let mut state = lock(&self.bus);
            state.writes_in_flight += 1;
            state.max_writes_in_flight = state.max_writes_in_flight.max(state.writes_in_flight);
            (state.write_delay, state.fail_write.contains(&self.path))
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        lock(&self.bus).writes_in_flight -= 1;
        if fail {
            let reason = format!("{}: device rejected output report", self.path);
            self.last_error = Some(reason.clone());
            return Err(Error::WriteFailed { reason });
        }

        lock(&self.bus).writes.push(WriteRecord {
            path: self.path.clone(),
            data: data.to_vec(),
            at: Instant::now(),
        });
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = lock(&self.bus);
        if !self.nonblocking {
            state.blocking_reads += 1;
        }
        let Some(report) = state.inbound.get_mut(&self.path).and_then(VecDeque::pop_front) else {
            return Ok(0);
        };
        let n = report.len().min(buf.len());
        buf[..n].copy_from_slice(&report[..n]);
        Ok(n)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.nonblocking = nonblocking;
        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn close(self: Box<Self>) {
        *lock(&self.bus).closes.entry(self.path.clone()).or_default() += 1;
    }
}
