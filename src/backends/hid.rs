//! `hidapi`-backed transport.
//!
//! Enumeration refreshes the shared `HidApi` device list and filters it by vendor and
//! product id. `hidapi` frees the native listing inside `refresh_devices`, so the
//! returned [`Enumeration`] carries no release hook of its own.

use crate::backends::{Enumeration, HidConnection, HidTransport};
use crate::device::DeviceDescriptor;
use crate::error::{Error, Result};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::ffi::CString;
use std::sync::{Mutex, PoisonError};

pub struct HidApiTransport {
    api: Mutex<HidApi>,
}

impl HidApiTransport {
    pub fn new() -> Result<Self> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

fn descriptor(info: &DeviceInfo) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        path: info.path().to_string_lossy().to_string(),
        product_string: info.product_string().map(|s| s.to_string()),
        serial_number: info.serial_number().map(|s| s.to_string()),
    }
}

impl HidTransport for HidApiTransport {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Enumeration> {
        let mut api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
        api.refresh_devices()
            .map_err(|e| Error::EnumerationFailed(e.to_string()))?;

        let found: Vec<DeviceDescriptor> = api
            .device_list()
            .filter(|info| info.vendor_id() == vendor_id && info.product_id() == product_id)
            .map(descriptor)
            .collect();

        tracing::trace!(
            "hidapi: {} device(s) match {:04x}:{:04x}",
            found.len(),
            vendor_id,
            product_id
        );
        Ok(Enumeration::new(found))
    }

    fn open_path(&self, path: &str) -> Result<Box<dyn HidConnection>> {
        let c_path = CString::new(path).map_err(|e| Error::OpenFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
        let device = api.open_path(&c_path).map_err(|e| Error::OpenFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(device))
    }
}

impl HidConnection for HidDevice {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        HidDevice::write(self, data).map_err(|e| Error::WriteFailed {
            reason: e.to_string(),
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        HidDevice::read(self, buf).map_err(|e| Error::ReadFailed {
            reason: e.to_string(),
        })
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.set_blocking_mode(!nonblocking)?;
        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        self.check_error().ok().map(|e| e.to_string())
    }
}
