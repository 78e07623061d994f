//! Raw report I/O against a single device handle.
//!
//! These are stateless wrappers over [`HidConnection`](crate::backends::HidConnection).
//! A closed handle fails with [`Error::TransportUnavailable`] before the transport is
//! touched.

use crate::error::{Error, Result};
use crate::handle::DeviceHandle;

/// Write one output report. May block on the transport.
///
/// Only the writer thread calls this during normal operation; host code queues
/// reports through [`WriteDispatcher::enqueue`](crate::dispatcher::WriteDispatcher::enqueue).
pub fn write(handle: &DeviceHandle, data: &[u8]) -> Result<usize> {
    handle.with_connection(|conn| match conn.write(data) {
        Ok(n) => Ok(n),
        Err(Error::WriteFailed { reason }) => {
            let reason = match conn.last_error() {
                Some(detail) if detail != reason => format!("{reason} ({detail})"),
                _ => reason,
            };
            Err(Error::WriteFailed { reason })
        }
        Err(e) => Err(e),
    })
}

/// Poll for one input report. Never blocks.
///
/// The handle is switched to non-blocking mode before the read. `Ok(0)` means no
/// report is pending, which includes the case where the writer thread currently holds
/// the connection.
pub fn read(handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize> {
    let polled = handle.try_with_connection(|conn| {
        conn.set_nonblocking(true)?;
        conn.read(buf)
    })?;
    Ok(polled.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::VirtualTransport;
    use crate::backends::HidTransport;
    use crate::device::DeviceDescriptor;

    fn handle(bus: &VirtualTransport, path: &str) -> DeviceHandle {
        bus.attach(DeviceDescriptor::new(0x057e, 0x0306, path));
        DeviceHandle::new(path, bus.open_path(path).unwrap())
    }

    #[test]
    fn write_reports_byte_count() {
        let bus = VirtualTransport::new();
        let h = handle(&bus, "P1");
        assert_eq!(write(&h, &[0x11, 0x01]).unwrap(), 2);
        assert_eq!(bus.writes_to("P1"), vec![vec![0x11, 0x01]]);
    }

    #[test]
    fn write_failure_carries_transport_detail() {
        let bus = VirtualTransport::new();
        let h = handle(&bus, "P1");
        bus.fail_writes("P1");
        match write(&h, &[0x11, 0x01]) {
            Err(Error::WriteFailed { reason }) => assert!(reason.contains("rejected")),
            other => panic!("expected WriteFailed, got {other:?}"),
        }
    }

    #[test]
    fn read_switches_to_nonblocking_and_polls() {
        let bus = VirtualTransport::new();
        let h = handle(&bus, "P1");
        let mut buf = [0u8; 22];

        assert_eq!(read(&h, &mut buf).unwrap(), 0);

        bus.push_input("P1", &[0x30, 0x00, 0x08]);
        assert_eq!(read(&h, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[0x30, 0x00, 0x08]);
        assert_eq!(bus.blocking_reads(), 0);
    }

    #[test]
    fn closed_handle_is_rejected() {
        let bus = VirtualTransport::new();
        let h = handle(&bus, "P1");
        h.close();
        let mut buf = [0u8; 22];
        assert!(matches!(read(&h, &mut buf), Err(Error::TransportUnavailable)));
        assert!(matches!(write(&h, &[0x15, 0x00]), Err(Error::TransportUnavailable)));
    }
}
