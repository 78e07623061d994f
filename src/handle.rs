//! Typed device handles.
//!
//! A [`DeviceHandle`] wraps one open [`HidConnection`]. Validity is decided in one
//! place: the slot either holds a connection or it has been closed, and a closed slot
//! never hands its connection out again.
//!
//! Closing never waits on an in-flight transport call. If the connection is busy (the
//! writer thread is mid-write), the slot is marked closed and whoever holds the
//! connection closes it on the way out.

use crate::backends::HidConnection;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

struct HandleSlot {
    path: String,
    closed: AtomicBool,
    conn: Mutex<Option<Box<dyn HidConnection>>>,
}

impl HandleSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn HidConnection>>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the connection held by `guard`, then honor a close that raced it.
    fn run<T>(
        &self,
        mut guard: MutexGuard<'_, Option<Box<dyn HidConnection>>>,
        f: impl FnOnce(&mut dyn HidConnection) -> Result<T>,
    ) -> Result<T> {
        let out = match guard.as_mut() {
            Some(conn) if !self.closed.load(Ordering::SeqCst) => f(&mut **conn),
            _ => Err(Error::TransportUnavailable),
        };
        drop(guard);
        self.release_if_closed();
        out
    }

    /// Take and close the connection if the slot is marked closed and nobody holds it.
    ///
    /// Both the closer and every lock holder (after unlocking) call this, so the last
    /// one out performs the close.
    fn release_if_closed(&self) -> bool {
        if !self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match self.conn.try_lock() {
            Ok(mut guard) => release(&mut guard),
            Err(TryLockError::Poisoned(p)) => release(&mut p.into_inner()),
            Err(TryLockError::WouldBlock) => return false,
        }
        true
    }
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        let conn = self.conn.get_mut().unwrap_or_else(PoisonError::into_inner);
        release(conn);
    }
}

fn release(conn: &mut Option<Box<dyn HidConnection>>) {
    if let Some(conn) = conn.take() {
        conn.close();
    }
}

/// Owning handle to an open device connection.
///
/// Cloning shares the same connection; [`close`](DeviceHandle::close) through any clone
/// closes it for all of them.
#[derive(Clone)]
pub struct DeviceHandle {
    slot: Arc<HandleSlot>,
}

impl DeviceHandle {
    pub fn new(path: impl Into<String>, conn: Box<dyn HidConnection>) -> Self {
        Self {
            slot: Arc::new(HandleSlot {
                path: path.into(),
                closed: AtomicBool::new(false),
                conn: Mutex::new(Some(conn)),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.slot.path
    }

    pub fn is_open(&self) -> bool {
        !self.slot.closed.load(Ordering::SeqCst)
    }

    /// Close the connection. Idempotent.
    ///
    /// Returns immediately even when another thread is using the connection; that
    /// thread closes it once its call returns.
    pub fn close(&self) {
        if self.slot.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.slot.release_if_closed() {
            tracing::debug!(path = %self.slot.path, "handle busy; close deferred to in-flight call");
        }
    }

    /// Run `f` with exclusive access to the connection, waiting for any other user.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut dyn HidConnection) -> Result<T>,
    ) -> Result<T> {
        if !self.is_open() {
            return Err(Error::TransportUnavailable);
        }
        self.slot.run(self.slot.lock(), f)
    }

    /// Like [`with_connection`](Self::with_connection) but never waits: `Ok(None)` if
    /// the connection is busy.
    pub(crate) fn try_with_connection<T>(
        &self,
        f: impl FnOnce(&mut dyn HidConnection) -> Result<T>,
    ) -> Result<Option<T>> {
        if !self.is_open() {
            return Err(Error::TransportUnavailable);
        }
        let guard = match self.slot.conn.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Ok(None),
        };
        self.slot.run(guard, f).map(Some)
    }

    /// Non-owning reference used by the write queue.
    pub(crate) fn downgrade(&self) -> WeakHandle {
        WeakHandle {
            slot: Arc::downgrade(&self.slot),
        }
    }

    pub fn same_device(&self, other: &DeviceHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.slot.path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Queue-side reference: does not keep the device alive.
#[derive(Clone)]
pub(crate) struct WeakHandle {
    slot: Weak<HandleSlot>,
}

impl WeakHandle {
    /// The live handle, or `None` once the device is gone or closed.
    pub(crate) fn upgrade(&self) -> Option<DeviceHandle> {
        let slot = self.slot.upgrade()?;
        let handle = DeviceHandle { slot };
        handle.is_open().then_some(handle)
    }
}
