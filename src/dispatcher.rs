//! Rate-limited background writer.
//!
//! Wii Remotes drop output reports that arrive too close together, so every write goes
//! through one queue drained by one thread:
//!
//! - [`WriteDispatcher::enqueue`] snapshots the payload, appends it, and returns. It
//!   never waits on the transport.
//! - The writer thread starts on the first enqueue. Each tick it pops the oldest
//!   report, writes it unless the target device has been closed, and then waits out
//!   the minimum interval whether or not anything was written.
//! - Write failures are logged and dropped. They never reach the producer.
//! - A writer detached by a timed-out [`stop`](WriteDispatcher::stop) still owns the
//!   transport until its write returns. A writer started after it waits for it to exit
//!   first, so two threads never write at once.
//!
//! Reports are written in exactly the order they were queued.

use crate::config::{ManagerConfig, MIN_WRITE_INTERVAL_FLOOR_MS};
use crate::error::{Error, Result};
use crate::handle::{DeviceHandle, WeakHandle};
use crate::raw_io;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

const WRITER_THREAD_NAME: &str = "wiimote-writer";

/// A queued output report.
///
/// Holds only a weak reference to its device; the queue does not keep a closed device
/// alive.
pub struct PendingWrite {
    target: WeakHandle,
    path: String,
    payload: Box<[u8]>,
}

impl PendingWrite {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

struct Shared {
    queue: Mutex<VecDeque<PendingWrite>>,
    capacity: Option<usize>,
    interval_ms: AtomicU64,
    debug_messages: AtomicBool,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<PendingWrite>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    fn deliver(&self, write: PendingWrite) {
        let Some(handle) = write.target.upgrade() else {
            trace!(path = %write.path, "device closed; dropping queued report");
            return;
        };

        match raw_io::write(&handle, &write.payload) {
            Ok(n) => {
                if self.debug_messages.load(Ordering::Relaxed) {
                    debug!(path = %write.path, "Sent {}b: {}", n, format_report(&write.payload));
                }
            }
            Err(Error::TransportUnavailable) => {
                trace!(path = %write.path, "device closed; dropping queued report");
            }
            Err(e) => {
                error!(path = %write.path, "HID write failed: {e}");
            }
        }
    }
}

/// `[12] 00-30` style rendering: report id in brackets, payload dash-separated.
fn format_report(data: &[u8]) -> String {
    match data.split_first() {
        Some((id, rest)) => {
            let body: Vec<String> = rest.iter().map(|b| format!("{b:02X}")).collect();
            format!("[{id:02X}] {}", body.join("-"))
        }
        None => String::from("[]"),
    }
}

/// Set once when a writer thread exits, panics included.
#[derive(Default)]
struct ExitLatch {
    exited: Mutex<bool>,
    cv: Condvar,
}

impl ExitLatch {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.exited.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self) {
        *self.lock() = true;
        self.cv.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.lock()
    }

    fn wait(&self) {
        let mut exited = self.lock();
        while !*exited {
            exited = self.cv.wait(exited).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// `true` if the latch was set within `timeout`.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let exited = self.lock();
        let (exited, _) = self
            .cv
            .wait_timeout_while(exited, timeout, |exited| !*exited)
            .unwrap_or_else(PoisonError::into_inner);
        *exited
    }
}

struct ExitGuard(Arc<ExitLatch>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.set();
    }
}

struct Worker {
    stop_tx: Sender<()>,
    exited: Arc<ExitLatch>,
    thread: JoinHandle<()>,
}

#[derive(Default)]
struct WorkerSlot {
    active: Option<Worker>,
    /// Exit latch of the last writer detached by a timed-out stop.
    detached: Option<Arc<ExitLatch>>,
}

#[cfg(test)]
thread_local! {
    static FAIL_SPAWN: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

fn spawn_writer(f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    #[cfg(test)]
    if FAIL_SPAWN.with(std::cell::Cell::get) {
        return Err(io::Error::other("thread spawn refused"));
    }
    std::thread::Builder::new()
        .name(WRITER_THREAD_NAME.into())
        .spawn(f)
}

fn run(shared: Arc<Shared>, stop_rx: Receiver<()>, predecessor: Option<Arc<ExitLatch>>) {
    if let Some(prev) = predecessor {
        debug!("waiting for the detached writer thread to exit");
        prev.wait();
        // Its last report may have only just gone out.
        match stop_rx.recv_timeout(shared.interval()) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }

    debug!("writer thread started");
    loop {
        match stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        let next = shared.queue().pop_front();
        if let Some(write) = next {
            shared.deliver(write);
        }

        match stop_rx.recv_timeout(shared.interval()) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("writer thread stopped");
}

/// Shared write queue plus its single writer thread.
///
/// Cheap to clone. Every clone feeds the same queue, so producers on other threads can
/// hold their own copy.
#[derive(Clone)]
pub struct WriteDispatcher {
    shared: Arc<Shared>,
    worker: Arc<Mutex<WorkerSlot>>,
}

impl WriteDispatcher {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                capacity: config.queue_capacity(),
                interval_ms: AtomicU64::new(
                    config.min_write_interval_ms.max(MIN_WRITE_INTERVAL_FLOOR_MS),
                ),
                debug_messages: AtomicBool::new(config.debug_messages),
            }),
            worker: Arc::new(Mutex::new(WorkerSlot::default())),
        }
    }

    fn worker(&self) -> MutexGuard<'_, WorkerSlot> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `data` for `handle` and make sure the writer thread is running.
    pub fn enqueue(&self, handle: &DeviceHandle, data: &[u8]) -> Result<()> {
        if !handle.is_open() {
            return Err(Error::TransportUnavailable);
        }
        if data.is_empty() {
            return Err(Error::EmptyReport);
        }

        // The queue stays locked until the worker is confirmed, so a failed spawn can
        // take back exactly the report it just pushed.
        let mut queue = self.shared.queue();
        if let Some(capacity) = self.shared.capacity {
            if queue.len() >= capacity {
                return Err(Error::QueueFull { capacity });
            }
        }
        queue.push_back(PendingWrite {
            target: handle.downgrade(),
            path: handle.path().to_string(),
            payload: data.into(),
        });

        if let Err(e) = self.ensure_worker() {
            queue.pop_back();
            return Err(e);
        }
        Ok(())
    }

    fn ensure_worker(&self) -> Result<()> {
        let mut slot = self.worker();
        if slot.active.as_ref().is_some_and(|w| !w.thread.is_finished()) {
            return Ok(());
        }

        let predecessor = slot.detached.clone().filter(|latch| !latch.is_set());
        let (stop_tx, stop_rx) = mpsc::channel();
        let exited = Arc::new(ExitLatch::default());
        let guard = ExitGuard(Arc::clone(&exited));
        let shared = Arc::clone(&self.shared);
        let thread = spawn_writer(move || {
            let _guard = guard;
            run(shared, stop_rx, predecessor);
        })?;

        // The new writer only exits after its predecessor, so its latch covers both.
        slot.detached = None;
        slot.active = Some(Worker {
            stop_tx,
            exited,
            thread,
        });
        Ok(())
    }

    /// Signal the writer thread and wait up to `timeout` for it to exit.
    ///
    /// Queued reports are left in place. A thread stuck inside a transport write is
    /// detached and reported as [`Error::ShutdownTimeout`]; it exits on its own once
    /// the write returns. No-op when no thread was started.
    pub fn stop(&self, timeout: Duration) -> Result<()> {
        let worker = {
            let mut slot = self.worker();
            let Some(worker) = slot.active.take() else {
                return Ok(());
            };
            slot.detached = Some(Arc::clone(&worker.exited));
            worker
        };

        let _ = worker.stop_tx.send(());
        if !worker.exited.wait_timeout(timeout) {
            warn!("writer thread still busy after {timeout:?}; detaching it");
            return Err(Error::ShutdownTimeout(timeout));
        }
        if worker.thread.join().is_err() {
            error!("writer thread panicked");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker()
            .active
            .as_ref()
            .is_some_and(|w| !w.thread.is_finished())
    }

    /// Number of reports waiting to be written.
    pub fn pending(&self) -> usize {
        self.shared.queue().len()
    }

    /// Drop every queued report; returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut queue = self.shared.queue();
        let n = queue.len();
        queue.clear();
        n
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    pub fn min_write_interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Takes effect from the writer's next tick. Intervals under 1 ms are raised to 1 ms.
    pub fn set_min_write_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(MIN_WRITE_INTERVAL_FLOOR_MS);
        self.shared.interval_ms.store(ms, Ordering::Relaxed);
    }

    pub fn debug_messages(&self) -> bool {
        self.shared.debug_messages.load(Ordering::Relaxed)
    }

    pub fn set_debug_messages(&self, enabled: bool) {
        self.shared.debug_messages.store(enabled, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for WriteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteDispatcher")
            .field("pending", &self.pending())
            .field("capacity", &self.shared.capacity)
            .field("interval", &self.shared.interval())
            .field("running", &self.is_running())
            .finish()
    }
}
