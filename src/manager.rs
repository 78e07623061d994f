//! The connection manager.
//!
//! [`WiimoteManager`] owns the transport, the device registry, and the write
//! dispatcher. Host code typically:
//!
//! 1. builds one manager at startup,
//! 2. calls [`find_wiimotes`](WiimoteManager::find_wiimotes) when the user asks to
//!    connect,
//! 3. polls each device with [`receive_raw`](WiimoteManager::receive_raw) once per
//!    frame and queues output with [`send_raw`](WiimoteManager::send_raw),
//! 4. calls [`shutdown`](WiimoteManager::shutdown) on exit (or drops the manager).
//!
//! Discovery and cleanup take `&mut self`; wrap the manager in a `Mutex` to drive it
//! from several threads. Producers that only write can hold a cloned
//! [`WriteDispatcher`] from [`writer`](WiimoteManager::writer) instead.

use crate::backends::HidTransport;
use crate::config::ManagerConfig;
use crate::device::ManagedDevice;
use crate::dispatcher::WriteDispatcher;
use crate::error::Result;
use crate::handle::DeviceHandle;
use crate::raw_io;
use crate::registry::DeviceRegistry;
use std::sync::Arc;
use std::time::Duration;

pub struct WiimoteManager {
    pub(crate) transport: Arc<dyn HidTransport>,
    pub(crate) registry: DeviceRegistry,
    pub(crate) dispatcher: WriteDispatcher,
    pub(crate) config: ManagerConfig,
}

impl WiimoteManager {
    pub fn new(transport: impl HidTransport + 'static) -> Self {
        Self::with_config(transport, ManagerConfig::default())
    }

    pub fn with_config(transport: impl HidTransport + 'static, config: ManagerConfig) -> Self {
        Self::from_shared(Arc::new(transport), config)
    }

    pub fn from_shared(transport: Arc<dyn HidTransport>, config: ManagerConfig) -> Self {
        let dispatcher = WriteDispatcher::new(&config);
        Self {
            transport,
            registry: DeviceRegistry::new(),
            dispatcher,
            config,
        }
    }

    /// Manager over the system HID stack.
    #[cfg(feature = "hid")]
    #[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
    pub fn open_hidapi(config: ManagerConfig) -> Result<Self> {
        let transport = crate::backends::hid::HidApiTransport::new()?;
        Ok(Self::with_config(transport, config))
    }

    /// Connected controllers, in discovery order.
    pub fn devices(&self) -> &[ManagedDevice] {
        self.registry.list()
    }

    pub fn device(&self, path: &str) -> Option<&ManagedDevice> {
        self.registry.lookup(path)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// `true` if a controller is connected. See [`DeviceRegistry::has_any`] for the
    /// exact rule.
    pub fn has_wiimote(&self) -> bool {
        self.registry.has_any()
    }

    /// Queue an output report. Returns once the report is queued; transport errors
    /// are logged by the writer thread and never surface here.
    pub fn send_raw(&self, handle: &DeviceHandle, data: &[u8]) -> Result<()> {
        self.dispatcher.enqueue(handle, data)
    }

    /// Poll one input report into `buf`. Never blocks; `Ok(0)` means nothing pending.
    pub fn receive_raw(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize> {
        raw_io::read(handle, buf)
    }

    /// A handle on the write queue that can be moved to another thread.
    pub fn writer(&self) -> WriteDispatcher {
        self.dispatcher.clone()
    }

    pub fn pending_writes(&self) -> usize {
        self.dispatcher.pending()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn debug_messages(&self) -> bool {
        self.dispatcher.debug_messages()
    }

    pub fn set_debug_messages(&mut self, enabled: bool) {
        self.config.debug_messages = enabled;
        self.dispatcher.set_debug_messages(enabled);
    }

    /// Takes effect from the writer's next tick. Intervals under 1 ms are raised to 1 ms.
    pub fn set_min_write_interval(&mut self, interval: Duration) {
        self.dispatcher.set_min_write_interval(interval);
        let applied = self.dispatcher.min_write_interval().as_millis();
        self.config.min_write_interval_ms = u64::try_from(applied).unwrap_or(u64::MAX);
    }
}

impl Drop for WiimoteManager {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("shutdown on drop: {e}");
        }
    }
}

impl std::fmt::Debug for WiimoteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiimoteManager")
            .field("devices", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}
