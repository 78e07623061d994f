//! motelink: a Wii Remote connection manager.
//!
//! Finds Wii Remotes (and Remote Plus / Wii U Pro Controllers) on a HID transport,
//! keeps a registry of the connected ones, polls input reports without blocking, and
//! funnels output reports through a single rate-limited writer thread.
//!
//! Decoding and encoding the reports themselves is left to the layer above.
//!
//! ```no_run
//! # #[cfg(feature = "hid")]
//! # fn main() -> motelink::Result<()> {
//! use motelink::{ManagerConfig, WiimoteManager};
//!
//! let mut mgr = WiimoteManager::open_hidapi(ManagerConfig::default())?;
//! mgr.find_wiimotes()?;
//!
//! let mut buf = [0u8; 22];
//! for dev in mgr.devices() {
//!     let n = mgr.receive_raw(dev.handle(), &mut buf)?;
//!     if n > 0 {
//!         println!("{dev}: {:02x?}", &buf[..n]);
//!     }
//! }
//! mgr.shutdown()
//! # }
//! # #[cfg(not(feature = "hid"))]
//! # fn main() {}
//! ```

pub mod backends;
pub mod config;
pub mod device;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod handle;
mod lifecycle;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod raw_io;
pub mod registry;
pub mod report;

pub use backends::{Enumeration, HidConnection, HidTransport};
pub use config::ManagerConfig;
pub use device::{DeviceClass, DeviceDescriptor, ManagedDevice};
pub use discovery::Discovery;
pub use dispatcher::WriteDispatcher;
pub use error::{Error, Result};
pub use handle::DeviceHandle;
pub use manager::WiimoteManager;
pub use metadata::DeviceMeta;
pub use registry::DeviceRegistry;
