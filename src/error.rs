//! Error types for motelink.
//!
//! Discovery and reads report failures synchronously through [`Result`]. Writes are
//! fire-and-forget: once a report is queued, a transport failure is logged by the
//! writer thread and never reaches the caller of
//! [`WiimoteManager::send_raw`](crate::manager::WiimoteManager::send_raw).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The device handle is closed (or was never opened); no transport call was made.
    #[error("transport unavailable: device handle is closed")]
    TransportUnavailable,

    /// The transport rejected an output report.
    #[error("write failed: {reason}")]
    WriteFailed { reason: String },

    /// The transport failed while polling for an input report.
    #[error("read failed: {reason}")]
    ReadFailed { reason: String },

    /// A device path from enumeration could not be opened.
    #[error("failed to open {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    /// The transport could not enumerate devices at all.
    #[error("failed to enumerate devices: {0}")]
    EnumerationFailed(String),

    /// Output reports must carry at least the report id byte.
    #[error("refusing to queue an empty report")]
    EmptyReport,

    /// The bounded write queue is at capacity.
    #[error("write queue is full ({capacity} pending reports)")]
    QueueFull { capacity: usize },

    /// The writer thread did not confirm exit in time and was detached.
    #[error("writer thread did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "hid")]
    #[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
    #[error("hidapi error: {0}")]
    Hid(#[from] hidapi::HidError),
}

pub type Result<T> = std::result::Result<T, Error>;
