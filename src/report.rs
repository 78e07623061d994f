//! Output reports sent by the manager itself.
//!
//! Everything else about the Wii Remote protocol (decoding input reports, LEDs,
//! extensions, IR) belongs to the per-device layer built on top of
//! [`WiimoteManager::send_raw`](crate::manager::WiimoteManager::send_raw). The manager
//! only needs enough to bring a freshly discovered remote into a known state.

/// Output report 0x12: select the data reporting mode.
pub const OUTPUT_DATA_REPORT_MODE: u8 = 0x12;
/// Output report 0x15: request a status report (0x20).
pub const OUTPUT_STATUS_REQUEST: u8 = 0x15;

/// Input report 0x30: core buttons only.
pub const MODE_BUTTONS: u8 = 0x30;

/// Bit 2 of the mode report's flags byte: report continuously instead of on change.
const FLAG_CONTINUOUS: u8 = 0x04;

/// `[0x12, flags, mode]`
pub fn data_report_mode(mode: u8, continuous: bool) -> [u8; 3] {
    let flags = if continuous { FLAG_CONTINUOUS } else { 0x00 };
    [OUTPUT_DATA_REPORT_MODE, flags, mode]
}

/// `[0x15, 0x00]`
pub fn status_request() -> [u8; 2] {
    [OUTPUT_STATUS_REQUEST, 0x00]
}
