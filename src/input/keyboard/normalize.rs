//! Resolution of ambiguous virtual keys.

use super::codes::{scan, vk};
use crate::types::DeviceHandle;

/// Resolves a reported virtual key into its side-specific or device-specific
/// variant.
///
/// - Control reported from the null device is the multimedia Zoom key.
/// - Control and Alt are split on the E0 (extended) flag, which marks the
///   right-hand keys.
/// - Shift carries no reliable E0 bit and is split on the right Shift scan
///   code instead.
/// - Keystrokes from the null device are otherwise left unchanged, as are all
///   other virtual keys.
///
/// ```
/// use ::rawkeys::{input::keyboard::{normalize, vk}, types::DeviceHandle};
///
/// let keyboard = DeviceHandle(0x10041);
/// assert_eq!(normalize(keyboard, vk::CONTROL, true, 0x1D), vk::RCONTROL);
/// assert_eq!(normalize(keyboard, vk::SHIFT, false, 0x2A), vk::LSHIFT);
/// assert_eq!(normalize(DeviceHandle::NULL, vk::CONTROL, false, 0), vk::ZOOM);
/// ```
pub fn normalize(device: DeviceHandle, virtual_key: u16, is_e0: bool, scan_code: u16) -> u16 {
    if device.is_null() {
        return match virtual_key {
            vk::CONTROL => vk::ZOOM,
            _ => virtual_key,
        };
    }

    match virtual_key {
        vk::CONTROL if is_e0 => vk::RCONTROL,
        vk::CONTROL => vk::LCONTROL,
        vk::MENU if is_e0 => vk::RMENU,
        vk::MENU => vk::LMENU,
        vk::SHIFT if scan_code == scan::RIGHT_SHIFT => vk::RSHIFT,
        vk::SHIFT => vk::LSHIFT,
        _ => virtual_key,
    }
}
