//! The operating system seam of the raw input pipeline.
//!
//! [`RawInputSource`] covers every system call the pipeline makes: input
//! registration, device enumeration and metadata, fetching raw input records
//! and removing queued key messages. `win32::Win32RawInput` implements it on
//! top of the Win32 API.

use ::std::fmt;

use crate::{
    errors::Result,
    input::keyboard::PacketLayout,
    types::{CaptureMode, DeviceHandle, NotificationHandle, RawInputHandle, WindowHandle},
};

#[cfg(test)]
pub(crate) mod fake;
pub mod registry;
#[cfg(windows)]
pub mod win32;

/// The `dwType` of a raw input device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawDeviceType {
    Mouse,
    Keyboard,
    /// A generic HID device, which includes some keyboards.
    Hid,
    Unknown(u32),
}

impl RawDeviceType {
    pub const fn from_raw(device_type: u32) -> Self {
        match device_type {
            0 => Self::Mouse,
            1 => Self::Keyboard,
            2 => Self::Hid,
            other => Self::Unknown(other),
        }
    }
}

/// One entry of the system raw input device list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceListEntry {
    pub handle: DeviceHandle,
    pub device_type: RawDeviceType,
}

/// Raw `RID_DEVICE_INFO` metadata, used for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceInfo {
    Mouse(MouseInfo),
    Keyboard(KeyboardInfo),
    Hid(HidInfo),
}

/// `RID_DEVICE_INFO_MOUSE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseInfo {
    pub id: u32,
    pub number_of_buttons: u32,
    pub sample_rate: u32,
}

/// `RID_DEVICE_INFO_KEYBOARD`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardInfo {
    pub keyboard_type: u32,
    pub keyboard_sub_type: u32,
    pub keyboard_mode: u32,
    pub number_of_function_keys: u32,
    pub number_of_indicators: u32,
    pub number_of_keys_total: u32,
}

/// `RID_DEVICE_INFO_HID`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HidInfo {
    pub vendor_id: u32,
    pub product_id: u32,
    pub version_number: u32,
    pub usage_page: u16,
    pub usage: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mouse(info) => {
                writeln!(f, "Mouse")?;
                writeln!(f, " Id: {}", info.id)?;
                writeln!(f, " Buttons: {}", info.number_of_buttons)?;
                writeln!(f, " Sample rate: {}", info.sample_rate)
            }
            Self::Keyboard(info) => {
                writeln!(f, "Keyboard")?;
                writeln!(f, " Type: {}", info.keyboard_type)?;
                writeln!(f, " Sub-type: {}", info.keyboard_sub_type)?;
                writeln!(f, " Mode: {}", info.keyboard_mode)?;
                writeln!(f, " Function keys: {}", info.number_of_function_keys)?;
                writeln!(f, " Indicators: {}", info.number_of_indicators)?;
                writeln!(f, " Keys total: {}", info.number_of_keys_total)
            }
            Self::Hid(info) => {
                writeln!(f, "HID")?;
                writeln!(f, " Vendor id: {:04X}", info.vendor_id)?;
                writeln!(f, " Product id: {:04X}", info.product_id)?;
                writeln!(f, " Version: {}", info.version_number)?;
                writeln!(f, " Usage page: {:#04X}", info.usage_page)?;
                writeln!(f, " Usage: {:#04X}", info.usage)
            }
        }
    }
}

/// Access to the operating system's raw input facility.
///
/// All methods take `&self`; implementations are expected to be thin wrappers
/// around individual system calls. Errors carry the failing function name.
pub trait RawInputSource {
    /// Byte layout of the records returned by [`raw_input_data`].
    ///
    /// [`raw_input_data`]: Self::raw_input_data
    fn layout(&self) -> PacketLayout {
        PacketLayout::native()
    }

    /// Registers `target` as the consumer of keyboard-class raw input,
    /// including `WM_INPUT_DEVICE_CHANGE` notifications.
    fn register_raw_input(&self, target: WindowHandle, mode: CaptureMode) -> Result<()>;

    /// Stops delivery of keyboard-class raw input.
    fn unregister_raw_input(&self) -> Result<()>;

    /// Registers `target` for HID device interface arrival and removal
    /// notifications.
    fn register_device_notifications(&self, target: WindowHandle) -> Result<NotificationHandle>;

    fn unregister_device_notifications(&self, handle: NotificationHandle) -> Result<()>;

    /// The full list of raw input devices, of every class.
    fn device_list(&self) -> Result<Vec<DeviceListEntry>>;

    /// The device interface path. Empty if the system reports a zero-length
    /// name.
    fn device_name(&self, device: DeviceHandle) -> Result<String>;

    fn device_info(&self, device: DeviceHandle) -> Result<DeviceInfo>;

    /// A human-readable description for a device path, if one is known.
    fn describe_device(&self, _device_name: &str) -> Option<String> {
        None
    }

    /// The size in bytes of the pending record behind `record`.
    fn raw_input_size(&self, record: RawInputHandle) -> Result<u32>;

    /// Copies the pending record into `buf`, returning the number of bytes
    /// written.
    fn raw_input_data(&self, record: RawInputHandle, buf: &mut [u8]) -> Result<u32>;

    /// Removes the next queued `WM_KEYDOWN`..=`WM_KEYUP` message of the
    /// calling thread.
    fn drain_key_messages(&self);
}
