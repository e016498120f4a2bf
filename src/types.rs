//! Handles, message identifiers and small value types shared by the raw input
//! pipeline and the platform layer.

use ::std::fmt;

/// `WM_INPUT_DEVICE_CHANGE`: a raw input device was attached or removed.
pub const WM_INPUT_DEVICE_CHANGE: u32 = 0x00FE;
/// `WM_INPUT`: a raw input record is ready for the target window.
pub const WM_INPUT: u32 = 0x00FF;
/// `WM_KEYDOWN`: lower bound of the key messages drained after a handled event.
pub const WM_KEYDOWN: u32 = 0x0100;
/// `WM_KEYUP`: upper bound of the key messages drained after a handled event.
pub const WM_KEYUP: u32 = 0x0101;

/// `WM_INPUT` wparam code: input arrived while the target was in the foreground.
pub const RIM_INPUT: usize = 0;
/// `WM_INPUT` wparam code: input arrived while the target was in the background.
pub const RIM_INPUTSINK: usize = 1;

/// `WM_INPUT_DEVICE_CHANGE` wparam code: a device was attached.
pub const GIDC_ARRIVAL: usize = 1;
/// `WM_INPUT_DEVICE_CHANGE` wparam code: a device was removed.
pub const GIDC_REMOVAL: usize = 2;

/// Opaque, platform-assigned identifier for a physical input device.
///
/// The reserved [`DeviceHandle::NULL`] value identifies keystrokes the system
/// does not attribute to any real device (certain multimedia keys).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceHandle(pub isize);

impl DeviceHandle {
    /// The handle reported for synthetic keystrokes.
    pub const NULL: Self = Self(0);

    /// Returns `true` for the reserved null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Handle of the window which receives raw input and device notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Handle to a pending raw input record (the `lparam` of `WM_INPUT`). Only
/// valid while the originating message is being processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawInputHandle(pub isize);

/// Handle returned by a device notification registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub isize);

/// Whether raw input is delivered only while the target window has focus, or
/// unconditionally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ::strum::Display)]
pub enum CaptureMode {
    /// Deliver input only while the target window is in the foreground.
    #[default]
    Foreground,
    /// Deliver input regardless of focus (`RIDEV_INPUTSINK`).
    Background,
}

/// A window procedure message: identifier plus its two parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowsProcessMessage {
    pub umsg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl WindowsProcessMessage {
    pub const fn new(umsg: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            umsg,
            wparam,
            lparam,
        }
    }

    /// The message identifier (`WM_*`).
    pub const fn identifier(&self) -> u32 {
        self.umsg
    }

    pub const fn wparam(&self) -> usize {
        self.wparam
    }

    pub const fn lparam(&self) -> isize {
        self.lparam
    }
}

#[cfg(windows)]
mod win32_conversions {
    use super::*;

    use ::windows::Win32::{
        Foundation::{HANDLE, HWND},
        UI::WindowsAndMessaging::MSG,
    };

    impl From<HWND> for WindowHandle {
        fn from(hwnd: HWND) -> Self {
            Self(hwnd.0)
        }
    }

    impl From<WindowHandle> for HWND {
        fn from(handle: WindowHandle) -> Self {
            HWND(handle.0)
        }
    }

    impl From<HANDLE> for DeviceHandle {
        fn from(handle: HANDLE) -> Self {
            Self(handle.0)
        }
    }

    impl From<DeviceHandle> for HANDLE {
        fn from(handle: DeviceHandle) -> Self {
            HANDLE(handle.0)
        }
    }

    impl From<&MSG> for WindowsProcessMessage {
        fn from(msg: &MSG) -> Self {
            Self::new(msg.message, msg.wParam.0, msg.lParam.0)
        }
    }
}
