//! [`RawInputSource`] on top of the Win32 raw input API.

use ::std::{ffi::c_void, mem::size_of};
use ::tap::prelude::*;
use ::tracing::{debug, trace};
use ::widestring::U16CString;
use ::windows::{
    core::GUID,
    Win32::{
        Foundation::{HANDLE, HWND},
        System::Power::DEVICE_NOTIFY_WINDOW_HANDLE,
        UI::{
            Input::{
                GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList,
                RegisterRawInputDevices, HRAWINPUT, RAWINPUTDEVICE, RAWINPUTDEVICELIST,
                RAWINPUTDEVICE_FLAGS, RAWINPUTHEADER, RIDEV_DEVNOTIFY, RIDEV_INPUTSINK,
                RIDEV_REMOVE, RIDI_DEVICEINFO, RIDI_DEVICENAME, RID_DEVICE_INFO, RID_INPUT,
                RIM_TYPEHID, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
            },
            WindowsAndMessaging::{
                PeekMessageW, RegisterDeviceNotificationW, UnregisterDeviceNotification,
                DBT_DEVTYP_DEVICEINTERFACE, DEV_BROADCAST_DEVICEINTERFACE_W, MSG, PM_REMOVE,
            },
        },
    },
};

use super::{
    registry, DeviceInfo, DeviceListEntry, HidInfo, KeyboardInfo, MouseInfo, RawDeviceType,
    RawInputSource,
};
use crate::{
    errors::{Context, Error, ErrorKind, Result},
    types::{
        CaptureMode, DeviceHandle, NotificationHandle, RawInputHandle, WindowHandle, WM_KEYDOWN,
        WM_KEYUP,
    },
};

/// `HID_USAGE_PAGE_GENERIC`.
const USAGE_PAGE_GENERIC: u16 = 0x01;
/// `HID_USAGE_GENERIC_KEYBOARD`.
const USAGE_GENERIC_KEYBOARD: u16 = 0x06;

/// `GUID_DEVINTERFACE_HID`.
const GUID_DEVINTERFACE_HID: GUID = GUID::from_u128(0x4d1e55b2_f16f_11cf_88cb_001111000030);

/// Returned by the raw input query functions on failure.
const QUERY_FAILED: u32 = u32::MAX;

/// The Win32 raw input facility of the calling thread.
///
/// Registration is process-wide for the keyboard usage, so only one
/// [`RawKeyboard`] per process should be registered at a time.
///
/// [`RawKeyboard`]: crate::input::keyboard::RawKeyboard
#[derive(Debug, Default)]
pub struct Win32RawInput {
    _private: (),
}

impl Win32RawInput {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps the `(UINT)-1` failure value of the raw input queries onto the
/// thread's last error.
fn check(result: u32, function: &'static str) -> Result<u32> {
    (result != QUERY_FAILED).then_some(result).function(function)
}

fn keyboard_device(flags: RAWINPUTDEVICE_FLAGS, target: HWND) -> RAWINPUTDEVICE {
    RAWINPUTDEVICE {
        usUsagePage: USAGE_PAGE_GENERIC,
        usUsage: USAGE_GENERIC_KEYBOARD,
        dwFlags: flags,
        hwndTarget: target,
    }
}

impl RawInputSource for Win32RawInput {
    fn register_raw_input(&self, target: WindowHandle, mode: CaptureMode) -> Result<()> {
        let flags = match mode {
            CaptureMode::Foreground => RIDEV_DEVNOTIFY,
            CaptureMode::Background => RIDEV_DEVNOTIFY | RIDEV_INPUTSINK,
        };
        let devices = [keyboard_device(flags, target.into())];
        unsafe { RegisterRawInputDevices(&devices, size_of::<RAWINPUTDEVICE>() as u32) }
            .ok()
            .function("RegisterRawInputDevices")
    }

    fn unregister_raw_input(&self) -> Result<()> {
        let devices = [keyboard_device(RIDEV_REMOVE, HWND(0))];
        unsafe { RegisterRawInputDevices(&devices, size_of::<RAWINPUTDEVICE>() as u32) }
            .ok()
            .function("RegisterRawInputDevices")
    }

    fn register_device_notifications(&self, target: WindowHandle) -> Result<NotificationHandle> {
        let filter = DEV_BROADCAST_DEVICEINTERFACE_W {
            dbcc_size: size_of::<DEV_BROADCAST_DEVICEINTERFACE_W>() as u32,
            dbcc_devicetype: DBT_DEVTYP_DEVICEINTERFACE.0,
            dbcc_classguid: GUID_DEVINTERFACE_HID,
            ..Default::default()
        };
        let handle = unsafe {
            RegisterDeviceNotificationW(
                HANDLE(target.0),
                &filter as *const _ as *const c_void,
                DEVICE_NOTIFY_WINDOW_HANDLE,
            )
        }
        .pipe(|handle| (!handle.is_null()).then_some(handle))
        .function("RegisterDeviceNotificationW")?;

        debug!(?handle, "Registered for HID device interface notifications");
        Ok(NotificationHandle(handle as isize))
    }

    fn unregister_device_notifications(&self, handle: NotificationHandle) -> Result<()> {
        unsafe { UnregisterDeviceNotification(handle.0 as *const c_void) }
            .ok()
            .function("UnregisterDeviceNotification")
    }

    fn device_list(&self) -> Result<Vec<DeviceListEntry>> {
        let entry_size = size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count = 0_u32;
        unsafe { GetRawInputDeviceList(None, &mut count, entry_size) }
            .pipe(|result| check(result, "GetRawInputDeviceList"))?;

        let mut list = vec![RAWINPUTDEVICELIST::default(); count as usize];
        let written = unsafe { GetRawInputDeviceList(Some(list.as_mut_ptr()), &mut count, entry_size) }
            .pipe(|result| check(result, "GetRawInputDeviceList"))?;
        list.truncate(written as usize);

        list.into_iter()
            .map(|entry| DeviceListEntry {
                handle: entry.hDevice.into(),
                device_type: RawDeviceType::from_raw(entry.dwType.0),
            })
            .collect::<Vec<_>>()
            .pipe(Ok)
    }

    fn device_name(&self, device: DeviceHandle) -> Result<String> {
        let mut len = 0_u32;
        unsafe { GetRawInputDeviceInfoW(HANDLE::from(device), RIDI_DEVICENAME, None, &mut len) }
            .pipe(|result| check(result, "GetRawInputDeviceInfoW"))
            .kind(ErrorKind::DeviceQuery)?;
        if len == 0 {
            return Ok(String::new());
        }

        let mut buf = vec![0_u16; len as usize];
        unsafe {
            GetRawInputDeviceInfoW(
                HANDLE::from(device),
                RIDI_DEVICENAME,
                Some(buf.as_mut_ptr().cast()),
                &mut len,
            )
        }
        .pipe(|result| check(result, "GetRawInputDeviceInfoW"))
        .kind(ErrorKind::DeviceQuery)?;

        Ok(U16CString::from_vec_truncate(buf).to_string_lossy())
    }

    fn device_info(&self, device: DeviceHandle) -> Result<DeviceInfo> {
        let mut info = RID_DEVICE_INFO {
            cbSize: size_of::<RID_DEVICE_INFO>() as u32,
            ..Default::default()
        };
        let mut size = info.cbSize;
        unsafe {
            GetRawInputDeviceInfoW(
                HANDLE::from(device),
                RIDI_DEVICEINFO,
                Some(&mut info as *mut _ as *mut c_void),
                &mut size,
            )
        }
        .pipe(|result| check(result, "GetRawInputDeviceInfoW"))
        .kind(ErrorKind::DeviceQuery)?;

        // The union member is selected by `dwType`.
        let info = unsafe {
            match info.dwType {
                RIM_TYPEMOUSE => {
                    let mouse = info.Anonymous.mouse;
                    DeviceInfo::Mouse(MouseInfo {
                        id: mouse.dwId,
                        number_of_buttons: mouse.dwNumberOfButtons,
                        sample_rate: mouse.dwSampleRate,
                    })
                }
                RIM_TYPEKEYBOARD => {
                    let keyboard = info.Anonymous.keyboard;
                    DeviceInfo::Keyboard(KeyboardInfo {
                        keyboard_type: keyboard.dwType,
                        keyboard_sub_type: keyboard.dwSubType,
                        keyboard_mode: keyboard.dwKeyboardMode,
                        number_of_function_keys: keyboard.dwNumberOfFunctionKeys,
                        number_of_indicators: keyboard.dwNumberOfIndicators,
                        number_of_keys_total: keyboard.dwNumberOfKeysTotal,
                    })
                }
                RIM_TYPEHID => {
                    let hid = info.Anonymous.hid;
                    DeviceInfo::Hid(HidInfo {
                        vendor_id: hid.dwVendorId,
                        product_id: hid.dwProductId,
                        version_number: hid.dwVersionNumber,
                        usage_page: hid.usUsagePage,
                        usage: hid.usUsage,
                    })
                }
                other => {
                    return Err(Error::new(
                        ErrorKind::DeviceQuery,
                        0,
                        format!("Unknown raw input device type {}", other.0),
                    ))
                    .function("GetRawInputDeviceInfoW")
                }
            }
        };
        Ok(info)
    }

    fn describe_device(&self, device_name: &str) -> Option<String> {
        registry::device_description(device_name)
    }

    fn raw_input_size(&self, record: RawInputHandle) -> Result<u32> {
        let mut size = 0_u32;
        unsafe {
            GetRawInputData(
                HRAWINPUT(record.0),
                RID_INPUT,
                None,
                &mut size,
                size_of::<RAWINPUTHEADER>() as u32,
            )
        }
        .pipe(|result| check(result, "GetRawInputData"))
        .kind(ErrorKind::Decode)?;
        Ok(size)
    }

    fn raw_input_data(&self, record: RawInputHandle, buf: &mut [u8]) -> Result<u32> {
        let mut size = buf.len() as u32;
        unsafe {
            GetRawInputData(
                HRAWINPUT(record.0),
                RID_INPUT,
                Some(buf.as_mut_ptr().cast()),
                &mut size,
                size_of::<RAWINPUTHEADER>() as u32,
            )
        }
        .pipe(|result| check(result, "GetRawInputData"))
        .kind(ErrorKind::Decode)
    }

    fn drain_key_messages(&self) {
        let mut msg = MSG::default();
        let removed = unsafe { PeekMessageW(&mut msg, HWND(0), WM_KEYDOWN, WM_KEYUP, PM_REMOVE) };
        trace!(removed = removed.as_bool(), "Drained handled key message");
    }
}
