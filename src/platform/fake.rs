//! An in-memory [`RawInputSource`] which simulates the system device list,
//! pending raw input records and registrations.

use ::parking_lot::Mutex;
use ::std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{DeviceInfo, DeviceListEntry, HidInfo, KeyboardInfo, RawDeviceType, RawInputSource};
use crate::{
    errors::{Context, Error, ErrorKind, Result},
    input::keyboard::{PacketLayout, RIM_TYPEKEYBOARD},
    types::{CaptureMode, DeviceHandle, NotificationHandle, RawInputHandle, WindowHandle},
};

const ERROR_INVALID_HANDLE: i32 = 6;
const ERROR_INVALID_PARAMETER: i32 = 87;

/// The fields of a keyboard record written by [`keyboard_record`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct KeyRecord {
    pub device: DeviceHandle,
    pub virtual_key: u16,
    pub scan_code: u16,
    pub flags: u16,
    pub message: u32,
}

/// Encodes a `RAWINPUT` keyboard record the way the system lays it out.
pub(crate) fn keyboard_record(layout: PacketLayout, record: KeyRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(layout.packet_len());
    buf.extend_from_slice(&RIM_TYPEKEYBOARD.to_le_bytes());
    buf.extend_from_slice(&(layout.packet_len() as u32).to_le_bytes());
    match layout.pointer_width() {
        4 => {
            buf.extend_from_slice(&(record.device.0 as u32).to_le_bytes());
            buf.extend_from_slice(&0_u32.to_le_bytes());
        }
        _ => {
            buf.extend_from_slice(&(record.device.0 as i64).to_le_bytes());
            buf.extend_from_slice(&0_u64.to_le_bytes());
        }
    }
    buf.extend_from_slice(&record.scan_code.to_le_bytes());
    buf.extend_from_slice(&record.flags.to_le_bytes());
    buf.extend_from_slice(&0_u16.to_le_bytes());
    buf.extend_from_slice(&record.virtual_key.to_le_bytes());
    buf.extend_from_slice(&record.message.to_le_bytes());
    buf.extend_from_slice(&0_u32.to_le_bytes());
    buf
}

#[derive(Default)]
struct FakeState {
    devices: Vec<(DeviceListEntry, String)>,
    descriptions: HashMap<String, String>,
    failing_names: HashSet<DeviceHandle>,
    fail_device_list: bool,
    fail_raw_input_registration: bool,
    fail_notification_registration: bool,
    records: HashMap<RawInputHandle, Vec<u8>>,
    short_copies: HashMap<RawInputHandle, u32>,
    next_record: isize,
    raw_input_target: Option<(WindowHandle, CaptureMode)>,
    notifications: Vec<NotificationHandle>,
    next_notification: isize,
    raw_input_unregistrations: usize,
    notification_unregistrations: usize,
    device_list_calls: usize,
    raw_input_calls: usize,
    drained: usize,
}

/// Cloning a [`FakeSource`] shares the simulated system, so a test can keep a
/// handle while the pipeline owns another.
#[derive(Clone, Default)]
pub(crate) struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, handle: DeviceHandle, device_type: RawDeviceType, name: &str) {
        self.state.lock().devices.push((
            DeviceListEntry {
                handle,
                device_type,
            },
            name.to_owned(),
        ));
    }

    pub(crate) fn detach(&self, handle: DeviceHandle) {
        self.state
            .lock()
            .devices
            .retain(|(entry, _)| entry.handle != handle);
    }

    pub(crate) fn set_descriptions(&self, descriptions: HashMap<String, String>) {
        self.state.lock().descriptions = descriptions;
    }

    pub(crate) fn fail_name_query(&self, handle: DeviceHandle) {
        self.state.lock().failing_names.insert(handle);
    }

    pub(crate) fn fail_device_list(&self, fail: bool) {
        self.state.lock().fail_device_list = fail;
    }

    pub(crate) fn fail_raw_input_registration(&self, fail: bool) {
        self.state.lock().fail_raw_input_registration = fail;
    }

    pub(crate) fn fail_notification_registration(&self, fail: bool) {
        self.state.lock().fail_notification_registration = fail;
    }

    /// Queues a raw input record and returns the handle a `WM_INPUT` message
    /// would carry for it.
    pub(crate) fn push_record(&self, record: Vec<u8>) -> RawInputHandle {
        let mut state = self.state.lock();
        state.next_record += 1;
        let handle = RawInputHandle(0x4000 + state.next_record);
        state.records.insert(handle, record);
        handle
    }

    /// Makes the data fetch for `record` copy `missing` fewer bytes than the
    /// size query reported.
    pub(crate) fn short_copy(&self, record: RawInputHandle, missing: u32) {
        self.state.lock().short_copies.insert(record, missing);
    }

    pub(crate) fn raw_input_target(&self) -> Option<(WindowHandle, CaptureMode)> {
        self.state.lock().raw_input_target
    }

    pub(crate) fn active_notifications(&self) -> usize {
        self.state.lock().notifications.len()
    }

    pub(crate) fn raw_input_unregistrations(&self) -> usize {
        self.state.lock().raw_input_unregistrations
    }

    pub(crate) fn notification_unregistrations(&self) -> usize {
        self.state.lock().notification_unregistrations
    }

    pub(crate) fn device_list_calls(&self) -> usize {
        self.state.lock().device_list_calls
    }

    pub(crate) fn raw_input_calls(&self) -> usize {
        self.state.lock().raw_input_calls
    }

    pub(crate) fn drained(&self) -> usize {
        self.state.lock().drained
    }
}

fn invalid_handle(kind: ErrorKind, function: &'static str) -> Error {
    Err::<(), _>(Error::new(kind, ERROR_INVALID_HANDLE, "The handle is invalid."))
        .function(function)
        .unwrap_err()
}

impl RawInputSource for FakeSource {
    fn register_raw_input(&self, target: WindowHandle, mode: CaptureMode) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_raw_input_registration {
            return Err(Error::new(
                ErrorKind::Os,
                ERROR_INVALID_PARAMETER,
                "The parameter is incorrect.",
            ));
        }
        state.raw_input_target = Some((target, mode));
        Ok(())
    }

    fn unregister_raw_input(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.raw_input_target = None;
        state.raw_input_unregistrations += 1;
        Ok(())
    }

    fn register_device_notifications(&self, _target: WindowHandle) -> Result<NotificationHandle> {
        let mut state = self.state.lock();
        if state.fail_notification_registration {
            return Err(Error::new(
                ErrorKind::Os,
                ERROR_INVALID_PARAMETER,
                "The parameter is incorrect.",
            ));
        }
        state.next_notification += 1;
        let handle = NotificationHandle(0x9000 + state.next_notification);
        state.notifications.push(handle);
        Ok(handle)
    }

    fn unregister_device_notifications(&self, handle: NotificationHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.notification_unregistrations += 1;
        let before = state.notifications.len();
        state.notifications.retain(|&h| h != handle);
        if state.notifications.len() == before {
            return Err(invalid_handle(
                ErrorKind::Os,
                "UnregisterDeviceNotification",
            ));
        }
        Ok(())
    }

    fn device_list(&self) -> Result<Vec<DeviceListEntry>> {
        let mut state = self.state.lock();
        state.device_list_calls += 1;
        if state.fail_device_list {
            return Err(Error::new(
                ErrorKind::Os,
                ERROR_INVALID_PARAMETER,
                "The parameter is incorrect.",
            ));
        }
        Ok(state.devices.iter().map(|(entry, _)| *entry).collect())
    }

    fn device_name(&self, device: DeviceHandle) -> Result<String> {
        let state = self.state.lock();
        if state.failing_names.contains(&device) {
            return Err(invalid_handle(ErrorKind::DeviceQuery, "GetRawInputDeviceInfoW"));
        }
        state
            .devices
            .iter()
            .find(|(entry, _)| entry.handle == device)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| invalid_handle(ErrorKind::DeviceQuery, "GetRawInputDeviceInfoW"))
    }

    fn device_info(&self, device: DeviceHandle) -> Result<DeviceInfo> {
        let state = self.state.lock();
        let (entry, _) = state
            .devices
            .iter()
            .find(|(entry, _)| entry.handle == device)
            .ok_or_else(|| invalid_handle(ErrorKind::DeviceQuery, "GetRawInputDeviceInfoW"))?;
        match entry.device_type {
            RawDeviceType::Keyboard => Ok(DeviceInfo::Keyboard(KeyboardInfo {
                keyboard_type: 4,
                keyboard_sub_type: 0,
                keyboard_mode: 1,
                number_of_function_keys: 12,
                number_of_indicators: 3,
                number_of_keys_total: 101,
            })),
            RawDeviceType::Hid => Ok(DeviceInfo::Hid(HidInfo {
                vendor_id: 0x5AC,
                product_id: 0x24F,
                version_number: 0x111,
                usage_page: 0x0C,
                usage: 0x01,
            })),
            _ => Ok(DeviceInfo::Mouse(Default::default())),
        }
    }

    fn describe_device(&self, device_name: &str) -> Option<String> {
        self.state.lock().descriptions.get(device_name).cloned()
    }

    fn raw_input_size(&self, record: RawInputHandle) -> Result<u32> {
        let mut state = self.state.lock();
        state.raw_input_calls += 1;
        state
            .records
            .get(&record)
            .map(|buf| buf.len() as u32)
            .ok_or_else(|| invalid_handle(ErrorKind::Decode, "GetRawInputData"))
    }

    fn raw_input_data(&self, record: RawInputHandle, buf: &mut [u8]) -> Result<u32> {
        let mut state = self.state.lock();
        state.raw_input_calls += 1;
        let missing = state.short_copies.get(&record).copied().unwrap_or(0);
        let data = state
            .records
            .get(&record)
            .ok_or_else(|| invalid_handle(ErrorKind::Decode, "GetRawInputData"))?;
        let len = data.len().min(buf.len()).saturating_sub(missing as usize);
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len as u32)
    }

    fn drain_key_messages(&self) {
        self.state.lock().drained += 1;
    }
}
