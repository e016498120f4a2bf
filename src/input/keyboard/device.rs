//! Tracking of the keyboard-class devices known to the raw input system.

use ::parking_lot::Mutex;
use ::std::{collections::HashMap, fmt, sync::Arc};
use ::tap::Pipe;
use ::tracing::{debug, trace, warn};

use crate::{
    errors::{Context, ErrorKind, Result},
    platform::{RawDeviceType, RawInputSource},
    types::DeviceHandle,
};

/// Name of the synthetic device registered under [`DeviceHandle::NULL`].
pub const GLOBAL_KEYBOARD_NAME: &str = "Global Keyboard";

const GLOBAL_KEYBOARD_DESCRIPTION: &str = "Fake Keyboard. Some keys (ZOOM, MUTE, VOLUMEUP, \
     VOLUMEDOWN) are sent to rawinput with a handle of zero.";

/// The raw input class of a [`KeyboardDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::strum::Display)]
pub enum DeviceKind {
    Keyboard,
    GenericHidKeyboard,
}

impl DeviceKind {
    /// Maps a raw device class onto a keyboard kind. Mice have no counterpart.
    pub const fn from_raw(device_type: RawDeviceType) -> Option<Self> {
        match device_type {
            RawDeviceType::Keyboard => Some(Self::Keyboard),
            RawDeviceType::Hid => Some(Self::GenericHidKeyboard),
            RawDeviceType::Mouse | RawDeviceType::Unknown(_) => None,
        }
    }
}

/// A keyboard attached to the system, or the synthetic global keyboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardDevice {
    handle: DeviceHandle,
    name: String,
    kind: DeviceKind,
    description: String,
}

impl KeyboardDevice {
    pub fn new(
        handle: DeviceHandle,
        name: impl Into<String>,
        kind: DeviceKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            name: name.into(),
            kind,
            description: description.into(),
        }
    }

    /// The synthetic device to which the system attributes keys reported
    /// without a device (certain multimedia keys).
    pub fn global() -> Self {
        Self::new(
            DeviceHandle::NULL,
            GLOBAL_KEYBOARD_NAME,
            DeviceKind::Keyboard,
            GLOBAL_KEYBOARD_DESCRIPTION,
        )
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// The device interface path, e.g. `\\?\HID#VID_046D&PID_C31C&MI_00#...`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Human-readable description, or the empty string if none is known.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns `true` for the synthetic global keyboard.
    pub fn is_global(&self) -> bool {
        self.handle.is_null()
    }
}

impl fmt::Display for KeyboardDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device")?;
        writeln!(f, " Name: {}", self.name)?;
        writeln!(f, " Type: {}", self.kind)?;
        writeln!(f, " Handle: {}", self.handle)?;
        writeln!(f, " Description: {}", self.description)
    }
}

type DeviceMap = HashMap<DeviceHandle, Arc<KeyboardDevice>>;

/// The set of known keyboard devices, keyed by device handle.
///
/// The registry always contains the synthetic [`KeyboardDevice::global`]
/// entry. It is rebuilt from scratch by [`enumerate`] and swapped in only once
/// the system device list was read in full, so concurrent lookups never observe
/// a partially built or empty registry.
///
/// [`enumerate`]: Self::enumerate
pub struct DeviceRegistry {
    devices: Mutex<DeviceMap>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Constructs a registry holding only the global keyboard.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(Self::seeded()),
        }
    }

    /// Rebuilds the registry from the system device list, returning the new
    /// number of devices (including the global keyboard).
    ///
    /// Mice are skipped, as are devices whose path cannot be resolved. If the
    /// device list itself cannot be read, the registry keeps its previous
    /// contents and an [`ErrorKind::Enumeration`] error is returned.
    pub fn enumerate<S>(&self, source: &S) -> Result<usize>
    where
        S: RawInputSource + ?Sized,
    {
        let entries = source
            .device_list()
            .context("Failed to enumerate raw input devices")
            .kind(ErrorKind::Enumeration)?;

        let mut scratch = Self::seeded();
        for entry in entries {
            let Some(kind) = DeviceKind::from_raw(entry.device_type) else {
                trace!(device = %entry.handle, device_type = ?entry.device_type, "Skipping non-keyboard device");
                continue;
            };
            if scratch.contains_key(&entry.handle) {
                continue;
            }

            let name = match source.device_name(entry.handle) {
                Ok(name) if !name.is_empty() => name,
                Ok(_) => {
                    debug!(device = %entry.handle, "Skipping device without a path");
                    continue;
                }
                Err(e) => {
                    warn!(device = %entry.handle, error = %e, "Skipping device, path query failed");
                    continue;
                }
            };
            let description = source.describe_device(&name).unwrap_or_default();

            let device = KeyboardDevice::new(entry.handle, name, kind, description).pipe(Arc::new);
            scratch.insert(entry.handle, device);
        }

        let count = scratch.len();
        *self.devices.lock() = scratch;
        debug!(count, "Enumerated keyboard devices");
        Ok(count)
    }

    /// Looks up a device by handle. Returns `None` for unknown handles, e.g. a
    /// device removed after its input was queued.
    pub fn lookup(&self, handle: DeviceHandle) -> Option<Arc<KeyboardDevice>> {
        self.devices.lock().get(&handle).cloned()
    }

    pub fn contains(&self, handle: DeviceHandle) -> bool {
        self.devices.lock().contains_key(&handle)
    }

    /// The number of known devices, including the global keyboard.
    pub fn count(&self) -> usize {
        self.devices.lock().len()
    }

    /// A snapshot of the known devices, ordered by handle.
    pub fn devices(&self) -> Vec<Arc<KeyboardDevice>> {
        let mut devices: Vec<_> = self.devices.lock().values().cloned().collect();
        devices.sort_by_key(|device| device.handle());
        devices
    }

    fn seeded() -> DeviceMap {
        let global = Arc::new(KeyboardDevice::global());
        let mut devices = HashMap::new();
        devices.insert(global.handle(), global);
        devices
    }
}
