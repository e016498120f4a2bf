//! Human-readable keyboard descriptions from the device enumeration tree of
//! the system registry.
//!
//! A raw input device path such as
//! `\\?\HID#VID_046D&PID_C31C&MI_00#7&1a2b3c&0&0000#{884b96c3-...}` names the
//! enumerator, device id and instance id of the device. The registry key
//! `HKLM\System\CurrentControlSet\Enum\<enumerator>\<device>\<instance>`
//! carries a `DeviceDesc` value of the form `@keyboard.inf,%desc%;HID Keyboard
//! Device`, of which the part after the first `;` is the description.

/// Root of the per-device keys, below `HKEY_LOCAL_MACHINE`.
const ENUM_ROOT: &str = r"System\CurrentControlSet\Enum";

/// Name of the value holding the device description.
pub const DEVICE_DESC_VALUE: &str = "DeviceDesc";

/// Maps a raw input device path onto its registry key below
/// `HKEY_LOCAL_MACHINE`. Returns `None` if the path has fewer than three
/// `#`-separated components after its `\\?\` prefix.
pub fn device_key_path(device_name: &str) -> Option<String> {
    let mut parts = device_name.get(4..)?.split('#');
    let enumerator = parts.next().filter(|p| !p.is_empty())?;
    let device = parts.next().filter(|p| !p.is_empty())?;
    let instance = parts.next().filter(|p| !p.is_empty())?;
    Some(format!(r"{ENUM_ROOT}\{enumerator}\{device}\{instance}"))
}

/// Strips the localization reference from a `DeviceDesc` value.
pub fn parse_device_desc(value: &str) -> &str {
    match value.find(';') {
        Some(idx) => &value[idx + 1..],
        None => value,
    }
}

#[cfg(windows)]
pub use self::win32::device_description;

#[cfg(windows)]
mod win32 {
    use super::*;
    use crate::errors::{Context, Result};

    use ::tracing::{error, trace};
    use ::widestring::U16CString;
    use ::windows::{
        core::PCWSTR,
        Win32::System::Registry::{
            RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
        },
    };

    /// An open registry key, closed on drop.
    struct OwnedKey(HKEY);

    impl OwnedKey {
        fn open(path: &str) -> Result<Self> {
            let path = U16CString::from_str_truncate(path);
            let mut key = HKEY::default();
            unsafe {
                RegOpenKeyExW(
                    HKEY_LOCAL_MACHINE,
                    PCWSTR::from_raw(path.as_ptr()),
                    0,
                    KEY_READ,
                    &mut key,
                )
            }
            .ok()
            .function("RegOpenKeyExW")?;
            Ok(Self(key))
        }

        fn query_string(&self, value_name: &str) -> Result<String> {
            let value_name = U16CString::from_str_truncate(value_name);
            let mut size = 0_u32;
            unsafe {
                RegQueryValueExW(
                    self.0,
                    PCWSTR::from_raw(value_name.as_ptr()),
                    None,
                    None,
                    None,
                    Some(&mut size),
                )
            }
            .ok()
            .function("RegQueryValueExW")?;

            let mut buf = vec![0_u16; (size as usize + 1) / 2];
            unsafe {
                RegQueryValueExW(
                    self.0,
                    PCWSTR::from_raw(value_name.as_ptr()),
                    None,
                    None,
                    Some(buf.as_mut_ptr().cast()),
                    Some(&mut size),
                )
            }
            .ok()
            .function("RegQueryValueExW")?;

            Ok(U16CString::from_vec_truncate(buf).to_string_lossy())
        }
    }

    impl Drop for OwnedKey {
        fn drop(&mut self) {
            if let Err(e) = unsafe { RegCloseKey(self.0) }.ok().function("RegCloseKey") {
                error!(error = %e, "Failed to close registry key");
            }
        }
    }

    /// Looks up the description of a raw input device. Returns `None` if the
    /// path is malformed or the registry has no description for the device.
    pub fn device_description(device_name: &str) -> Option<String> {
        let path = device_key_path(device_name)?;
        let description = OwnedKey::open(&path)
            .and_then(|key| key.query_string(DEVICE_DESC_VALUE))
            .context("Failed to read device description");

        match description {
            Ok(value) => Some(parse_device_desc(&value).to_owned()),
            Err(e) => {
                trace!(device_name, error = %e, "No registry description for device");
                None
            }
        }
    }
}
