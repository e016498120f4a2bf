//! Decoding of the binary `RAWINPUT` records delivered with `WM_INPUT`.
//!
//! A keyboard record is a `RAWINPUTHEADER` followed by a `RAWKEYBOARD`
//! payload. The header carries two pointer-sized fields, so its length
//! depends on the pointer width of the receiving process:
//!
//! ```text
//! header   +0  dwType   u32      (RIM_TYPEKEYBOARD = 1)
//!          +4  dwSize   u32
//!          +8  hDevice  pointer
//!          +8+p wParam  pointer
//! payload  +0  MakeCode u16
//!          +2  Flags    u16
//!          +4  Reserved u16
//!          +6  VKey     u16
//!          +8  Message  u32
//!          +12 ExtraInformation u32
//! ```
//!
//! All fields are little-endian. The layout is read with explicit offsets
//! rather than by overlaying a native struct.

use ::deku::prelude::*;
use ::tracing::trace;

use crate::{
    errors::Error,
    input::keyboard::{codes::vk, normalize, DeviceRegistry},
    platform::RawInputSource,
    types::{DeviceHandle, RawInputHandle},
};

/// `RIM_TYPEKEYBOARD`, the `dwType` of keyboard records.
pub const RIM_TYPEKEYBOARD: u32 = 1;

mod offsets {
    pub const HEADER_TYPE: usize = 0;
    pub const HEADER_DEVICE: usize = 8;

    pub const MAKE_CODE: usize = 0;
    pub const FLAGS: usize = 2;
    pub const VKEY: usize = 6;
    pub const MESSAGE: usize = 8;
    pub const EXTRA_INFORMATION: usize = 12;

    pub const KEYBOARD_PAYLOAD_LEN: usize = 16;
}

/// Errors which prevent a raw input record from being decoded.
#[derive(Debug, Clone, PartialEq, ::thiserror::Error)]
pub enum DecodeError {
    /// The system call fetching the record failed.
    #[error("failed to fetch raw input record: {0}")]
    Os(#[from] Error),
    /// The system copied a different number of bytes than it asked for.
    #[error("raw input record size mismatch (expected {expected} bytes, got {actual})")]
    SizeMismatch { expected: u32, actual: u32 },
    /// The record is shorter than a keyboard record.
    #[error("raw input record truncated ({len} bytes, keyboard records need {required})")]
    Truncated { len: usize, required: usize },
    /// The record was produced by a mouse or generic HID device.
    #[error("raw input record of type {0} is not a keyboard record")]
    NotKeyboard(u32),
    /// The flag bits could not be parsed.
    #[error("malformed keystroke flags: {0}")]
    Flags(#[from] DekuError),
}

/// Byte layout of a raw input record, which varies with pointer width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketLayout {
    pointer_width: usize,
}

impl Default for PacketLayout {
    fn default() -> Self {
        Self::native()
    }
}

impl PacketLayout {
    /// Layout used by records delivered to the current process.
    pub const fn native() -> Self {
        Self {
            pointer_width: ::std::mem::size_of::<usize>(),
        }
    }

    /// Layout of a process with the given pointer width in bytes (4 or 8).
    pub const fn with_pointer_width(pointer_width: usize) -> Self {
        assert!(pointer_width == 4 || pointer_width == 8);
        Self { pointer_width }
    }

    pub const fn pointer_width(&self) -> usize {
        self.pointer_width
    }

    /// Length of `RAWINPUTHEADER`.
    pub const fn header_len(&self) -> usize {
        offsets::HEADER_DEVICE + 2 * self.pointer_width
    }

    /// Length of a complete keyboard record.
    pub const fn packet_len(&self) -> usize {
        self.header_len() + offsets::KEYBOARD_PAYLOAD_LEN
    }
}

/// Struct representation of the `RAWKEYBOARD` flags word.
///
/// Flag definitions:
/// <https://learn.microsoft.com/en-us/windows/win32/api/winuser/ns-winuser-rawkeyboard>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct KeystrokeFlags {
    /// Bit 4. `RI_KEY_TERMSRV_SHADOW`.
    #[deku(pad_bits_before = "11", bits = "1")]
    pub is_terminal_server_shadow: bool,

    /// Bit 3. `RI_KEY_TERMSRV_SET_LED`.
    #[deku(bits = "1")]
    pub is_terminal_server_set_led: bool,

    /// Bit 2. `RI_KEY_E1`, the key is part of the E1 escape sequence (Pause).
    #[deku(bits = "1")]
    pub is_e1: bool,

    /// Bit 1. `RI_KEY_E0`, the key is an extended key such as the right-hand
    /// Ctrl and Alt keys.
    #[deku(bits = "1")]
    pub is_e0: bool,

    /// Bit 0. `RI_KEY_BREAK`, set when the key is being released.
    #[deku(bits = "1")]
    pub is_break: bool,
}

impl TryFrom<u16> for KeystrokeFlags {
    type Error = DekuError;

    fn try_from(flags: u16) -> Result<Self, Self::Error> {
        Self::from_bytes((&flags.to_be_bytes(), 0)).map(|(_, flags)| flags)
    }
}

/// A decoded keyboard record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawKeyPacket {
    /// The device which produced the keystroke.
    pub device: DeviceHandle,
    /// The virtual key as reported, before normalization.
    pub virtual_key: u16,
    /// The make code (set 1 scan code).
    pub scan_code: u16,
    pub flags: KeystrokeFlags,
    /// The window message the keystroke would have produced (`WM_KEYDOWN`,
    /// `WM_SYSKEYUP`, ...).
    pub message: u32,
    /// Device-specific extra information.
    pub extra_information: u32,
}

impl RawKeyPacket {
    /// Parses a keyboard record. The buffer must hold at least a full keyboard
    /// record; trailing bytes are ignored.
    pub fn parse(buf: &[u8], layout: PacketLayout) -> Result<Self, DecodeError> {
        if buf.len() < offsets::HEADER_TYPE + 4 {
            return Err(DecodeError::Truncated {
                len: buf.len(),
                required: layout.packet_len(),
            });
        }

        let kind = read_u32(buf, offsets::HEADER_TYPE);
        if kind != RIM_TYPEKEYBOARD {
            return Err(DecodeError::NotKeyboard(kind));
        }
        if buf.len() < layout.packet_len() {
            return Err(DecodeError::Truncated {
                len: buf.len(),
                required: layout.packet_len(),
            });
        }

        let device = DeviceHandle(read_pointer(buf, offsets::HEADER_DEVICE, layout));
        let payload = &buf[layout.header_len()..];

        Ok(Self {
            device,
            virtual_key: read_u16(payload, offsets::VKEY),
            scan_code: read_u16(payload, offsets::MAKE_CODE),
            flags: KeystrokeFlags::try_from(read_u16(payload, offsets::FLAGS))?,
            message: read_u32(payload, offsets::MESSAGE),
            extra_information: read_u32(payload, offsets::EXTRA_INFORMATION),
        })
    }

    /// Returns `true` if the keyboard driver reported a buffer overrun rather
    /// than a real key.
    pub const fn is_overrun(&self) -> bool {
        self.virtual_key == vk::OVERRUN
    }

    /// The virtual key with left/right and device-specific ambiguities
    /// resolved.
    pub fn normalized_virtual_key(&self) -> u16 {
        normalize(
            self.device,
            self.virtual_key,
            self.flags.is_e0,
            self.scan_code,
        )
    }
}

/// Fetches and decodes the raw input record behind `record`.
///
/// Returns `Ok(None)` if there is nothing to deliver: the device registry is
/// empty, or the record is the overrun artifact rather than a real key.
pub fn decode<S>(
    source: &S,
    registry: &DeviceRegistry,
    record: RawInputHandle,
) -> Result<Option<RawKeyPacket>, DecodeError>
where
    S: RawInputSource + ?Sized,
{
    let expected = source.raw_input_size(record)?;
    if registry.count() == 0 {
        return Ok(None);
    }

    let mut buf = vec![0_u8; expected as usize];
    let actual = source.raw_input_data(record, &mut buf)?;
    if actual != expected {
        return Err(DecodeError::SizeMismatch { expected, actual });
    }

    let packet = RawKeyPacket::parse(&buf, source.layout())?;
    if packet.is_overrun() {
        trace!(device = %packet.device, "Keyboard overrun reported, no key");
        return Ok(None);
    }

    Ok(Some(packet))
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0_u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_pointer(buf: &[u8], offset: usize, layout: PacketLayout) -> isize {
    match layout.pointer_width() {
        4 => read_u32(buf, offset) as isize,
        _ => {
            let mut bytes = [0_u8; 8];
            bytes.copy_from_slice(&buf[offset..offset + 8]);
            i64::from_le_bytes(bytes) as isize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ErrorKind,
        input::keyboard::codes::{scan, vk},
        platform::fake::{keyboard_record, FakeSource, KeyRecord},
        types::WM_KEYDOWN,
    };

    use ::pretty_assertions::assert_eq;

    const RIGHT_CTRL_DOWN: KeyRecord = KeyRecord {
        device: DeviceHandle(0xABC),
        virtual_key: vk::CONTROL,
        scan_code: 0x1D,
        flags: 0x0002,
        message: WM_KEYDOWN,
    };

    #[test]
    fn test_flags_bits() {
        assert_eq!(KeystrokeFlags::try_from(0).unwrap(), KeystrokeFlags::default());
        assert_eq!(
            KeystrokeFlags::try_from(0x0003).unwrap(),
            KeystrokeFlags {
                is_break: true,
                is_e0: true,
                ..Default::default()
            }
        );
        assert_eq!(
            KeystrokeFlags::try_from(0x001C).unwrap(),
            KeystrokeFlags {
                is_e1: true,
                is_terminal_server_set_led: true,
                is_terminal_server_shadow: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_flags_ignore_undefined_high_bits() {
        assert_eq!(
            KeystrokeFlags::try_from(0xFF01).unwrap(),
            KeystrokeFlags {
                is_break: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_flags_write_back() {
        let flags = KeystrokeFlags {
            is_break: true,
            is_e0: true,
            ..Default::default()
        };
        assert_eq!(flags.to_bytes().unwrap(), 0x0003_u16.to_be_bytes().to_vec());
    }

    #[test]
    fn test_layout_lengths() {
        assert_eq!(PacketLayout::with_pointer_width(8).header_len(), 24);
        assert_eq!(PacketLayout::with_pointer_width(8).packet_len(), 40);
        assert_eq!(PacketLayout::with_pointer_width(4).header_len(), 16);
        assert_eq!(PacketLayout::with_pointer_width(4).packet_len(), 32);
    }

    #[test]
    fn test_parse_64_bit_record() {
        let layout = PacketLayout::with_pointer_width(8);
        let buf = keyboard_record(layout, RIGHT_CTRL_DOWN);

        let packet = RawKeyPacket::parse(&buf, layout).unwrap();
        assert_eq!(
            packet,
            RawKeyPacket {
                device: DeviceHandle(0xABC),
                virtual_key: vk::CONTROL,
                scan_code: 0x1D,
                flags: KeystrokeFlags {
                    is_e0: true,
                    ..Default::default()
                },
                message: WM_KEYDOWN,
                extra_information: 0,
            }
        );
        assert_eq!(packet.normalized_virtual_key(), vk::RCONTROL);
    }

    #[test]
    fn test_parse_32_bit_record() {
        let layout = PacketLayout::with_pointer_width(4);
        let buf = keyboard_record(
            layout,
            KeyRecord {
                virtual_key: vk::SHIFT,
                scan_code: scan::RIGHT_SHIFT,
                flags: 0x0001,
                ..RIGHT_CTRL_DOWN
            },
        );

        let packet = RawKeyPacket::parse(&buf, layout).unwrap();
        assert_eq!(packet.device, DeviceHandle(0xABC));
        assert_eq!(packet.scan_code, scan::RIGHT_SHIFT);
        assert!(packet.flags.is_break);
        assert_eq!(packet.normalized_virtual_key(), vk::RSHIFT);
    }

    #[test]
    fn test_parse_rejects_mouse_record() {
        let layout = PacketLayout::native();
        let mut buf = keyboard_record(layout, RIGHT_CTRL_DOWN);
        buf[0] = 0; // RIM_TYPEMOUSE

        assert_eq!(
            RawKeyPacket::parse(&buf, layout),
            Err(DecodeError::NotKeyboard(0))
        );
    }

    #[test]
    fn test_parse_rejects_truncated_record() {
        let layout = PacketLayout::with_pointer_width(8);
        let buf = keyboard_record(layout, RIGHT_CTRL_DOWN);

        assert_eq!(
            RawKeyPacket::parse(&buf[..30], layout),
            Err(DecodeError::Truncated {
                len: 30,
                required: 40
            })
        );
        assert_eq!(
            RawKeyPacket::parse(&buf[..3], layout),
            Err(DecodeError::Truncated {
                len: 3,
                required: 40
            })
        );
    }

    #[test]
    fn test_decode() {
        let source = FakeSource::new();
        let registry = DeviceRegistry::new();
        let record = source.push_record(keyboard_record(source.layout(), RIGHT_CTRL_DOWN));

        let packet = decode(&source, &registry, record).unwrap().unwrap();
        assert_eq!(packet.device, DeviceHandle(0xABC));
        assert_eq!(packet.virtual_key, vk::CONTROL);
    }

    #[test]
    fn test_decode_overrun_is_not_an_error() {
        let source = FakeSource::new();
        let registry = DeviceRegistry::new();
        let record = source.push_record(keyboard_record(
            source.layout(),
            KeyRecord {
                virtual_key: vk::OVERRUN,
                ..RIGHT_CTRL_DOWN
            },
        ));

        assert_eq!(decode(&source, &registry, record), Ok(None));
    }

    #[test]
    fn test_decode_size_mismatch() {
        let source = FakeSource::new();
        let registry = DeviceRegistry::new();
        let record = source.push_record(keyboard_record(source.layout(), RIGHT_CTRL_DOWN));
        source.short_copy(record, 4);

        let expected = source.layout().packet_len() as u32;
        assert_eq!(
            decode(&source, &registry, record),
            Err(DecodeError::SizeMismatch {
                expected,
                actual: expected - 4
            })
        );
    }

    #[test]
    fn test_decode_unknown_record() {
        let source = FakeSource::new();
        let registry = DeviceRegistry::new();

        match decode(&source, &registry, RawInputHandle(0x7777)) {
            Err(DecodeError::Os(err)) => assert_eq!(err.kind(), ErrorKind::Decode),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn test_decode_repeats_failure_for_same_record() {
        let source = FakeSource::new();
        let registry = DeviceRegistry::new();
        let record = source.push_record(vec![0_u8; 12]);

        let first = decode(&source, &registry, record);
        let second = decode(&source, &registry, record);
        assert!(first.is_err());
        assert_eq!(first, second);
    }
}
