//! Win32 virtual key codes and their strongly-typed counterparts.

use ::strum::{Display, EnumIter, FromRepr};

/// Raw virtual key values referenced by the decoding and normalization logic.
///
/// <https://learn.microsoft.com/en-us/windows/win32/inputdev/virtual-key-codes>
pub mod vk {
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    /// The generic Alt key.
    pub const MENU: u16 = 0x12;
    pub const LSHIFT: u16 = 0xA0;
    pub const RSHIFT: u16 = 0xA1;
    pub const LCONTROL: u16 = 0xA2;
    pub const RCONTROL: u16 = 0xA3;
    pub const LMENU: u16 = 0xA4;
    pub const RMENU: u16 = 0xA5;
    pub const ZOOM: u16 = 0xFB;

    /// `KEYBOARD_OVERRUN_MAKE_CODE`. The keyboard driver reports this when its
    /// buffer overflowed; it does not correspond to a key.
    pub const OVERRUN: u16 = 0xFF;
}

/// Set 1 scan codes referenced by the normalization logic.
pub mod scan {
    pub const LEFT_SHIFT: u16 = 0x2A;
    pub const RIGHT_SHIFT: u16 = 0x36;
}

/// A logical key, named after its Win32 virtual key.
///
/// Side-specific modifiers ([`KeyCode::LShift`], [`KeyCode::RControl`], ...)
/// are only produced once the raw packet has been normalized; the generic
/// variants remain for completeness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Display, FromRepr)]
#[repr(u8)]
pub enum KeyCode {
    Back = 0x08,
    Tab = 0x09,
    Clear = 0x0C,
    Return = 0x0D,
    Shift = 0x10,
    Control = 0x11,
    Menu = 0x12,
    Pause = 0x13,
    Capital = 0x14,
    Kana = 0x15,
    Junja = 0x17,
    Final = 0x18,
    Kanji = 0x19,
    Escape = 0x1B,
    Convert = 0x1C,
    NonConvert = 0x1D,
    Accept = 0x1E,
    ModeChange = 0x1F,
    Space = 0x20,
    Prior = 0x21,
    Next = 0x22,
    End = 0x23,
    Home = 0x24,
    Left = 0x25,
    Up = 0x26,
    Right = 0x27,
    Down = 0x28,
    Select = 0x29,
    Print = 0x2A,
    Execute = 0x2B,
    Snapshot = 0x2C,
    Insert = 0x2D,
    Delete = 0x2E,
    Help = 0x2F,
    Key0 = 0x30,
    Key1 = 0x31,
    Key2 = 0x32,
    Key3 = 0x33,
    Key4 = 0x34,
    Key5 = 0x35,
    Key6 = 0x36,
    Key7 = 0x37,
    Key8 = 0x38,
    Key9 = 0x39,
    A = 0x41,
    B = 0x42,
    C = 0x43,
    D = 0x44,
    E = 0x45,
    F = 0x46,
    G = 0x47,
    H = 0x48,
    I = 0x49,
    J = 0x4A,
    K = 0x4B,
    L = 0x4C,
    M = 0x4D,
    N = 0x4E,
    O = 0x4F,
    P = 0x50,
    Q = 0x51,
    R = 0x52,
    S = 0x53,
    T = 0x54,
    U = 0x55,
    V = 0x56,
    W = 0x57,
    X = 0x58,
    Y = 0x59,
    Z = 0x5A,
    LWin = 0x5B,
    RWin = 0x5C,
    Apps = 0x5D,
    Sleep = 0x5F,
    Numpad0 = 0x60,
    Numpad1 = 0x61,
    Numpad2 = 0x62,
    Numpad3 = 0x63,
    Numpad4 = 0x64,
    Numpad5 = 0x65,
    Numpad6 = 0x66,
    Numpad7 = 0x67,
    Numpad8 = 0x68,
    Numpad9 = 0x69,
    Multiply = 0x6A,
    Add = 0x6B,
    Separator = 0x6C,
    Subtract = 0x6D,
    Decimal = 0x6E,
    Divide = 0x6F,
    F1 = 0x70,
    F2 = 0x71,
    F3 = 0x72,
    F4 = 0x73,
    F5 = 0x74,
    F6 = 0x75,
    F7 = 0x76,
    F8 = 0x77,
    F9 = 0x78,
    F10 = 0x79,
    F11 = 0x7A,
    F12 = 0x7B,
    F13 = 0x7C,
    F14 = 0x7D,
    F15 = 0x7E,
    F16 = 0x7F,
    F17 = 0x80,
    F18 = 0x81,
    F19 = 0x82,
    F20 = 0x83,
    F21 = 0x84,
    F22 = 0x85,
    F23 = 0x86,
    F24 = 0x87,
    NumLock = 0x90,
    Scroll = 0x91,
    LShift = 0xA0,
    RShift = 0xA1,
    LControl = 0xA2,
    RControl = 0xA3,
    LMenu = 0xA4,
    RMenu = 0xA5,
    BrowserBack = 0xA6,
    BrowserForward = 0xA7,
    BrowserRefresh = 0xA8,
    BrowserStop = 0xA9,
    BrowserSearch = 0xAA,
    BrowserFavorites = 0xAB,
    BrowserHome = 0xAC,
    VolumeMute = 0xAD,
    VolumeDown = 0xAE,
    VolumeUp = 0xAF,
    MediaNextTrack = 0xB0,
    MediaPrevTrack = 0xB1,
    MediaStop = 0xB2,
    MediaPlayPause = 0xB3,
    LaunchMail = 0xB4,
    LaunchMediaSelect = 0xB5,
    LaunchApp1 = 0xB6,
    LaunchApp2 = 0xB7,
    Oem1 = 0xBA,
    OemPlus = 0xBB,
    OemComma = 0xBC,
    OemMinus = 0xBD,
    OemPeriod = 0xBE,
    Oem2 = 0xBF,
    Oem3 = 0xC0,
    Oem4 = 0xDB,
    Oem5 = 0xDC,
    Oem6 = 0xDD,
    Oem7 = 0xDE,
    Oem8 = 0xDF,
    Oem102 = 0xE2,
    ProcessKey = 0xE5,
    Packet = 0xE7,
    Attn = 0xF6,
    CrSel = 0xF7,
    ExSel = 0xF8,
    EraseEof = 0xF9,
    Play = 0xFA,
    Zoom = 0xFB,
    Pa1 = 0xFD,
    OemClear = 0xFE,
}

impl KeyCode {
    /// The Win32 virtual key value.
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Maps a virtual key onto a logical key. Returns `None` for reserved,
    /// unassigned or out-of-range values.
    pub fn from_virtual_key(virtual_key: u16) -> Option<Self> {
        u8::try_from(virtual_key).ok().and_then(Self::from_repr)
    }

    /// Returns `true` for the side-specific and generic Shift, Control and
    /// Alt keys.
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Shift
                | Self::Control
                | Self::Menu
                | Self::LShift
                | Self::RShift
                | Self::LControl
                | Self::RControl
                | Self::LMenu
                | Self::RMenu
        )
    }
}

impl TryFrom<u16> for KeyCode {
    type Error = u16;

    fn try_from(virtual_key: u16) -> Result<Self, Self::Error> {
        Self::from_virtual_key(virtual_key).ok_or(virtual_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;
    use ::strum::IntoEnumIterator;

    #[test]
    fn test_round_trips_through_value() {
        for key_code in KeyCode::iter() {
            assert_eq!(
                KeyCode::from_virtual_key(key_code.value().into()),
                Some(key_code)
            );
        }
    }

    #[test]
    fn test_side_specific_constants_match_table() {
        assert_eq!(KeyCode::try_from(vk::LSHIFT), Ok(KeyCode::LShift));
        assert_eq!(KeyCode::try_from(vk::RSHIFT), Ok(KeyCode::RShift));
        assert_eq!(KeyCode::try_from(vk::LCONTROL), Ok(KeyCode::LControl));
        assert_eq!(KeyCode::try_from(vk::RCONTROL), Ok(KeyCode::RControl));
        assert_eq!(KeyCode::try_from(vk::LMENU), Ok(KeyCode::LMenu));
        assert_eq!(KeyCode::try_from(vk::RMENU), Ok(KeyCode::RMenu));
        assert_eq!(KeyCode::try_from(vk::ZOOM), Ok(KeyCode::Zoom));
    }

    #[test]
    fn test_unassigned_virtual_keys() {
        assert_eq!(KeyCode::try_from(0x0000), Err(0x0000));
        assert_eq!(KeyCode::try_from(0x0A), Err(0x0A));
        assert_eq!(KeyCode::try_from(vk::OVERRUN), Err(vk::OVERRUN));
        assert_eq!(KeyCode::try_from(0x1_41), Err(0x1_41));
    }

    #[test]
    fn test_modifiers() {
        let modifiers: Vec<_> = KeyCode::iter().filter(|k| k.is_modifier()).collect();
        assert_eq!(modifiers.len(), 9);
        assert!(!KeyCode::LWin.is_modifier());
    }
}
