//! Per-device keyboard input from the Win32 raw input facility.
//!
//! The toolkit-level keyboard messages (`WM_KEYDOWN`, `WM_KEYUP`) collapse
//! every attached keyboard into a single stream and fold left/right modifier
//! keys onto the same virtual key. [`RawKeyboard`] instead consumes the raw
//! input records delivered with `WM_INPUT`, attributes each keystroke to the
//! physical keyboard which produced it, resolves ambiguous virtual keys and
//! tracks keyboards as they are attached and removed.
//!
//! The host feeds every window message into [`RawKeyboard::route`] and
//! subscribes to [`KeyEvent`]s. All operating system access goes through the
//! [`RawInputSource`] trait; the Win32 implementation lives in
//! `platform::win32`.
//!
//! [`RawKeyboard`]: crate::input::keyboard::RawKeyboard
//! [`RawKeyboard::route`]: crate::input::keyboard::RawKeyboard::route
//! [`KeyEvent`]: crate::input::keyboard::KeyEvent
//! [`RawInputSource`]: crate::platform::RawInputSource

pub mod errors;
pub mod input;
pub mod platform;
pub mod types;
