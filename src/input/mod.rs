//! Input handling for raw keyboard devices.

pub mod keyboard;
