//! Pressed key tracking, per keyboard.

use ::bitvec::prelude::*;
use ::std::collections::HashMap;
use ::tracing::trace;

use crate::{
    input::keyboard::{KeyCode, RawKeyPacket},
    types::DeviceHandle,
};

type PressedKeys = BitArr!(for 256, in usize, Lsb0);

/// Tracks which keys are held down on each keyboard.
///
/// Keys are tracked by normalized virtual key, so left and right modifiers are
/// distinct. Auto-repeat key-down packets leave the state unchanged.
#[derive(Default)]
pub struct KeyStates {
    devices: HashMap<DeviceHandle, PressedKeys>,
}

impl KeyStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a decoded keystroke.
    pub fn process_packet(&mut self, packet: &RawKeyPacket) {
        let virtual_key = packet.normalized_virtual_key();
        let pressed = !packet.flags.is_break;
        let keys = self
            .devices
            .entry(packet.device)
            .or_insert_with(|| BitArray::ZERO);
        if let Some(mut bit) = keys.get_mut(virtual_key as usize) {
            *bit = pressed;
        }
    }

    /// Returns `true` if the given key is currently held on the device.
    pub fn is_key_pressed(&self, device: DeviceHandle, key: KeyCode) -> bool {
        self.devices
            .get(&device)
            .and_then(|keys| keys.get(key.value() as usize).map(|bit| *bit))
            .unwrap_or(false)
    }

    /// All keys currently held on the device, in virtual key order.
    pub fn pressed_keys(&self, device: DeviceHandle) -> Vec<KeyCode> {
        self.devices
            .get(&device)
            .map(|keys| {
                keys.iter_ones()
                    .filter_map(|vk| KeyCode::from_virtual_key(vk as u16))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops the state of every device for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(DeviceHandle) -> bool) {
        self.devices.retain(|&device, _| {
            let kept = keep(device);
            if !kept {
                trace!(device = %device, "Dropping key state of removed device");
            }
            kept
        });
    }

    /// Reset all keyboard state.
    pub fn reset(&mut self) {
        self.devices.clear();
    }
}
