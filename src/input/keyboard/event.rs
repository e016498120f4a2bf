//! Public key event notifications and their delivery to subscribers.

use ::std::{cell::RefCell, rc::Rc, sync::Arc};
use ::tracing::trace;

use crate::{
    input::keyboard::{KeyCode, KeyboardDevice, RawKeyPacket},
    types::{RIM_INPUTSINK, WindowsProcessMessage},
};

/// Whether a key went down or came up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::strum::Display)]
pub enum KeyState {
    Down,
    Up,
}

/// Whether the target window had focus when the input arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::strum::Display)]
pub enum InputOrigin {
    Foreground,
    Background,
}

impl InputOrigin {
    /// Reads the input code from a `WM_INPUT` wparam.
    pub const fn from_wparam(wparam: usize) -> Self {
        if wparam & 0xFF == RIM_INPUTSINK {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// A single keystroke, attributed to the keyboard which produced it.
///
/// Subscribers may mark the event as handled with [`set_handled`]. Once any
/// subscriber has done so, the queued `WM_KEYDOWN`/`WM_KEYUP` message for the
/// keystroke is removed so the toolkit does not process it a second time.
///
/// [`set_handled`]: Self::set_handled
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    device: Arc<KeyboardDevice>,
    state: KeyState,
    origin: InputOrigin,
    message: u32,
    key: Option<KeyCode>,
    virtual_key: u16,
    raw_virtual_key: u16,
    scan_code: u16,
    handled: bool,
}

impl KeyEvent {
    pub(crate) fn new(packet: &RawKeyPacket, device: Arc<KeyboardDevice>, origin: InputOrigin) -> Self {
        let virtual_key = packet.normalized_virtual_key();
        Self {
            device,
            state: if packet.flags.is_break {
                KeyState::Up
            } else {
                KeyState::Down
            },
            origin,
            message: packet.message,
            key: KeyCode::from_virtual_key(virtual_key),
            virtual_key,
            raw_virtual_key: packet.virtual_key,
            scan_code: packet.scan_code,
            handled: false,
        }
    }

    /// The keyboard which produced the keystroke.
    pub fn device(&self) -> &KeyboardDevice {
        &self.device
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    pub fn origin(&self) -> InputOrigin {
        self.origin
    }

    /// The window message the keystroke maps to (`WM_KEYDOWN`, `WM_SYSKEYUP`,
    /// ...).
    pub fn message(&self) -> u32 {
        self.message
    }

    /// The logical key, or `None` if the virtual key has no [`KeyCode`].
    pub fn key(&self) -> Option<KeyCode> {
        self.key
    }

    /// The normalized virtual key, e.g. `VK_RCONTROL` rather than
    /// `VK_CONTROL`.
    pub fn virtual_key(&self) -> u16 {
        self.virtual_key
    }

    /// The virtual key as the system reported it.
    pub fn raw_virtual_key(&self) -> u16 {
        self.raw_virtual_key
    }

    pub fn scan_code(&self) -> u16 {
        self.scan_code
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }
}

/// A key event subscriber. Identity is by pointer: subscribing the same `Rc`
/// twice is a no-op.
pub type KeyEventHandler = Rc<dyn Fn(&mut KeyEvent)>;

/// Ordered list of subscribers. Every subscriber sees every event, in
/// subscription order, regardless of whether an earlier one handled it.
#[derive(Default)]
pub(crate) struct Dispatcher {
    handlers: RefCell<Vec<KeyEventHandler>>,
}

impl Dispatcher {
    /// Adds a subscriber. Returns `false` if it was already subscribed.
    pub(crate) fn subscribe(&self, handler: KeyEventHandler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Removes a subscriber. Returns `false` if it was not subscribed.
    pub(crate) fn unsubscribe(&self, handler: &KeyEventHandler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        handlers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Delivers a keystroke to all subscribers and returns whether any of them
    /// marked it handled. No event is built when nobody is subscribed.
    pub(crate) fn dispatch(
        &self,
        packet: &RawKeyPacket,
        device: Arc<KeyboardDevice>,
        msg: WindowsProcessMessage,
    ) -> bool {
        if self.handlers.borrow().is_empty() {
            return false;
        }

        // Subscribers may (un)subscribe from within their callback.
        let handlers = self.handlers.borrow().clone();
        let mut event = KeyEvent::new(packet, device, InputOrigin::from_wparam(msg.wparam()));
        for handler in &handlers {
            handler(&mut event);
        }

        trace!(
            device = %event.device().handle(),
            key = ?event.key(),
            state = %event.state(),
            handled = event.is_handled(),
            "Dispatched key event"
        );
        event.is_handled()
    }
}

fn same_handler(a: &KeyEventHandler, b: &KeyEventHandler) -> bool {
    ::std::ptr::eq(Rc::as_ptr(a) as *const u8, Rc::as_ptr(b) as *const u8)
}
