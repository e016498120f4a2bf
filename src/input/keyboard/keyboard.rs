//! The raw keyboard pipeline: registration, message routing, device tracking
//! and key event subscriptions.

use ::std::{
    cell::{Cell, RefCell},
    fmt::{self, Write},
    sync::Arc,
};
use ::tracing::{debug, error, trace, warn};

use super::{
    decode, DeviceRegistry, Dispatcher, KeyCode, KeyEventHandler, KeyStates, KeyboardDevice,
};
use crate::{
    errors::{Context, ErrorKind, Result},
    platform::RawInputSource,
    types::{
        CaptureMode, DeviceHandle, NotificationHandle, RawInputHandle, WindowHandle,
        WindowsProcessMessage, GIDC_ARRIVAL, GIDC_REMOVAL, WM_INPUT, WM_INPUT_DEVICE_CHANGE,
    },
};

/// A builder pattern object which configures and constructs a
/// [`RawKeyboard`].
///
/// ```
/// use ::rawkeys::{input::keyboard::Builder, types::CaptureMode};
///
/// let builder = Builder::new()
///     .with_capture_mode(CaptureMode::Background)
///     .with_device_notifications(false);
/// assert_eq!(builder.capture_mode(), CaptureMode::Background);
/// assert!(!builder.device_notifications());
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    capture_mode: CaptureMode,
    device_notifications: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Construct a new builder. Default values will be used for all properties
    /// until explicitly set.
    pub fn new() -> Self {
        Self {
            capture_mode: CaptureMode::Foreground,
            device_notifications: true,
        }
    }

    /// Set whether input is captured only while the target window has focus.
    ///
    /// Defaults to [`CaptureMode::Foreground`] if not set.
    pub fn with_capture_mode(self, capture_mode: CaptureMode) -> Self {
        Self {
            capture_mode,
            ..self
        }
    }

    /// Set whether the target window is also registered for HID device
    /// interface notifications. Raw input device change notifications are
    /// always requested.
    ///
    /// Defaults to `true` if not set.
    pub fn with_device_notifications(self, device_notifications: bool) -> Self {
        Self {
            device_notifications,
            ..self
        }
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    pub fn device_notifications(&self) -> bool {
        self.device_notifications
    }

    /// Registers `target` for raw keyboard input and builds the pipeline.
    ///
    /// Fails with [`ErrorKind::Registration`] if any registration fails, in
    /// which case registrations already made are released again.
    pub fn build<S>(&self, source: S, target: impl Into<WindowHandle>) -> Result<RawKeyboard<S>>
    where
        S: RawInputSource,
    {
        RawKeyboard::new(
            source,
            target.into(),
            self.capture_mode,
            self.device_notifications,
        )
    }
}

/// Per-device keyboard input for one target window.
///
/// The host passes every window message of the target (or of its thread's
/// message loop) to [`route`]. `WM_INPUT_DEVICE_CHANGE` refreshes the device
/// list; `WM_INPUT` is decoded into a [`KeyEvent`] and delivered to all
/// subscribers. When a subscriber marks the event handled, [`route`] returns
/// `true` and the queued `WM_KEYDOWN`/`WM_KEYUP` for the keystroke has been
/// removed from the thread's message queue.
///
/// Registrations are released by [`close`] or, at the latest, when the
/// [`RawKeyboard`] is dropped.
///
/// A [`RawKeyboard`] is `!Sync` and must be driven from the thread which
/// receives the target window's messages.
///
/// [`route`]: Self::route
/// [`close`]: Self::close
/// [`KeyEvent`]: crate::input::keyboard::KeyEvent
pub struct RawKeyboard<S>
where
    S: RawInputSource,
{
    source: S,
    target: WindowHandle,
    capture_mode: CaptureMode,
    registry: DeviceRegistry,
    dispatcher: Dispatcher,
    key_states: RefCell<KeyStates>,
    /// `true` while the raw input registration is held.
    raw_input_registered: Cell<bool>,
    /// Device interface notification registration, if held.
    notification: Cell<Option<NotificationHandle>>,
}

impl<S> RawKeyboard<S>
where
    S: RawInputSource,
{
    fn new(
        source: S,
        target: WindowHandle,
        capture_mode: CaptureMode,
        device_notifications: bool,
    ) -> Result<Self> {
        debug!(?target, %capture_mode, "Registering for raw keyboard input");
        source
            .register_raw_input(target, capture_mode)
            .context("Failed to register raw input device(s)")
            .kind(ErrorKind::Registration)?;

        let notification = if device_notifications {
            let registered = source
                .register_device_notifications(target)
                .context("Failed to register for device notifications")
                .kind(ErrorKind::Registration);
            match registered {
                Ok(handle) => Some(handle),
                Err(e) => {
                    if let Err(undo) = source.unregister_raw_input() {
                        error!(error = %undo, "Failed to release raw input registration");
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        let this = Self {
            source,
            target,
            capture_mode,
            registry: DeviceRegistry::new(),
            dispatcher: Dispatcher::default(),
            key_states: RefCell::new(KeyStates::new()),
            raw_input_registered: Cell::new(true),
            notification: Cell::new(notification),
        };

        // A failed initial enumeration is retried on the next device change.
        if let Err(e) = this.refresh_devices() {
            warn!(error = %e, "Initial keyboard enumeration failed");
        }

        Ok(this)
    }

    /// Handles a window message.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if the message carried a keystroke which a subscriber
    /// marked handled. Returns `false` for every other message, including
    /// undecodable records and keystrokes from unknown devices.
    pub fn route(&self, msg: WindowsProcessMessage) -> bool {
        match msg.identifier() {
            WM_INPUT_DEVICE_CHANGE => {
                self.on_device_change(msg);
                false
            }
            WM_INPUT => self.process_raw_input(msg),
            _ => false,
        }
    }

    /// Convenience form of [`route`] taking the raw message parameters.
    ///
    /// [`route`]: Self::route
    pub fn handle_message(&self, umsg: u32, wparam: usize, lparam: isize) -> bool {
        self.route(WindowsProcessMessage::new(umsg, wparam, lparam))
    }

    /// Re-reads the system device list. Returns the number of known devices,
    /// including the global keyboard.
    pub fn refresh_devices(&self) -> Result<usize> {
        let count = self.registry.enumerate(&self.source)?;
        self.key_states
            .borrow_mut()
            .retain(|device| self.registry.contains(device));
        Ok(count)
    }

    /// Subscribes to key events. Returns `false` if the handler was already
    /// subscribed.
    pub fn subscribe(&self, handler: KeyEventHandler) -> bool {
        self.dispatcher.subscribe(handler)
    }

    /// Removes a subscription. Returns `false` if the handler was not
    /// subscribed.
    pub fn unsubscribe(&self, handler: &KeyEventHandler) -> bool {
        self.dispatcher.unsubscribe(handler)
    }

    pub fn subscriber_count(&self) -> usize {
        self.dispatcher.len()
    }

    /// The number of known keyboards, including the global keyboard.
    pub fn device_count(&self) -> usize {
        self.registry.count()
    }

    /// A snapshot of the known keyboards, ordered by handle.
    pub fn devices(&self) -> Vec<Arc<KeyboardDevice>> {
        self.registry.devices()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns `true` if the key is held on the given keyboard.
    pub fn is_key_pressed(&self, device: DeviceHandle, key: KeyCode) -> bool {
        self.key_states.borrow().is_key_pressed(device, key)
    }

    /// All keys held on the given keyboard.
    pub fn pressed_keys(&self, device: DeviceHandle) -> Vec<KeyCode> {
        self.key_states.borrow().pressed_keys(device)
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    pub fn target(&self) -> WindowHandle {
        self.target
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns `true` until [`close`] has released the registrations.
    ///
    /// [`close`]: Self::close
    pub fn is_registered(&self) -> bool {
        self.raw_input_registered.get() || self.notification.get().is_some()
    }

    /// A multi-line description of every known keyboard and its raw device
    /// metadata, for troubleshooting. Query failures are written into the
    /// text.
    pub fn diagnostics_dump(&self) -> String {
        let mut dump = String::new();
        // Writing into a `String` cannot fail.
        let _ = self.write_diagnostics(&mut dump);
        dump
    }

    /// Releases the raw input and device notification registrations. Calling
    /// [`close`] again, or dropping afterwards, does nothing.
    ///
    /// Both registrations are always attempted; the first failure is returned.
    ///
    /// [`close`]: Self::close
    pub fn close(&self) -> Result<()> {
        let mut result = Ok(());

        if let Some(handle) = self.notification.take() {
            debug!(?handle, "Unregistering device notifications");
            result = self
                .source
                .unregister_device_notifications(handle)
                .context("Failed to unregister device notifications")
                .kind(ErrorKind::Unregistration);
        }

        if self.raw_input_registered.replace(false) {
            debug!(target = ?self.target, "Unregistering raw keyboard input");
            let unregistered = self
                .source
                .unregister_raw_input()
                .context("Failed to unregister raw keyboard input")
                .kind(ErrorKind::Unregistration);
            result = result.and(unregistered);
        }

        result
    }

    fn on_device_change(&self, msg: WindowsProcessMessage) {
        match msg.wparam() {
            GIDC_ARRIVAL => trace!(device = msg.lparam(), "Keyboard device arrived"),
            GIDC_REMOVAL => trace!(device = msg.lparam(), "Keyboard device removed"),
            _ => trace!("Input device change"),
        }

        if let Err(e) = self.refresh_devices() {
            warn!(error = %e, "Failed to refresh keyboard devices");
        }
    }

    fn process_raw_input(&self, msg: WindowsProcessMessage) -> bool {
        let packet = match decode(&self.source, &self.registry, RawInputHandle(msg.lparam())) {
            Ok(Some(packet)) => packet,
            Ok(None) => return false,
            Err(e) => {
                debug!(error = %e, "Error getting the raw input buffer");
                return false;
            }
        };

        let Some(device) = self.registry.lookup(packet.device) else {
            debug!(device = %packet.device, "Handle was not in the device list");
            return false;
        };

        self.key_states.borrow_mut().process_packet(&packet);

        let handled = self.dispatcher.dispatch(&packet, device, msg);
        if handled {
            self.source.drain_key_messages();
        }
        handled
    }

    fn write_diagnostics(&self, out: &mut impl Write) -> fmt::Result {
        for device in self.registry.devices() {
            write!(out, "{device}")?;
            if device.is_global() {
                writeln!(out, "No raw input metadata for the global keyboard")?;
                continue;
            }
            match self.source.device_info(device.handle()) {
                Ok(info) => write!(out, "{info}")?,
                Err(e) => writeln!(out, "Device info unavailable: {e}")?,
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl<S> Drop for RawKeyboard<S>
where
    S: RawInputSource,
{
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(error = %e, "Failed to release raw keyboard registrations");
        }
    }
}

#[cfg(windows)]
impl RawKeyboard<crate::platform::win32::Win32RawInput> {
    /// Registers the given window for raw keyboard input using the Win32 API.
    pub fn for_window(
        hwnd: ::windows::Win32::Foundation::HWND,
        capture_mode: CaptureMode,
    ) -> Result<Self> {
        Builder::new()
            .with_capture_mode(capture_mode)
            .build(crate::platform::win32::Win32RawInput::new(), hwnd)
    }
}
