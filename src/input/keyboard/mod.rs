//! Input and state handling for raw keyboard events.

mod codes;
mod device;
mod event;
mod keyboard;
mod normalize;
mod packet;
mod state;

pub use codes::*;
pub use device::*;
pub(crate) use event::Dispatcher;
pub use event::{InputOrigin, KeyEvent, KeyEventHandler, KeyState};
pub use keyboard::*;
pub use normalize::normalize;
pub use packet::*;
pub use state::KeyStates;
