//! Input handling
//!
//! A stack of modal handlers decides what each chunk of user input
//! means. The root dispatcher at the bottom maps ESC-prefixed commands;
//! the config and copy menus stack on top of it while they are open.

pub mod buffer_handler;
pub mod config_handler;
pub mod copy_handler;
pub mod dispatch;
pub mod handler;
pub mod keymap;

pub use dispatch::{RootDispatcher, REPEAT_KEY_TIMEOUT};
pub use handler::{HandlerAction, HandlerStack, KeyHandler};
pub use keymap::{add_binding, default_keymap, KeyAction, Keymap};
