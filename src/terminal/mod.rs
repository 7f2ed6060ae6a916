//! Terminal handling: PTY host, screen grid, and the VT emulator

pub mod cell;
pub mod emulator;
pub mod performer;
pub mod pty;
pub mod screen;
pub mod util;

pub use cell::{Cell, CellAttrs};
pub use emulator::Emulator;
pub use pty::Pty;
pub use screen::Screen;
pub use util::{fd_readable, restore_termios, set_raw_mode, terminal_size};
