//! TDSR - Terminal-based screen reader
//!
//! A console-based screen reader for *nix systems (macOS, Linux, FreeBSD).
//! Sits between the user's terminal and a shell on a PTY, speaking output
//! through an external speech server and offering a review cursor for
//! reading any part of the screen.

pub mod clipboard;
pub mod error;
pub mod input;
pub mod plugins;
pub mod review;
pub mod speech;
pub mod state;
pub mod symbols;
pub mod terminal;

pub use error::{Result, TdsrError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "tdsr";
