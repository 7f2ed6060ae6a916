//! Speech output: accumulation buffer and the speech server driver

pub mod buffer;
pub mod synth;

pub use buffer::{SpeechBuffer, SpeechTap};
pub use synth::{default_server_command, ServerSynth, Synth};
