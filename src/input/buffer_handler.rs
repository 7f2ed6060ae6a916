//! Numeric entry for the config menu
//!
//! Collects typed bytes as UTF-8 until Enter, then parses the value and
//! applies it to whichever setting the config menu asked for. Bad input
//! is announced and nothing is persisted.

use super::handler::{HandlerAction, KeyHandler};
use crate::state::State;
use crate::terminal::Screen;
use crate::Result;
use log::debug;

/// Which setting the collected value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTarget {
    Rate,
    Volume,
    VoiceIndex,
    /// Entered in milliseconds, stored in seconds.
    CursorDelay,
}

pub struct BufferHandler {
    buffer: String,
    target: ValueTarget,
}

impl BufferHandler {
    pub fn new(target: ValueTarget) -> Self {
        Self {
            buffer: String::new(),
            target,
        }
    }

    fn apply(&self, state: &mut State) -> Result<()> {
        let value: i32 = match self.buffer.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                debug!("Rejected value {:?} for {:?}", self.buffer, self.target);
                return state.say("Invalid value", false);
            }
        };

        match self.target {
            ValueTarget::Rate => {
                state.synth.set_rate(value)?;
                state.config.set("speech", "rate", &value.to_string());
            }
            ValueTarget::Volume => {
                state.synth.set_volume(value)?;
                state.config.set("speech", "volume", &value.to_string());
            }
            ValueTarget::VoiceIndex => {
                state.synth.set_voice_idx(value)?;
                state.config.set("speech", "voice_idx", &value.to_string());
            }
            ValueTarget::CursorDelay => {
                let seconds = value as f32 / 1000.0;
                state.config.set_cursor_delay(seconds);
            }
        }
        state.config.save()?;
        state.say("Confirmed", false)
    }
}

impl KeyHandler for BufferHandler {
    fn process(
        &mut self,
        key: &[u8],
        state: &mut State,
        _screen: &Screen,
    ) -> Result<HandlerAction> {
        match key {
            b"\r" | b"\n" => {
                self.apply(state)?;
                Ok(HandlerAction::Pop)
            }
            b"\x08" | b"\x7f" => {
                self.buffer.pop();
                Ok(HandlerAction::Consumed)
            }
            _ => {
                if let Ok(s) = std::str::from_utf8(key) {
                    self.buffer.push_str(s);
                }
                Ok(HandlerAction::Consumed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::HandlerAction;
    use crate::speech::synth::testing::RecordingSynth;
    use crate::state::config::Config;
    use crate::state::State;
    use crate::terminal::Screen;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn test_state() -> (State, Arc<Mutex<Vec<String>>>, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("tdsr.cfg")).unwrap();
        let (synth, lines) = RecordingSynth::new();
        let state = State::new(20, 5, config, synth).unwrap();
        (state, lines, dir)
    }

    #[test]
    fn collects_digits_and_applies_on_enter() {
        let (mut state, lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = BufferHandler::new(ValueTarget::Rate);

        assert!(matches!(
            handler.process(b"7", &mut state, &screen).unwrap(),
            HandlerAction::Consumed
        ));
        handler.process(b"0", &mut state, &screen).unwrap();
        let action = handler.process(b"\r", &mut state, &screen).unwrap();

        assert!(matches!(action, HandlerAction::Pop));
        let sent = lines.lock().unwrap();
        assert!(sent.contains(&"r70\n".to_string()));
        assert_eq!(sent.last().unwrap(), "sConfirmed\n");
        assert_eq!(state.config.rate(), Some(70));
    }

    #[test]
    fn backspace_edits_the_entry() {
        let (mut state, lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = BufferHandler::new(ValueTarget::Volume);

        handler.process(b"9", &mut state, &screen).unwrap();
        handler.process(b"9", &mut state, &screen).unwrap();
        handler.process(b"\x7f", &mut state, &screen).unwrap();
        handler.process(b"\r", &mut state, &screen).unwrap();

        assert!(lines.lock().unwrap().contains(&"v9\n".to_string()));
    }

    #[test]
    fn invalid_input_announces_and_persists_nothing() {
        let (mut state, lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = BufferHandler::new(ValueTarget::Rate);

        handler.process(b"x", &mut state, &screen).unwrap();
        let action = handler.process(b"\r", &mut state, &screen).unwrap();

        assert!(matches!(action, HandlerAction::Pop));
        assert_eq!(lines.lock().unwrap().last().unwrap(), "sInvalid value\n");
        assert_eq!(state.config.rate(), None);
    }

    #[test]
    fn cursor_delay_is_stored_in_seconds() {
        let (mut state, _lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = BufferHandler::new(ValueTarget::CursorDelay);

        handler.process(b"300", &mut state, &screen).unwrap();
        handler.process(b"\r", &mut state, &screen).unwrap();

        assert_eq!(
            state.config.cursor_delay(),
            std::time::Duration::from_secs_f32(0.3)
        );
    }
}
