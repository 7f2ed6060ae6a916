//! Configuration menu
//!
//! Single-character commands adjust speech settings in place:
//! r/v/V collect a numeric rate, volume, or voice index; d collects the
//! cursor delay in milliseconds; p/e/c/l/s toggle switches. Enter leaves
//! the menu. Toggles persist immediately in canonical form.

use super::buffer_handler::{BufferHandler, ValueTarget};
use super::handler::{HandlerAction, KeyHandler};
use crate::state::State;
use crate::terminal::Screen;
use crate::Result;

pub struct ConfigHandler;

impl ConfigHandler {
    pub fn new() -> Self {
        Self
    }

    fn toggle(
        state: &mut State,
        key: &str,
        default: bool,
        on: &str,
        off: &str,
    ) -> Result<()> {
        let value = !state.config.get_bool("speech", key, default);
        state.config.set_bool("speech", key, value);
        state.config.save()?;
        state.say(if value { on } else { off }, false)
    }

    fn prompt_value(state: &mut State, label: &str, target: ValueTarget) -> Result<HandlerAction> {
        state.say(label, false)?;
        Ok(HandlerAction::Push(Box::new(BufferHandler::new(target))))
    }
}

impl Default for ConfigHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyHandler for ConfigHandler {
    fn process(
        &mut self,
        key: &[u8],
        state: &mut State,
        _screen: &Screen,
    ) -> Result<HandlerAction> {
        match key {
            b"r" => Self::prompt_value(state, "Rate", ValueTarget::Rate),
            b"v" => Self::prompt_value(state, "volume", ValueTarget::Volume),
            b"V" => Self::prompt_value(state, "voice index", ValueTarget::VoiceIndex),
            b"d" => Self::prompt_value(state, "Cursor delay", ValueTarget::CursorDelay),

            b"p" => {
                Self::toggle(
                    state,
                    "process_symbols",
                    false,
                    "process symbols on",
                    "process symbols off",
                )?;
                Ok(HandlerAction::Consumed)
            }
            b"e" => {
                Self::toggle(
                    state,
                    "key_echo",
                    true,
                    "character echo on",
                    "character echo off",
                )?;
                Ok(HandlerAction::Consumed)
            }
            b"c" => {
                Self::toggle(
                    state,
                    "cursor_tracking",
                    true,
                    "cursor tracking on",
                    "cursor tracking off",
                )?;
                Ok(HandlerAction::Consumed)
            }
            b"l" => {
                Self::toggle(
                    state,
                    "line_pause",
                    true,
                    "line pause on",
                    "line pause off",
                )?;
                Ok(HandlerAction::Consumed)
            }
            b"s" => {
                Self::toggle(
                    state,
                    "repeated_symbols",
                    false,
                    "repeated symbols on",
                    "repeated symbols off",
                )?;
                Ok(HandlerAction::Consumed)
            }

            b"\r" | b"\n" => {
                state.say("exit", false)?;
                Ok(HandlerAction::Pop)
            }
            _ => Ok(HandlerAction::Consumed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn toggles_flip_and_persist() {
        let (mut state, lines, dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = ConfigHandler::new();

        handler.process(b"p", &mut state, &screen).unwrap();
        assert!(state.config.process_symbols());
        assert_eq!(
            lines.lock().unwrap().last().unwrap(),
            "sprocess symbols on\n"
        );

        handler.process(b"p", &mut state, &screen).unwrap();
        assert!(!state.config.process_symbols());

        // The change landed on disk, in canonical form.
        let reloaded = Config::load_from(dir.path().join("tdsr.cfg")).unwrap();
        assert_eq!(
            reloaded.get_string("speech", "process_symbols", ""),
            "false"
        );
    }

    #[test]
    fn value_keys_push_an_entry_handler() {
        let (mut state, lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = ConfigHandler::new();

        let action = handler.process(b"r", &mut state, &screen).unwrap();
        assert!(matches!(action, HandlerAction::Push(_)));
        assert_eq!(lines.lock().unwrap().last().unwrap(), "sRate\n");
    }

    #[test]
    fn enter_exits_the_menu() {
        let (mut state, lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = ConfigHandler::new();

        let action = handler.process(b"\r", &mut state, &screen).unwrap();
        assert!(matches!(action, HandlerAction::Pop));
        assert_eq!(lines.lock().unwrap().last().unwrap(), "sexit\n");
    }

    #[test]
    fn unrecognized_keys_stay_in_the_menu() {
        let (mut state, _lines, _dir) = test_state();
        let screen = Screen::new(20, 5);
        let mut handler = ConfigHandler::new();

        let action = handler.process(b"z", &mut state, &screen).unwrap();
        assert!(matches!(action, HandlerAction::Consumed));
    }
}
