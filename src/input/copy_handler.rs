//! Copy menu
//!
//! One key, one copy: `l` puts the review line on the clipboard, `s`
//! the whole screen. Anything else is announced as unknown. The menu
//! pops after the first key either way.

use super::handler::{HandlerAction, KeyHandler};
use crate::state::{region_text, State};
use crate::terminal::Screen;
use crate::Result;
use log::error;

pub struct CopyHandler;

impl CopyHandler {
    pub fn new() -> Self {
        Self
    }

    fn copy_region(
        state: &mut State,
        screen: &Screen,
        start_y: u16,
        start_x: u16,
        end_y: u16,
        end_x: u16,
        announce: &str,
    ) -> Result<()> {
        let text = region_text(screen, start_y, start_x, end_y, end_x);
        match crate::clipboard::copy_to_clipboard(&text) {
            Ok(()) => state.say(announce, false),
            Err(e) => {
                error!("Copy failed: {}", e);
                state.say("Failed", false)
            }
        }
    }
}

impl Default for CopyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyHandler for CopyHandler {
    fn process(
        &mut self,
        key: &[u8],
        state: &mut State,
        screen: &Screen,
    ) -> Result<HandlerAction> {
        let last_col = screen.cols().saturating_sub(1);
        match key {
            b"l" => {
                let y = state.review.pos.1;
                Self::copy_region(state, screen, y, 0, y, last_col, "line")?;
            }
            b"s" => {
                let last_row = screen.rows().saturating_sub(1);
                Self::copy_region(state, screen, 0, 0, last_row, last_col, "screen")?;
            }
            _ => {
                state.say("unknown key", false)?;
            }
        }
        Ok(HandlerAction::Pop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::synth::testing::RecordingSynth;
    use crate::state::config::Config;
    use crate::state::State;
    use crate::terminal::Screen;
    use tempfile::TempDir;

    #[test]
    fn any_key_pops_the_menu() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("tdsr.cfg")).unwrap();
        let (synth, lines) = RecordingSynth::new();
        let mut state = State::new(20, 5, config, synth).unwrap();
        let screen = Screen::new(20, 5);
        let mut handler = CopyHandler::new();

        let action = handler.process(b"q", &mut state, &screen).unwrap();
        assert!(matches!(action, HandlerAction::Pop));
        assert_eq!(lines.lock().unwrap().last().unwrap(), "sunknown key\n");
    }
}
