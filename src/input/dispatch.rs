//! Root key dispatcher
//!
//! Matches exact byte sequences against the keymap, recognizes
//! double presses within the repeat window, and executes the bound
//! command. Unbound input passes through to the child untouched.

use super::handler::{HandlerAction, KeyHandler};
use super::keymap::{KeyAction, Keymap};
use crate::state::State;
use crate::terminal::Screen;
use crate::Result;
use log::debug;
use std::time::{Duration, Instant};

/// Two presses of the same key within this window select the double
/// binding, when one exists.
pub const REPEAT_KEY_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RootDispatcher {
    keymap: Keymap,
    last_key: Option<Vec<u8>>,
    last_key_time: Option<Instant>,
}

impl RootDispatcher {
    pub fn new(keymap: Keymap) -> Self {
        debug!("Root dispatcher with {} bindings", keymap.len());
        Self {
            keymap,
            last_key: None,
            last_key_time: None,
        }
    }

    /// Decide which binding a chunk selects at time `now`.
    ///
    /// `None` means unbound input. A repeat of the previous key within
    /// the window selects the concatenated double binding when the
    /// keymap has one; otherwise the single binding fires again.
    pub fn resolve(&mut self, key: &[u8], now: Instant) -> Option<KeyAction> {
        let delta = self.last_key_time.map(|t| now.duration_since(t));
        self.last_key_time = Some(now);

        if !self.keymap.contains_key(key) {
            self.last_key = Some(key.to_vec());
            return None;
        }

        let is_repeat = self.last_key.as_deref() == Some(key)
            && delta.map(|d| d <= REPEAT_KEY_TIMEOUT).unwrap_or(false);
        self.last_key = Some(key.to_vec());

        if is_repeat {
            let mut doubled = key.to_vec();
            doubled.extend_from_slice(key);
            if let Some(action) = self.keymap.get(&doubled) {
                return Some(action.clone());
            }
        }
        self.keymap.get(key).cloned()
    }

    fn execute(
        &mut self,
        action: KeyAction,
        state: &mut State,
        screen: &Screen,
    ) -> Result<HandlerAction> {
        use KeyAction::*;

        match action {
            PrevLine => state.prev_line(screen)?,
            SayLine => state.current_line(screen)?,
            NextLine => state.next_line(screen)?,

            PrevWord => state.prev_word(screen)?,
            SayWord => state.say_word(screen, false)?,
            SpellWord => state.say_word(screen, true)?,
            NextWord => state.next_word(screen)?,

            PrevChar => state.prev_char(screen)?,
            SayChar => state.current_char(screen, false)?,
            SayCharPhonetic => state.current_char(screen, true)?,
            NextChar => state.next_char(screen)?,

            TopOfScreen => state.top_of_screen(screen)?,
            BottomOfScreen => state.bottom_of_screen(screen)?,
            StartOfLine => state.start_of_line(screen)?,
            EndOfLine => state.end_of_line(screen)?,

            ConfigMenu => {
                state.say("config", false)?;
                return Ok(HandlerAction::Push(Box::new(
                    super::config_handler::ConfigHandler::new(),
                )));
            }
            CopyMenu => {
                state.say("copy", false)?;
                return Ok(HandlerAction::Push(Box::new(
                    super::copy_handler::CopyHandler::new(),
                )));
            }
            ToggleQuiet => {
                let quiet = state.toggle_quiet();
                state.say(if quiet { "quiet on" } else { "quiet off" }, false)?;
            }
            Clipboard => state.handle_clipboard(screen)?,
            Silence => state.silence()?,

            // Cursor keys go to the child; the new cursor line or
            // character is read once the cursor has settled.
            ArrowUp | ArrowDown => {
                if state.config.cursor_tracking() {
                    let delay = state.config.cursor_delay();
                    state.schedule(delay, true, |st, sc| {
                        let y = sc.cursor.1;
                        st.say_line(sc, y)
                    });
                }
                return Ok(HandlerAction::Passthrough);
            }
            ArrowLeft | ArrowRight => {
                if state.config.cursor_tracking() {
                    let delay = state.config.cursor_delay();
                    state.schedule(delay, true, |st, sc| {
                        let (x, y) = sc.cursor;
                        let x = x.min(sc.cols().saturating_sub(1));
                        st.say_char_at(sc, y, x, false)
                    });
                }
                return Ok(HandlerAction::Passthrough);
            }

            // Speak what is about to be erased, then let the child do it.
            BackspaceEcho => {
                let (x, y) = screen.cursor;
                if x > 0 {
                    state.say_char_at(screen, y, x - 1, false)?;
                }
                return Ok(HandlerAction::Passthrough);
            }
            DeleteEcho => {
                let (x, y) = screen.cursor;
                let x = x.min(screen.cols().saturating_sub(1));
                state.say_char_at(screen, y, x, false)?;
                return Ok(HandlerAction::Passthrough);
            }

            Plugin(name) => state.run_plugin(&name, screen)?,
        }

        Ok(HandlerAction::Consumed)
    }
}

impl KeyHandler for RootDispatcher {
    fn process(
        &mut self,
        key: &[u8],
        state: &mut State,
        screen: &Screen,
    ) -> Result<HandlerAction> {
        match self.resolve(key, Instant::now()) {
            Some(action) => {
                debug!("Key action: {:?}", action);
                self.execute(action, state, screen)
            }
            None => Ok(HandlerAction::Passthrough),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::keymap::{default_keymap, KeyAction};
    use super::*;

    fn dispatcher() -> RootDispatcher {
        RootDispatcher::new(default_keymap())
    }

    #[test]
    fn unbound_input_is_unresolved() {
        let mut d = dispatcher();
        let t = Instant::now();
        assert_eq!(d.resolve(b"a", t), None);
        assert_eq!(d.resolve(b"\x1bZ", t), None);
    }

    #[test]
    fn single_binding_resolves() {
        let mut d = dispatcher();
        let t = Instant::now();
        assert_eq!(d.resolve(b"\x1bi", t), Some(KeyAction::SayLine));
    }

    #[test]
    fn fast_repeat_selects_double_binding() {
        let mut d = dispatcher();
        let t = Instant::now();
        assert_eq!(d.resolve(b"\x1bk", t), Some(KeyAction::SayWord));
        assert_eq!(
            d.resolve(b"\x1bk", t + Duration::from_millis(400)),
            Some(KeyAction::SpellWord)
        );
    }

    #[test]
    fn repeat_at_window_edge_still_doubles() {
        let mut d = dispatcher();
        let t = Instant::now();
        d.resolve(b"\x1b,", t);
        assert_eq!(
            d.resolve(b"\x1b,", t + Duration::from_millis(500)),
            Some(KeyAction::SayCharPhonetic)
        );
    }

    #[test]
    fn slow_repeat_selects_single_binding_twice() {
        let mut d = dispatcher();
        let t = Instant::now();
        assert_eq!(d.resolve(b"\x1b,", t), Some(KeyAction::SayChar));
        assert_eq!(
            d.resolve(b"\x1b,", t + Duration::from_millis(600)),
            Some(KeyAction::SayChar)
        );
    }

    #[test]
    fn fast_repeat_without_double_binding_stays_single() {
        let mut d = dispatcher();
        let t = Instant::now();
        assert_eq!(d.resolve(b"\x1bu", t), Some(KeyAction::PrevLine));
        assert_eq!(
            d.resolve(b"\x1bu", t + Duration::from_millis(100)),
            Some(KeyAction::PrevLine)
        );
    }

    #[test]
    fn interleaved_key_breaks_the_repeat() {
        let mut d = dispatcher();
        let t = Instant::now();
        d.resolve(b"\x1bk", t);
        d.resolve(b"\x1bi", t + Duration::from_millis(100));
        assert_eq!(
            d.resolve(b"\x1bk", t + Duration::from_millis(200)),
            Some(KeyAction::SayWord)
        );
    }

    #[test]
    fn unknown_key_still_counts_for_repeat_state() {
        let mut d = dispatcher();
        let t = Instant::now();
        d.resolve(b"\x1bk", t);
        d.resolve(b"z", t + Duration::from_millis(50));
        // The 'z' replaced the remembered key, so this is not a repeat.
        assert_eq!(
            d.resolve(b"\x1bk", t + Duration::from_millis(100)),
            Some(KeyAction::SayWord)
        );
    }
}
