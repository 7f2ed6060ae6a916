//! VTE performer
//!
//! Interprets the decoded control stream: updates the screen grid and
//! writes drawn text through the speech tap. This is where the screen
//! reader deviates from a stock emulator — echoed keystrokes are routed
//! to character speech, cursor jumps become word breaks, and the
//! alternate screen is snapshotted so review survives full-screen
//! programs.

use super::cell::{Cell, CellAttrs};
use super::Screen;
use crate::speech::SpeechTap;
use log::trace;
use unicode_width::UnicodeWidthChar;
use vte::{Params, Perform};

pub struct ScreenPerformer<'a> {
    pub screen: &'a mut Screen,
    pub tap: &'a mut SpeechTap,
}

/// First value of the nth parameter, or a default.
fn param(params: &Params, idx: usize, default: u16) -> u16 {
    params
        .iter()
        .nth(idx)
        .and_then(|p| p.first().copied())
        .unwrap_or(default)
}

impl ScreenPerformer<'_> {
    /// Append a combining mark to the cell holding its base character,
    /// which sits left of the cursor (possibly behind a wide filler).
    fn attach_combining(&mut self, c: char) {
        let (x, y) = self.screen.cursor;
        if x == 0 {
            return;
        }
        let cols = self.screen.cols();
        let mut x = (x - 1).min(cols.saturating_sub(1)) as usize;
        if let Some(row) = self.screen.buffer.get_mut(y as usize) {
            while x > 0 && row[x].is_wide_filler() {
                x -= 1;
            }
            row[x].data.push(c);
        }
    }

    /// Move the cursor down one row, scrolling within the margins when
    /// it sits on the bottom margin.
    fn cursor_down_or_scroll(&mut self) {
        let (_, bottom) = self.screen.scroll_bounds();
        let rows = self.screen.rows();
        if self.screen.cursor.1 == bottom {
            self.screen.scroll_up(1);
        } else if self.screen.cursor.1 < rows.saturating_sub(1) {
            self.screen.cursor.1 += 1;
        }
    }

    /// Move the cursor up one row, scrolling down within the margins when
    /// it sits on the top margin.
    fn cursor_up_or_scroll(&mut self) {
        let (top, _) = self.screen.scroll_bounds();
        if self.screen.cursor.1 == top {
            self.screen.scroll_down(1);
        } else if self.screen.cursor.1 > 0 {
            self.screen.cursor.1 -= 1;
        }
    }
}

impl Perform for ScreenPerformer<'_> {
    fn print(&mut self, c: char) {
        let (cols, rows) = self.screen.size;
        let width = match c.width() {
            Some(0) => {
                self.attach_combining(c);
                return;
            }
            Some(w) => w as u16,
            None => 1,
        };

        let mut utf8 = [0u8; 4];
        let grapheme: &str = c.encode_utf8(&mut utf8);

        // An echo of the key the user just typed is not news; it goes
        // through character speech when key echo is on, and never into
        // the buffer. Only the first grapheme after a keystroke can
        // match.
        let mut voiced = true;
        if !self.tap.last_key.is_empty() && self.tap.last_key == grapheme {
            voiced = false;
            if self.tap.key_echo {
                self.tap.echoes.push(grapheme.to_string());
            }
        }
        self.tap.last_key.clear();

        // A draw that skips two or more columns on the same row is a new
        // field; keep the words apart.
        if self.screen.cursor.1 == self.tap.last_drawn.1
            && self.screen.cursor.0 > self.tap.last_drawn.0 + 1
        {
            self.tap.buffer.push_str(" ");
        }

        // Deferred autowrap: the cursor parks one past the right margin
        // until the next character arrives.
        if self.screen.cursor.0 >= cols {
            self.screen.cursor.0 = 0;
            if self.screen.cursor.1 >= rows.saturating_sub(1) {
                self.screen.scroll_up(1);
            } else {
                self.screen.cursor.1 += 1;
            }
        }

        let (x, y) = self.screen.cursor;
        if y >= rows || x >= cols {
            return;
        }

        let pen = self.screen.pen;
        if let Some(row) = self.screen.buffer.get_mut(y as usize) {
            if let Some(cell) = row.get_mut(x as usize) {
                cell.data.clear();
                cell.data.push(c);
                cell.attrs = pen;
            }
            if width > 1 {
                if let Some(filler) = row.get_mut((x + 1) as usize) {
                    *filler = Cell::wide_filler();
                }
            }
        }

        self.screen.cursor.0 = x + width;

        if voiced && !self.tap.muted() {
            self.tap.buffer.push_str(grapheme);
            self.tap.last_drawn = (self.screen.cursor.0, y);
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            // Linefeed. With line pause the accumulated text becomes its
            // own utterance; otherwise a space keeps it flowing.
            b'\n' | b'\x0b' | b'\x0c' => {
                if self.tap.line_pause {
                    self.tap.buffer.line_break();
                } else {
                    self.tap.buffer.push_str(" ");
                }
                self.cursor_down_or_scroll();
            }
            b'\r' => {
                self.screen.cursor.0 = 0;
            }
            // Tab stops every 8 columns; spoken as a single space.
            b'\t' => {
                if !self.tap.quiet {
                    self.tap.buffer.push_str(" ");
                }
                let cols = self.screen.cols();
                let next = ((self.screen.cursor.0 / 8) + 1) * 8;
                self.screen.cursor.0 = next.min(cols.saturating_sub(1));
            }
            // Backspace erases the just-buffered character so corrected
            // typos are not spoken.
            b'\x08' => {
                if self.screen.cursor.0 > 0 {
                    if !self.tap.buffer.is_empty() {
                        self.tap.buffer.pop();
                    }
                    self.screen.cursor.0 -= 1;
                }
            }
            b'\x07' => {}
            _ => {
                trace!("Unhandled execute: 0x{:02x}", byte);
            }
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &Params,
        intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        let private = intermediates.first() == Some(&b'?');
        let cols = self.screen.cols();
        let rows = self.screen.rows();

        match action {
            'H' | 'f' => {
                let row = param(params, 0, 1).saturating_sub(1);
                let col = param(params, 1, 1).saturating_sub(1);
                self.screen.cursor = (
                    col.min(cols.saturating_sub(1)),
                    row.min(rows.saturating_sub(1)),
                );
            }
            'A' => {
                let n = param(params, 0, 1).max(1);
                self.screen.cursor.1 = self.screen.cursor.1.saturating_sub(n);
            }
            'B' => {
                let n = param(params, 0, 1).max(1);
                self.screen.cursor.1 =
                    (self.screen.cursor.1 + n).min(rows.saturating_sub(1));
            }
            'C' => {
                let n = param(params, 0, 1).max(1);
                self.screen.cursor.0 =
                    (self.screen.cursor.0 + n).min(cols.saturating_sub(1));
            }
            'D' => {
                let n = param(params, 0, 1).max(1);
                self.screen.cursor.0 = self.screen.cursor.0.saturating_sub(n);
            }
            'G' => {
                let col = param(params, 0, 1).saturating_sub(1);
                self.screen.cursor.0 = col.min(cols.saturating_sub(1));
            }
            'd' => {
                let row = param(params, 0, 1).saturating_sub(1);
                self.screen.cursor.1 = row.min(rows.saturating_sub(1));
            }

            'J' => match param(params, 0, 0) {
                0 => self.screen.clear_below(),
                1 => self.screen.clear_above(),
                2 => self.screen.clear(),
                // 3 asks for scrollback to be cleared; there is none.
                _ => {}
            },
            'K' => {
                let mode = param(params, 0, 0);
                let (x, y) = self.screen.cursor;
                if let Some(row) = self.screen.buffer.get_mut(y as usize) {
                    match mode {
                        0 => {
                            for cell in row.iter_mut().skip(x as usize) {
                                cell.clear();
                            }
                        }
                        1 => {
                            for cell in row.iter_mut().take(x as usize + 1) {
                                cell.clear();
                            }
                        }
                        2 => {
                            for cell in row.iter_mut() {
                                cell.clear();
                            }
                        }
                        _ => {}
                    }
                }
            }

            'S' => self.screen.scroll_up(param(params, 0, 1)),
            'T' => self.screen.scroll_down(param(params, 0, 1)),
            'L' => self.screen.insert_lines(param(params, 0, 1)),
            'M' => self.screen.delete_lines(param(params, 0, 1)),
            'P' => self.screen.delete_chars(param(params, 0, 1)),
            '@' => self.screen.insert_chars(param(params, 0, 1)),

            'r' if !private => {
                let top = param(params, 0, 1);
                let bottom = param(params, 1, rows);
                self.screen.set_margins(top, bottom);
            }

            'h' if private => {
                for p in params.iter() {
                    match p.first().copied().unwrap_or(0) {
                        1049 => self.screen.enter_alternate(),
                        // 132-column mode would resize under us; the host
                        // terminal did not actually change width.
                        3 => {}
                        _ => {}
                    }
                }
            }
            'l' if private => {
                for p in params.iter() {
                    match p.first().copied().unwrap_or(0) {
                        1049 => self.screen.leave_alternate(),
                        3 => {}
                        _ => {}
                    }
                }
            }

            'm' if !private => {
                if params.iter().next().is_none() {
                    self.screen.pen = CellAttrs::default();
                    return;
                }
                for p in params.iter() {
                    let code = p.first().copied().unwrap_or(0);
                    let pen = &mut self.screen.pen;
                    match code {
                        0 => *pen = CellAttrs::default(),
                        1 => pen.bold = true,
                        4 => pen.underline = true,
                        7 => pen.reverse = true,
                        22 => pen.bold = false,
                        24 => pen.underline = false,
                        27 => pen.reverse = false,
                        30..=37 => pen.fg = Some((code - 30) as u8),
                        39 => pen.fg = None,
                        40..=47 => pen.bg = Some((code - 40) as u8),
                        49 => pen.bg = None,
                        // Extended color introducers swallow the rest of
                        // the sequence; the palette is not tracked.
                        38 | 48 => break,
                        _ => {}
                    }
                }
            }
            'm' => {}

            _ => {
                trace!("Unhandled CSI: {:?} {}", intermediates, action);
            }
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            trace!("ESC with intermediates {:?} byte {}", intermediates, byte);
            return;
        }
        match byte {
            // DECSC / DECRC
            b'7' => {
                self.screen.saved_cursor = Some(self.screen.cursor);
            }
            b'8' => {
                if let Some(saved) = self.screen.saved_cursor {
                    self.screen.cursor = saved;
                }
            }
            // RI
            b'M' => self.cursor_up_or_scroll(),
            // IND
            b'D' => self.cursor_down_or_scroll(),
            // NEL
            b'E' => {
                self.screen.cursor.0 = 0;
                self.cursor_down_or_scroll();
            }
            _ => {
                trace!("Unhandled ESC: 0x{:02x}", byte);
            }
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}
    fn put(&mut self, _byte: u8) {}
    fn unhook(&mut self) {}
    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}
}

#[cfg(test)]
mod tests {
    use crate::speech::SpeechTap;
    use crate::terminal::Emulator;

    fn feed(emulator: &mut Emulator, tap: &mut SpeechTap, bytes: &[u8]) {
        emulator.feed(bytes, tap);
    }

    fn setup(cols: u16, rows: u16) -> (Emulator, SpeechTap) {
        (Emulator::new(cols, rows), SpeechTap::new())
    }

    #[test]
    fn plain_text_reaches_grid_and_buffer() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"Hi");

        assert_eq!(emulator.screen().cell_data(0, 0), Some("H"));
        assert_eq!(emulator.screen().cell_data(1, 0), Some("i"));
        assert_eq!(emulator.cursor(), (2, 0));
        assert_eq!(tap.buffer.contents(), "Hi");
    }

    #[test]
    fn wraps_at_right_edge() {
        let (mut emulator, mut tap) = setup(5, 3);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"ABCDE");
        // Wrap is deferred until the next character.
        assert_eq!(emulator.cursor(), (5, 0));

        feed(&mut emulator, &mut tap, b"F");
        assert_eq!(emulator.screen().cell_data(0, 1), Some("F"));
        assert_eq!(emulator.cursor(), (1, 1));
        assert_eq!(emulator.screen().line_trimmed(0), "ABCDE");
    }

    #[test]
    fn wrap_scrolls_at_bottom() {
        let (mut emulator, mut tap) = setup(5, 3);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"ABCDEFGHIJKLMNOP");

        assert_eq!(emulator.screen().line_trimmed(0), "FGHIJ");
        assert_eq!(emulator.screen().line_trimmed(1), "KLMNO");
        assert_eq!(emulator.screen().cell_data(0, 2), Some("P"));
        assert_eq!(emulator.cursor(), (1, 2));
    }

    #[test]
    fn crlf_moves_to_next_line_start() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"ab\r\ncd");
        assert_eq!(emulator.screen().line_trimmed(0), "ab");
        assert_eq!(emulator.screen().line_trimmed(1), "cd");
        assert_eq!(emulator.cursor(), (2, 1));
    }

    #[test]
    fn linefeed_without_pause_joins_with_space() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"hello\r\nworld\r\n");

        assert!(!tap.buffer.has_pending_lines());
        assert_eq!(tap.buffer.contents(), "hello world ");
    }

    #[test]
    fn linefeed_with_pause_queues_lines() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = true;

        feed(&mut emulator, &mut tap, b"hello\r\nworld\r\n");

        assert_eq!(tap.buffer.drain_lines(), vec!["hello", "world"]);
        assert!(tap.buffer.is_empty());
    }

    #[test]
    fn echoed_keystroke_skips_buffer_and_queues_echo() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;
        tap.key_echo = true;
        tap.last_key = "a".to_string();

        feed(&mut emulator, &mut tap, b"a");

        // The grid still gets the character; speech does not.
        assert_eq!(emulator.screen().cell_data(0, 0), Some("a"));
        assert!(tap.buffer.is_empty());
        assert_eq!(tap.echoes, vec!["a"]);
        assert!(tap.last_key.is_empty());
    }

    #[test]
    fn echo_suppression_applies_once() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;
        tap.key_echo = true;
        tap.last_key = "a".to_string();

        feed(&mut emulator, &mut tap, b"aa");

        // Only the first 'a' is the echo; the second is real output.
        assert_eq!(tap.echoes, vec!["a"]);
        assert_eq!(tap.buffer.contents(), "a");
    }

    #[test]
    fn echoed_keystroke_without_key_echo_is_silent() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;
        tap.key_echo = false;
        tap.last_key = "a".to_string();

        feed(&mut emulator, &mut tap, b"a");

        assert!(tap.buffer.is_empty());
        assert!(tap.echoes.is_empty());
    }

    #[test]
    fn cursor_jump_inserts_word_break() {
        let (mut emulator, mut tap) = setup(20, 5);
        tap.line_pause = false;

        // "ab", jump right, "cd" - right-aligned output must not read as
        // "abcd".
        feed(&mut emulator, &mut tap, b"ab\x1b[1;10Hcd");

        assert_eq!(tap.buffer.contents(), "ab cd");
    }

    #[test]
    fn adjacent_draws_do_not_break() {
        let (mut emulator, mut tap) = setup(20, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"ab\x1b[1;3Hcd");
        assert_eq!(tap.buffer.contents(), "abcd");
    }

    #[test]
    fn backspace_rewinds_speech() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"abc\x08");
        assert_eq!(tap.buffer.contents(), "ab");
        assert_eq!(emulator.cursor(), (2, 0));
    }

    #[test]
    fn tab_speaks_one_space() {
        let (mut emulator, mut tap) = setup(20, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"a\tb");
        // The tab itself is one space; landing 7 columns right of the
        // last draw adds the usual jump break as well.
        assert_eq!(tap.buffer.contents(), "a  b");
        assert_eq!(emulator.screen().cell_data(8, 0), Some("b"));
    }

    #[test]
    fn muted_draws_update_grid_only() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;
        tap.temp_muted = true;

        feed(&mut emulator, &mut tap, b"xyz");
        assert_eq!(emulator.screen().line_trimmed(0), "xyz");
        assert!(tap.buffer.is_empty());
    }

    #[test]
    fn wide_character_leaves_filler() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, "語x".as_bytes());

        assert_eq!(emulator.screen().cell_data(0, 0), Some("語"));
        assert_eq!(emulator.screen().cell_data(1, 0), Some(""));
        assert_eq!(emulator.screen().cell_data(2, 0), Some("x"));
        assert_eq!(tap.buffer.contents(), "語x");
    }

    #[test]
    fn combining_mark_joins_base_cell() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, "e\u{0301}".as_bytes());

        assert_eq!(emulator.screen().cell_data(0, 0), Some("e\u{0301}"));
        assert_eq!(emulator.cursor(), (1, 0));
    }

    #[test]
    fn alternate_screen_preserves_primary() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"shell out");
        let before = emulator.screen().line_trimmed(0);

        feed(&mut emulator, &mut tap, b"\x1b[?1049h");
        assert_eq!(emulator.screen().line_trimmed(0), "");
        feed(&mut emulator, &mut tap, b"editor");
        feed(&mut emulator, &mut tap, b"\x1b[?1049l");

        assert_eq!(emulator.screen().line_trimmed(0), before);
    }

    #[test]
    fn scrollback_erase_is_ignored() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"keep\x1b[3J");
        assert_eq!(emulator.screen().line_trimmed(0), "keep");

        feed(&mut emulator, &mut tap, b"\x1b[2J");
        assert_eq!(emulator.screen().line_trimmed(0), "");
    }

    #[test]
    fn margins_confine_linefeed_scroll() {
        let (mut emulator, mut tap) = setup(10, 6);
        tap.line_pause = false;

        // Rows 0..5 get letters, margins at rows 2-4, cursor to margin
        // bottom, then a linefeed scrolls only the region.
        for (y, ch) in [b"A", b"B", b"C", b"D", b"E", b"F"].iter().enumerate() {
            feed(
                &mut emulator,
                &mut tap,
                format!("\x1b[{};1H", y + 1).as_bytes(),
            );
            feed(&mut emulator, &mut tap, *ch);
        }
        feed(&mut emulator, &mut tap, b"\x1b[3;5r");
        feed(&mut emulator, &mut tap, b"\x1b[5;1H\n");

        assert_eq!(emulator.screen().cell_data(0, 0), Some("A"));
        assert_eq!(emulator.screen().cell_data(0, 1), Some("B"));
        assert_eq!(emulator.screen().cell_data(0, 2), Some("D"));
        assert_eq!(emulator.screen().cell_data(0, 3), Some("E"));
        assert_eq!(emulator.screen().line_trimmed(4), "");
        assert_eq!(emulator.screen().cell_data(0, 5), Some("F"));
    }

    #[test]
    fn sgr_updates_pen_and_ignores_private() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"\x1b[1;31ma\x1b[0mb");

        let bold = &emulator.screen().buffer[0][0];
        assert!(bold.attrs.bold);
        assert_eq!(bold.attrs.fg, Some(1));
        let plain = &emulator.screen().buffer[0][1];
        assert!(!plain.attrs.bold);
        assert_eq!(plain.attrs.fg, None);

        // A private SGR variant must not disturb the pen.
        feed(&mut emulator, &mut tap, b"\x1b[?4mc");
        assert!(!emulator.screen().buffer[0][2].attrs.bold);
    }

    #[test]
    fn save_restore_cursor() {
        let (mut emulator, mut tap) = setup(10, 5);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"\x1b[3;4H\x1b7\x1b[1;1H\x1b8");
        assert_eq!(emulator.cursor(), (3, 2));
    }

    #[test]
    fn reverse_index_scrolls_at_top() {
        let (mut emulator, mut tap) = setup(10, 3);
        tap.line_pause = false;

        feed(&mut emulator, &mut tap, b"top\x1b[1;1H\x1bM");
        assert_eq!(emulator.screen().line_trimmed(0), "");
        assert_eq!(emulator.screen().line_trimmed(1), "top");
        assert_eq!(emulator.cursor(), (0, 0));
    }
}
