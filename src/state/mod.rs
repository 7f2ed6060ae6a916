//! Session state
//!
//! One `State` value owns everything that outlives a single event:
//! configuration, the review cursor, the speech driver and tap, the
//! modal handler stack, the copy anchor, and the scheduler of deferred
//! speech. The event loop threads it through every handler and callback.

pub mod config;
pub mod phonetics;

use crate::input::HandlerStack;
use crate::plugins::PluginRegistry;
use crate::review::ReviewCursor;
use crate::speech::{SpeechTap, Synth};
use crate::symbols;
use crate::terminal::Screen;
use crate::Result;
use config::Config;
use log::{error, info};
use phonetics::PHONETICS;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

/// A deferred piece of work, usually delayed speech.
type DelayedFn = Box<dyn FnOnce(&mut State, &Screen) -> Result<()>>;

pub struct State {
    pub config: Config,

    /// Reading position, independent of the program cursor.
    pub review: ReviewCursor,

    /// Speech server driver.
    pub synth: Box<dyn Synth>,

    /// Draw-time observer state shared with the emulator.
    pub tap: SpeechTap,

    /// Quiet mode: automatic reading off, explicit commands still speak.
    pub quiet: bool,

    /// Mute while a delayed cursor read is pending, so intervening
    /// output is not spoken ahead of the cursor line.
    pub tempsilence: bool,

    /// A coalescing flush is already scheduled; don't schedule another.
    pub delaying_output: bool,

    /// Modal input handlers. The root dispatcher sits at the bottom and
    /// never pops.
    pub handlers: HandlerStack,

    /// First endpoint of a region selection, set by the clipboard key.
    pub copy_anchor: Option<(u16, u16)>,

    pub plugins: PluginRegistry,

    scheduled: Vec<(Instant, DelayedFn)>,
}

impl State {
    pub fn new(cols: u16, rows: u16, config: Config, mut synth: Box<dyn Synth>) -> Result<Self> {
        info!("Initializing state, {}x{} terminal", cols, rows);

        if let Some(rate) = config.rate() {
            synth.set_rate(rate)?;
        }
        if let Some(volume) = config.volume() {
            synth.set_volume(volume)?;
        }
        if let Some(idx) = config.voice_idx() {
            synth.set_voice_idx(idx)?;
        }

        let plugin_dir = dirs::home_dir()
            .unwrap_or_else(|| ".".into())
            .join(".tdsr")
            .join("plugins");
        let plugins = PluginRegistry::new(
            &config.plugins,
            &config.plugin_commands,
            plugin_dir,
            &config.prompt_pattern(),
        );

        Ok(Self {
            config,
            review: ReviewCursor::new(cols, rows),
            synth,
            tap: SpeechTap::new(),
            quiet: false,
            tempsilence: false,
            delaying_output: false,
            handlers: HandlerStack::new(),
            copy_anchor: None,
            plugins,
            scheduled: Vec::new(),
        })
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.review.resize(cols, rows);
    }

    pub fn toggle_quiet(&mut self) -> bool {
        self.quiet = !self.quiet;
        self.quiet
    }

    // ---- Speech ----

    /// Speak text. Symbol names are substituted when enabled (or forced,
    /// as spelling does); codepoint 32 never substitutes.
    pub fn say(&mut self, text: &str, force_process_symbols: bool) -> Result<()> {
        let mut data = text.trim().to_string();
        if force_process_symbols || self.config.process_symbols() {
            if let Some(re) = self.config.symbols_re() {
                data = symbols::replace_symbols(&data, re, &self.config.symbols);
            }
        }
        self.synth.speak(&data)
    }

    /// Speak a single character. The symbol map always applies here,
    /// independent of the process_symbols switch.
    pub fn say_character(&mut self, ch: &str) -> Result<()> {
        let ch = if ch.is_empty() { " " } else { ch };
        let code = ch.chars().next().map(|c| c as u32).unwrap_or(32);
        if let Some(name) = self.config.symbols.get(&code).cloned() {
            self.synth.speak(&name)
        } else {
            self.synth.letter(ch)
        }
    }

    /// Cut off whatever is being spoken right now.
    pub fn silence(&mut self) -> Result<()> {
        self.synth.cancel()
    }

    fn condense(&self, text: &str) -> String {
        if self.config.repeated_symbols() {
            symbols::condense_repeats(text, &self.config.repeated_symbols_values())
        } else {
            text.to_string()
        }
    }

    /// Speak accumulated child output, subject to gating.
    fn speak_accumulated(&mut self, data: &str) -> Result<()> {
        if self.quiet || self.tempsilence {
            return Ok(());
        }
        let data = self.condense(data);
        self.say(&data, false)
    }

    /// Flush the speech buffer: drain it and speak the contents once.
    pub fn flush_speech(&mut self) -> Result<()> {
        let data = self.tap.buffer.take();
        if data.is_empty() {
            return Ok(());
        }
        self.speak_accumulated(&data)
    }

    /// Speak lines completed by linefeeds while line pause is on.
    pub fn flush_pending_lines(&mut self) -> Result<()> {
        for line in self.tap.buffer.drain_lines() {
            self.speak_accumulated(&line)?;
        }
        Ok(())
    }

    // ---- Scheduler ----

    /// Defer `f` by `delay`. With `set_tempsilence`, screen output stays
    /// unspoken until the deferred call decides what to say.
    pub fn schedule<F>(&mut self, delay: Duration, set_tempsilence: bool, f: F)
    where
        F: FnOnce(&mut State, &Screen) -> Result<()> + 'static,
    {
        self.scheduled.push((Instant::now() + delay, Box::new(f)));
        if set_tempsilence {
            self.tempsilence = true;
        }
    }

    /// Drop every pending deferred call. Each keystroke does this, so
    /// stale speech never races new interaction.
    pub fn clear_scheduled(&mut self) {
        self.scheduled.clear();
    }

    /// Run every deferred call whose deadline has passed, in list order.
    pub fn run_scheduled(&mut self, screen: &Screen) -> Result<()> {
        if self.scheduled.is_empty() {
            return Ok(());
        }
        let now = Instant::now();
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.scheduled.len() {
            if now >= self.scheduled[i].0 {
                due.push(self.scheduled.remove(i));
            } else {
                i += 1;
            }
        }
        if !due.is_empty() {
            self.tempsilence = false;
        }
        for (_, f) in due {
            f(self, screen)?;
        }
        Ok(())
    }

    /// How long the event loop may sleep before the next deferred call.
    pub fn time_until_next_scheduled(&self) -> Option<Duration> {
        let next = self.scheduled.iter().map(|(when, _)| *when).min()?;
        Some(next.saturating_duration_since(Instant::now()))
    }

    // ---- Review cursor ----

    /// Payload of the cell under the review cursor.
    fn cell<'s>(&self, screen: &'s Screen) -> &'s str {
        screen
            .cell_data(self.review.pos.0, self.review.pos.1)
            .unwrap_or(" ")
    }

    fn move_prevchar(&mut self, screen: &Screen) {
        let (x, y) = self.review.pos;
        if x == 0 {
            if y == 0 {
                return;
            }
            self.review.pos = (screen.cols().saturating_sub(1), y - 1);
        } else {
            self.review.pos.0 = x - 1;
        }
    }

    fn move_nextchar(&mut self, screen: &Screen) {
        let (x, y) = self.review.pos;
        if x == screen.cols().saturating_sub(1) {
            if y == screen.rows().saturating_sub(1) {
                return;
            }
            self.review.pos = (0, y + 1);
        } else {
            self.review.pos.0 = x + 1;
        }
    }

    /// Step left off the empty right half of a wide character, so the
    /// cursor always rests on a speakable cell.
    fn skip_to_previous_char(&mut self, screen: &Screen) {
        while self.review.pos.0 > 0 && self.cell(screen).is_empty() {
            self.review.pos.0 -= 1;
        }
    }

    /// Speak a row. Blank rows are announced as "blank"; repeated
    /// separators are condensed.
    pub fn say_line(&mut self, screen: &Screen, y: u16) -> Result<()> {
        let line = screen.line(y).trim().to_string();
        if line.is_empty() {
            return self.say("blank", false);
        }
        let line = self.condense(&line);
        self.say(&line, false)
    }

    /// Speak the character at (x, y), optionally through the phonetic
    /// alphabet.
    pub fn say_char_at(&mut self, screen: &Screen, y: u16, x: u16, phonetic: bool) -> Result<()> {
        let data = screen.cell_data(x, y).unwrap_or(" ").to_string();
        if phonetic {
            let lower = data
                .chars()
                .next()
                .map(|c| c.to_lowercase().next().unwrap_or(c));
            if let Some(word) = lower.and_then(|c| PHONETICS.get(&c)) {
                return self.synth.speak(word);
            }
        }
        self.say_character(&data)
    }

    pub fn prev_line(&mut self, screen: &Screen) -> Result<()> {
        if self.review.pos.1 == 0 {
            self.say("top", false)?;
        } else {
            self.review.pos.1 -= 1;
        }
        self.say_line(screen, self.review.pos.1)
    }

    pub fn current_line(&mut self, screen: &Screen) -> Result<()> {
        self.say_line(screen, self.review.pos.1)
    }

    pub fn next_line(&mut self, screen: &Screen) -> Result<()> {
        if self.review.pos.1 >= screen.rows().saturating_sub(1) {
            self.say("bottom", false)?;
            self.review.pos.1 = screen.rows().saturating_sub(1);
        } else {
            self.review.pos.1 += 1;
        }
        self.say_line(screen, self.review.pos.1)
    }

    pub fn prev_char(&mut self, screen: &Screen) -> Result<()> {
        if self.review.pos.0 == 0 {
            self.say("left", false)?;
        } else {
            self.review.pos.0 -= 1;
        }
        self.skip_to_previous_char(screen);
        self.say_char_at(screen, self.review.pos.1, self.review.pos.0, false)
    }

    pub fn current_char(&mut self, screen: &Screen, phonetic: bool) -> Result<()> {
        self.say_char_at(screen, self.review.pos.1, self.review.pos.0, phonetic)
    }

    pub fn next_char(&mut self, screen: &Screen) -> Result<()> {
        let width = UnicodeWidthStr::width(self.cell(screen)).max(1) as u16;
        self.review.pos.0 += width;
        if self.review.pos.0 > screen.cols().saturating_sub(1) {
            self.say("right", false)?;
            self.review.pos.0 = screen.cols().saturating_sub(1);
            self.skip_to_previous_char(screen);
        }
        self.say_char_at(screen, self.review.pos.1, self.review.pos.0, false)
    }

    /// Speak the word under the cursor, optionally spelled out. The
    /// cursor position is left where it was.
    pub fn say_word(&mut self, screen: &Screen, spell: bool) -> Result<()> {
        let saved = self.review.pos;
        let cols = screen.cols();

        // Back up to the start of the word.
        while self.review.pos.0 > 0
            && self.cell(screen) != " "
            && screen.cell_data(self.review.pos.0 - 1, self.review.pos.1) != Some(" ")
        {
            self.move_prevchar(screen);
        }

        if self.review.pos.0 == 0 && self.cell(screen) == " " {
            self.say("space", false)?;
            self.review.pos = saved;
            return Ok(());
        }

        let mut word = String::new();
        word.push_str(self.cell(screen));
        while self.review.pos.0 < cols.saturating_sub(1) {
            self.move_nextchar(screen);
            let data = self.cell(screen);
            if data == " " {
                break;
            }
            word.push_str(data);
        }

        if spell {
            let spelled: Vec<String> = word.chars().map(String::from).collect();
            self.say(&spelled.join(" "), true)?;
        } else {
            self.say(&word, false)?;
        }
        self.review.pos = saved;
        Ok(())
    }

    pub fn prev_word(&mut self, screen: &Screen) -> Result<()> {
        if self.review.pos.0 == 0 {
            self.say("left", false)?;
            return self.say_word(screen, false);
        }
        // Leave the word we are in.
        while self.review.pos.0 > 0 && self.cell(screen) != " " {
            self.move_prevchar(screen);
        }
        // Cross the gap.
        while self.review.pos.0 > 0 && self.cell(screen) == " " {
            self.move_prevchar(screen);
        }
        // Land on the start of the previous word.
        while self.review.pos.0 > 0
            && self.cell(screen) != " "
            && screen.cell_data(self.review.pos.0 - 1, self.review.pos.1) != Some(" ")
        {
            self.move_prevchar(screen);
        }
        self.say_word(screen, false)
    }

    pub fn next_word(&mut self, screen: &Screen) -> Result<()> {
        let saved = self.review.pos;
        let last = screen.cols().saturating_sub(1);

        while self.review.pos.0 < last && self.cell(screen) != " " {
            self.move_nextchar(screen);
        }
        while self.review.pos.0 < last && self.cell(screen) == " " {
            self.move_nextchar(screen);
        }
        if self.review.pos.0 == last && self.cell(screen) == " " {
            self.say("right", false)?;
            self.review.pos = saved;
            return self.say_word(screen, false);
        }
        self.say_word(screen, false)
    }

    pub fn top_of_screen(&mut self, screen: &Screen) -> Result<()> {
        self.review.pos.1 = 0;
        self.say_line(screen, 0)
    }

    pub fn bottom_of_screen(&mut self, screen: &Screen) -> Result<()> {
        self.review.pos.1 = screen.rows().saturating_sub(1);
        self.say_line(screen, self.review.pos.1)
    }

    pub fn start_of_line(&mut self, screen: &Screen) -> Result<()> {
        self.review.pos.0 = 0;
        self.say_char_at(screen, self.review.pos.1, 0, false)
    }

    pub fn end_of_line(&mut self, screen: &Screen) -> Result<()> {
        self.review.pos.0 = screen.cols().saturating_sub(1);
        self.skip_to_previous_char(screen);
        self.say_char_at(screen, self.review.pos.1, self.review.pos.0, false)
    }

    // ---- Selection and copy ----

    /// First press anchors a selection at the review cursor; the second
    /// copies the region between anchor and cursor to the clipboard.
    pub fn handle_clipboard(&mut self, screen: &Screen) -> Result<()> {
        match self.copy_anchor.take() {
            None => {
                self.copy_anchor = Some(self.review.pos);
                self.say("select", false)
            }
            Some((ax, ay)) => {
                let (ex, ey) = self.review.pos;
                let text = region_text(screen, ay, ax, ey, ex);
                match crate::clipboard::copy_to_clipboard(&text) {
                    Ok(()) => self.say("copied", false),
                    Err(e) => {
                        error!("Copy failed: {}", e);
                        self.say("Failed", false)
                    }
                }
            }
        }
    }

    // ---- Plugins ----

    pub fn run_plugin(&mut self, name: &str, screen: &Screen) -> Result<()> {
        match self.plugins.run(name, screen) {
            Ok(lines) => {
                for line in lines {
                    self.say(&line, false)?;
                }
                Ok(())
            }
            Err(e) => {
                error!("Plugin {} failed: {}", name, e);
                self.say(&format!("Error loading plugin {}", e), false)
            }
        }
    }
}

/// Text of the region between two endpoints.
///
/// The x and y pairs are normalized independently. The first row starts
/// at the left endpoint, the last row ends at the right one, full rows in
/// between; each row is right-trimmed and rows join with newlines.
pub fn region_text(
    screen: &Screen,
    mut start_y: u16,
    mut start_x: u16,
    mut end_y: u16,
    mut end_x: u16,
) -> String {
    if start_x > end_x {
        std::mem::swap(&mut start_x, &mut end_x);
    }
    if start_y > end_y {
        std::mem::swap(&mut start_y, &mut end_y);
    }

    let last_col = screen.cols().saturating_sub(1);
    let mut rows = Vec::new();
    for y in start_y..=end_y {
        let from = if y == start_y { start_x } else { 0 };
        let to = if y == end_y { end_x } else { last_col };
        let mut text = String::new();
        for x in from..=to {
            if let Some(data) = screen.cell_data(x, y) {
                text.push_str(data);
            }
        }
        rows.push(text.trim_end().to_string());
    }
    rows.join("\n")
}
