//! Speech buffer and the draw-time observer state
//!
//! Text the child draws is accumulated here by the emulator and flushed
//! to the speech server in batches, so one burst of output becomes one
//! utterance instead of a stutter of single characters.

/// Accumulates text to be spoken.
///
/// Two modes of consumption: `take` drains everything at once (the
/// coalesced flush), while `line_break`/`drain_lines` split the stream at
/// newlines when line pause is enabled.
pub struct SpeechBuffer {
    text: String,
    pending_lines: Vec<String>,
}

impl SpeechBuffer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            pending_lines: Vec::new(),
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Rewind the write position by one character.
    ///
    /// Used when the child backspaces over text it just echoed, so the
    /// erased character is not spoken.
    pub fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    /// Move the current text onto the pending-line queue.
    ///
    /// Empty text queues nothing; a run of bare linefeeds does not
    /// produce a string of "blank" utterances.
    pub fn line_break(&mut self) {
        if !self.text.is_empty() {
            let line = std::mem::take(&mut self.text);
            self.pending_lines.push(line);
        }
    }

    pub fn has_pending_lines(&self) -> bool {
        !self.pending_lines.is_empty()
    }

    pub fn drain_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_lines)
    }

    /// Drain the buffer, leaving it empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn contents(&self) -> &str {
        &self.text
    }
}

impl Default for SpeechBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer state the emulator writes through while parsing child output.
///
/// The buffer, `last_drawn`, and `last_key` persist across feeds; the
/// flag fields are snapshots the event loop refreshes before each feed.
pub struct SpeechTap {
    pub buffer: SpeechBuffer,

    /// Cursor position just after the last draw that reached the buffer.
    /// A draw further right on the same row than this plus one column
    /// injects a space, so right-aligned output does not run words
    /// together.
    pub last_drawn: (u16, u16),

    /// The most recent chunk the user typed, as decoded text. A drawn
    /// grapheme equal to this is the terminal echoing the keystroke and
    /// is routed through character speech instead of the buffer.
    pub last_key: String,

    /// Characters to speak through the character path, queued by the
    /// key-echo check and drained by the event loop after the feed.
    pub echoes: Vec<String>,

    /// Snapshot of the key_echo setting.
    pub key_echo: bool,

    /// Snapshot of the line_pause setting.
    pub line_pause: bool,

    /// Quiet mode: nothing is buffered, but tab spacing still applies.
    pub quiet: bool,

    /// Temporary mute while a delayed cursor read is pending.
    pub temp_muted: bool,
}

impl SpeechTap {
    pub fn new() -> Self {
        Self {
            buffer: SpeechBuffer::new(),
            last_drawn: (0, 0),
            last_key: String::new(),
            echoes: Vec::new(),
            key_echo: true,
            line_pause: true,
            quiet: false,
            temp_muted: false,
        }
    }

    /// True when draws must not reach the speech buffer.
    pub fn muted(&self) -> bool {
        self.quiet || self.temp_muted
    }
}

impl Default for SpeechTap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_buffer() {
        let mut buffer = SpeechBuffer::new();
        buffer.push_str("hello");
        buffer.push_str(" world");

        assert_eq!(buffer.take(), "hello world");
        assert!(buffer.is_empty());
        assert_eq!(buffer.take(), "");
    }

    #[test]
    fn pop_rewinds_one_character() {
        let mut buffer = SpeechBuffer::new();
        buffer.push_str("ab");
        assert_eq!(buffer.pop(), Some('b'));
        assert_eq!(buffer.contents(), "a");
        assert_eq!(buffer.pop(), Some('a'));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn line_break_queues_nonempty_only() {
        let mut buffer = SpeechBuffer::new();
        buffer.line_break();
        assert!(!buffer.has_pending_lines());

        buffer.push_str("one");
        buffer.line_break();
        buffer.line_break();
        buffer.push_str("two");
        buffer.line_break();

        assert_eq!(buffer.drain_lines(), vec!["one", "two"]);
        assert!(!buffer.has_pending_lines());
        assert!(buffer.is_empty());
    }

    #[test]
    fn tap_muting() {
        let mut tap = SpeechTap::new();
        assert!(!tap.muted());
        tap.temp_muted = true;
        assert!(tap.muted());
        tap.temp_muted = false;
        tap.quiet = true;
        assert!(tap.muted());
    }
}
