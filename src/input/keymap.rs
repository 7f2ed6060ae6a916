//! Default key bindings
//!
//! Commands are ESC-prefixed so they ride on the Alt modifier in every
//! terminal. Double-press commands are stored under the concatenated
//! sequence; the dispatcher checks those within the repeat window.

use std::collections::HashMap;

pub type KeySequence = Vec<u8>;

/// Screen reader commands a key can be bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    // Line review
    PrevLine,
    SayLine,
    NextLine,

    // Word review
    PrevWord,
    SayWord,
    SpellWord,
    NextWord,

    // Character review
    PrevChar,
    SayChar,
    SayCharPhonetic,
    NextChar,

    // Jumps
    TopOfScreen,
    BottomOfScreen,
    StartOfLine,
    EndOfLine,

    // Cursor keys that pass through with a delayed read
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Editing keys that echo the character they affect
    BackspaceEcho,
    DeleteEcho,

    // Modes and controls
    ConfigMenu,
    ToggleQuiet,
    Clipboard,
    CopyMenu,
    Silence,

    /// An extension bound through the `[plugins]` config section.
    Plugin(String),
}

/// The keymap type: exact byte sequences to commands.
pub type Keymap = HashMap<KeySequence, KeyAction>;

/// Add a binding unless the sequence is already taken. Plugin bindings
/// go through this so they cannot shadow built-ins.
pub fn add_binding(map: &mut Keymap, key: KeySequence, action: KeyAction) {
    map.entry(key).or_insert(action);
}

pub fn default_keymap() -> Keymap {
    let mut map = HashMap::new();

    // Line review
    map.insert(b"\x1bu".to_vec(), KeyAction::PrevLine);
    map.insert(b"\x1bi".to_vec(), KeyAction::SayLine);
    map.insert(b"\x1bo".to_vec(), KeyAction::NextLine);

    // Word review
    map.insert(b"\x1bj".to_vec(), KeyAction::PrevWord);
    map.insert(b"\x1bk".to_vec(), KeyAction::SayWord);
    map.insert(b"\x1bk\x1bk".to_vec(), KeyAction::SpellWord);
    map.insert(b"\x1bl".to_vec(), KeyAction::NextWord);

    // Character review
    map.insert(b"\x1bm".to_vec(), KeyAction::PrevChar);
    map.insert(b"\x1b,".to_vec(), KeyAction::SayChar);
    map.insert(b"\x1b,\x1b,".to_vec(), KeyAction::SayCharPhonetic);
    map.insert(b"\x1b.".to_vec(), KeyAction::NextChar);

    // Jumps
    map.insert(b"\x1bU".to_vec(), KeyAction::TopOfScreen);
    map.insert(b"\x1bO".to_vec(), KeyAction::BottomOfScreen);
    map.insert(b"\x1bM".to_vec(), KeyAction::StartOfLine);
    map.insert(b"\x1b>".to_vec(), KeyAction::EndOfLine);
    // For the Hungarian keyboard layout
    map.insert(b"\x1b:".to_vec(), KeyAction::EndOfLine);

    // Modes and controls
    map.insert(b"\x1bc".to_vec(), KeyAction::ConfigMenu);
    map.insert(b"\x1bq".to_vec(), KeyAction::ToggleQuiet);
    map.insert(b"\x1br".to_vec(), KeyAction::Clipboard);
    map.insert(b"\x1bv".to_vec(), KeyAction::CopyMenu);
    map.insert(b"\x1bx".to_vec(), KeyAction::Silence);

    // Editing echo
    map.insert(b"\x08".to_vec(), KeyAction::BackspaceEcho);
    map.insert(b"\x7f".to_vec(), KeyAction::BackspaceEcho);
    map.insert(b"\x1b[3~".to_vec(), KeyAction::DeleteEcho);

    // Arrows, CSI and SS3 flavors
    map.insert(b"\x1b[A".to_vec(), KeyAction::ArrowUp);
    map.insert(b"\x1b[B".to_vec(), KeyAction::ArrowDown);
    map.insert(b"\x1b[C".to_vec(), KeyAction::ArrowRight);
    map.insert(b"\x1b[D".to_vec(), KeyAction::ArrowLeft);
    map.insert(b"\x1bOA".to_vec(), KeyAction::ArrowUp);
    map.insert(b"\x1bOB".to_vec(), KeyAction::ArrowDown);
    map.insert(b"\x1bOC".to_vec(), KeyAction::ArrowRight);
    map.insert(b"\x1bOD".to_vec(), KeyAction::ArrowLeft);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_present() {
        let map = default_keymap();

        assert_eq!(map.get(&b"\x1bi".to_vec()), Some(&KeyAction::SayLine));
        assert_eq!(map.get(&b"\x1bu".to_vec()), Some(&KeyAction::PrevLine));
        assert_eq!(map.get(&b"\x1bo".to_vec()), Some(&KeyAction::NextLine));
        assert_eq!(
            map.get(&b"\x1bk\x1bk".to_vec()),
            Some(&KeyAction::SpellWord)
        );
        assert_eq!(
            map.get(&b"\x1b,\x1b,".to_vec()),
            Some(&KeyAction::SayCharPhonetic)
        );
        assert_eq!(map.get(&b"\x7f".to_vec()), Some(&KeyAction::BackspaceEcho));
        assert_eq!(map.get(&b"\x1b[3~".to_vec()), Some(&KeyAction::DeleteEcho));
        assert_eq!(map.get(&b"\x1bOB".to_vec()), Some(&KeyAction::ArrowDown));
        assert_eq!(map.get(&b"\x1b:".to_vec()), Some(&KeyAction::EndOfLine));
    }

    #[test]
    fn add_binding_does_not_shadow() {
        let mut map = default_keymap();
        add_binding(
            &mut map,
            b"\x1bi".to_vec(),
            KeyAction::Plugin("greedy".to_string()),
        );
        assert_eq!(map.get(&b"\x1bi".to_vec()), Some(&KeyAction::SayLine));

        add_binding(
            &mut map,
            b"\x1bg".to_vec(),
            KeyAction::Plugin("git".to_string()),
        );
        assert_eq!(
            map.get(&b"\x1bg".to_vec()),
            Some(&KeyAction::Plugin("git".to_string()))
        );
    }
}
