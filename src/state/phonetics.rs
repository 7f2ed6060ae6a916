//! Phonetic alphabet for character spelling
//!
//! A double press of the say-character key speaks the letter through this
//! map so similar-sounding letters are unambiguous. Lookup is on the
//! lowercased character.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub static PHONETICS: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    let words = [
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
        "juliet", "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo",
        "sierra", "tango", "uniform", "victor", "whiskey", "x ray", "yankee", "zulu",
    ];
    words
        .iter()
        .map(|w| (w.chars().next().unwrap(), *w))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_the_alphabet() {
        assert_eq!(PHONETICS.len(), 26);
        assert_eq!(PHONETICS.get(&'a'), Some(&"alpha"));
        assert_eq!(PHONETICS.get(&'x'), Some(&"x ray"));
        assert_eq!(PHONETICS.get(&'z'), Some(&"zulu"));
        assert_eq!(PHONETICS.get(&'A'), None);
    }
}
