//! Symbol text transformations
//!
//! Two rewrites applied to text on its way to the synthesizer: replacing
//! punctuation with spoken names (driven by the compiled symbol regex in
//! the config), and condensing runs of repeated separator characters so a
//! row of `====` is read as "4 =" instead of a drone.

use regex::Regex;
use std::collections::HashMap;

/// Replace every symbol-regex match with its spoken name, space padded.
///
/// The regex is built from the `[symbols]` config section with space
/// excluded, so this can never insert runs of spacing.
pub fn replace_symbols(text: &str, re: &Regex, names: &HashMap<u32, String>) -> String {
    re.replace_all(text, |caps: &regex::Captures| {
        let m = caps.get(0).map(|m| m.as_str()).unwrap_or("");
        match m.chars().next().and_then(|ch| names.get(&(ch as u32))) {
            Some(name) => format!(" {} ", name),
            None => m.to_string(),
        }
    })
    .into_owned()
}

/// Condense runs of repeated characters from `chars_to_condense`.
///
/// A run of length L > 1 becomes "L <char>"; single occurrences and all
/// other characters pass through unchanged.
pub fn condense_repeats(text: &str, chars_to_condense: &str) -> String {
    if chars_to_condense.is_empty() || text.is_empty() {
        return text.to_string();
    }

    let condense_set: std::collections::HashSet<char> = chars_to_condense.chars().collect();

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if condense_set.contains(&ch) {
            let mut count = 1usize;
            while chars.peek() == Some(&ch) {
                chars.next();
                count += 1;
            }
            if count > 1 {
                result.push_str(&format!("{} {}", count, ch));
            } else {
                result.push(ch);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
