//! Configuration management
//!
//! Settings live in an INI file. The legacy location `~/.tdsr.cfg` is
//! respected when it exists; otherwise the XDG-style path
//! `~/.config/tdsr/tdsr.cfg` is used and created on first run.

use crate::{Result, TdsrError};
use ini::Ini;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default review-speech delay after a cursor key, in seconds.
const DEFAULT_CURSOR_DELAY: f32 = 0.02;

pub struct Config {
    ini: Ini,
    path: PathBuf,

    /// Spoken names for characters, keyed by codepoint.
    /// From the `[symbols]` section, whose keys are decimal codepoints.
    pub symbols: HashMap<u32, String>,

    /// Alternation over all symbol characters except space, compiled
    /// once per change to the symbols table.
    symbols_re: Option<Regex>,

    /// Plugin name -> single-character escape suffix, from `[plugins]`.
    pub plugins: HashMap<String, String>,

    /// Plugin name -> command regex source, from `[commands]`.
    pub plugin_commands: HashMap<String, String>,
}

impl Config {
    /// Load from the default location, creating it with defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load from an explicit path, creating it with defaults if absent.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| TdsrError::Config(format!("Failed to load config: {}", e)))?
        } else {
            let default = Self::default_ini();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            default
                .write_to_file(&path)
                .map_err(|e| TdsrError::Config(format!("Failed to write config: {}", e)))?;
            default
        };

        let mut config = Self {
            ini,
            path,
            symbols: HashMap::new(),
            symbols_re: None,
            plugins: HashMap::new(),
            plugin_commands: HashMap::new(),
        };

        config.parse_symbols();
        config.parse_plugins();
        config.rebuild_symbols_re();

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| TdsrError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let legacy = home.join(".tdsr.cfg");
        if legacy.exists() {
            return legacy;
        }
        home.join(".config").join("tdsr").join("tdsr.cfg")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_ini() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("process_symbols", "false")
            .set("key_echo", "true")
            .set("cursor_tracking", "true")
            .set("line_pause", "true")
            .set("repeated_symbols", "false")
            .set("repeated_symbols_values", "-=!#")
            .set("prompt", ".*");

        ini.with_section(Some("symbols"))
            .set("32", "space")
            .set("33", "bang")
            .set("34", "quote")
            .set("35", "number")
            .set("36", "dollar")
            .set("37", "percent")
            .set("38", "and")
            .set("39", "tick")
            .set("40", "left paren")
            .set("41", "right paren")
            .set("42", "star")
            .set("43", "plus")
            .set("44", "comma")
            .set("45", "dash")
            .set("46", "dot")
            .set("47", "slash")
            .set("58", "colon")
            .set("59", "semi")
            .set("60", "less")
            .set("61", "equals")
            .set("62", "greater")
            .set("63", "question")
            .set("64", "at")
            .set("91", "left bracket")
            .set("92", "backslash")
            .set("93", "right bracket")
            .set("94", "caret")
            .set("95", "line")
            .set("96", "grav")
            .set("123", "left brace")
            .set("124", "bar")
            .set("125", "right brace")
            .set("126", "tilda");

        ini.with_section(Some("plugins"));
        ini.with_section(Some("commands"));

        ini
    }

    fn parse_symbols(&mut self) {
        if let Some(section) = self.ini.section(Some("symbols")) {
            for (key, value) in section.iter() {
                if let Ok(code) = key.parse::<u32>() {
                    self.symbols.insert(code, value.to_string());
                }
            }
        }
        debug!("Loaded {} symbols", self.symbols.len());
    }

    fn parse_plugins(&mut self) {
        if let Some(section) = self.ini.section(Some("plugins")) {
            for (plugin, suffix) in section.iter() {
                self.plugins.insert(plugin.to_string(), suffix.to_string());
            }
        }
        if let Some(section) = self.ini.section(Some("commands")) {
            for (plugin, pattern) in section.iter() {
                self.plugin_commands
                    .insert(plugin.to_string(), pattern.to_string());
            }
        }
        debug!("Loaded {} plugins", self.plugins.len());
    }

    /// Recompile the symbol alternation. Codepoint 32 is always left out
    /// so symbol replacement can never touch spacing.
    pub fn rebuild_symbols_re(&mut self) {
        let mut candidates: Vec<u32> = self
            .symbols
            .keys()
            .copied()
            .filter(|&code| code != 32)
            .collect();
        candidates.sort_unstable();

        let pattern: Vec<String> = candidates
            .into_iter()
            .filter_map(char::from_u32)
            .map(|ch| regex::escape(&ch.to_string()))
            .collect();

        self.symbols_re = if pattern.is_empty() {
            None
        } else {
            Regex::new(&pattern.join("|")).ok()
        };
    }

    pub fn symbols_re(&self) -> Option<&Regex> {
        self.symbols_re.as_ref()
    }

    // Raw accessors

    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Read a boolean, accepting the spellings INI files accumulate over
    /// the years ("True", "1", "on", ...).
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.ini.get_from(Some(section), key) {
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => true,
                "0" | "no" | "false" | "off" => false,
                _ => default,
            },
            None => default,
        }
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Booleans are always written in canonical lowercase form.
    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) {
        self.set(section, key, if value { "true" } else { "false" });
    }

    // Speech settings

    pub fn process_symbols(&self) -> bool {
        self.get_bool("speech", "process_symbols", false)
    }

    pub fn key_echo(&self) -> bool {
        self.get_bool("speech", "key_echo", true)
    }

    pub fn cursor_tracking(&self) -> bool {
        self.get_bool("speech", "cursor_tracking", true)
    }

    pub fn line_pause(&self) -> bool {
        self.get_bool("speech", "line_pause", true)
    }

    pub fn repeated_symbols(&self) -> bool {
        self.get_bool("speech", "repeated_symbols", false)
    }

    pub fn repeated_symbols_values(&self) -> String {
        self.get_string("speech", "repeated_symbols_values", "-=!#")
    }

    /// Speech rate, only if configured.
    pub fn rate(&self) -> Option<i32> {
        self.ini
            .get_from(Some("speech"), "rate")
            .and_then(|v| v.parse().ok())
    }

    /// Speech volume, only if configured.
    pub fn volume(&self) -> Option<i32> {
        self.ini
            .get_from(Some("speech"), "volume")
            .and_then(|v| v.parse().ok())
    }

    /// Voice index, only if configured.
    pub fn voice_idx(&self) -> Option<i32> {
        self.ini
            .get_from(Some("speech"), "voice_idx")
            .and_then(|v| v.parse().ok())
    }

    /// Prompt regex source used to bound plugin line collection.
    pub fn prompt_pattern(&self) -> String {
        self.get_string("speech", "prompt", ".*")
    }

    /// Delay before speaking the cursor line after a cursor key.
    /// Stored in seconds; the config menu takes milliseconds and divides.
    pub fn cursor_delay(&self) -> Duration {
        let secs = self
            .ini
            .get_from(Some("speech"), "cursor_delay")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|s| *s >= 0.0)
            .unwrap_or(DEFAULT_CURSOR_DELAY);
        Duration::from_secs_f32(secs)
    }

    pub fn set_cursor_delay(&mut self, secs: f32) {
        self.set("speech", "cursor_delay", &secs.to_string());
    }
}
