//! Configuration round-trip tests

use std::time::Duration;
use tdsr::state::config::Config;
use tempfile::TempDir;

fn load(dir: &TempDir) -> Config {
    Config::load_from(dir.path().join("tdsr.cfg")).expect("load config")
}

#[test]
fn first_run_writes_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir);

    assert!(dir.path().join("tdsr.cfg").exists());
    assert!(config.symbols.contains_key(&33)); // bang
    assert!(config.symbols.contains_key(&36)); // dollar
    assert!(config.symbols.contains_key(&64)); // at
    assert!(config.key_echo());
    assert!(config.cursor_tracking());
    assert!(config.line_pause());
    assert!(!config.process_symbols());
    assert_eq!(config.cursor_delay(), Duration::from_secs_f32(0.02));
}

#[test]
fn settings_survive_reload() {
    let dir = TempDir::new().unwrap();
    let mut config = load(&dir);

    config.set("speech", "rate", "65");
    config.set_bool("speech", "repeated_symbols", true);
    config.set_cursor_delay(0.25);
    config.save().unwrap();

    let reloaded = load(&dir);
    assert_eq!(reloaded.rate(), Some(65));
    assert!(reloaded.repeated_symbols());
    assert_eq!(reloaded.cursor_delay(), Duration::from_secs_f32(0.25));
}

#[test]
fn symbols_and_plugin_sections_parse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tdsr.cfg");
    std::fs::write(
        &path,
        "[speech]\nprompt=[$]\n[symbols]\n8226=bullet\n[plugins]\nls_digest=g\n[commands]\nls_digest=^ls\n",
    )
    .unwrap();

    let config = Config::load_from(path).unwrap();
    assert_eq!(config.symbols.get(&8226).map(String::as_str), Some("bullet"));
    assert_eq!(config.plugins.get("ls_digest").map(String::as_str), Some("g"));
    assert_eq!(
        config.plugin_commands.get("ls_digest").map(String::as_str),
        Some("^ls")
    );
    assert_eq!(config.prompt_pattern(), "[$]");

    // The custom symbol participates in the compiled alternation.
    assert!(config.symbols_re().unwrap().is_match("\u{2022}"));
}

#[test]
fn repeated_symbols_values_configurable() {
    let dir = TempDir::new().unwrap();
    let mut config = load(&dir);

    assert_eq!(config.repeated_symbols_values(), "-=!#");
    config.set("speech", "repeated_symbols_values", "*~");
    assert_eq!(config.repeated_symbols_values(), "*~");
}
