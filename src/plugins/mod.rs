//! Plugin system
//!
//! Plugins are external scripts that digest a window of recent screen
//! lines and return lines to speak; typical use is summarizing the
//! output of a long command. A plugin named in `[plugins]` is bound to
//! `ESC <suffix>`; an optional regex in `[commands]` bounds, together
//! with the prompt regex, how far up the screen line collection goes.
//!
//! The wire contract is one JSON object each way: `{"lines": [...]}` on
//! the script's stdin, `{"speak": [...]}` expected on its stdout.

use crate::terminal::Screen;
use crate::{Result, TdsrError};
use log::{debug, error};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Serialize)]
struct PluginInput {
    /// Screen rows, bottom first, each right-trimmed.
    lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PluginOutput {
    speak: Vec<String>,
}

struct Plugin {
    name: String,
    command_filter: Option<Regex>,
}

/// Loaded plugin bindings and the matchers that bound line collection.
pub struct PluginRegistry {
    plugins: HashMap<String, Plugin>,
    plugin_dir: PathBuf,
    prompt: Regex,
}

impl PluginRegistry {
    /// Build the registry from the config's plugin and command tables.
    /// An unparsable prompt pattern falls back to matching everything.
    pub fn new(
        plugins: &HashMap<String, String>,
        commands: &HashMap<String, String>,
        plugin_dir: PathBuf,
        prompt_pattern: &str,
    ) -> Self {
        let prompt = Regex::new(prompt_pattern)
            .unwrap_or_else(|_| Regex::new(".*").expect("fallback prompt regex"));

        let mut loaded = HashMap::new();
        for (name, _suffix) in plugins.iter() {
            let command_filter = commands.get(name).and_then(|p| Regex::new(p).ok());
            loaded.insert(
                name.clone(),
                Plugin {
                    name: name.clone(),
                    command_filter,
                },
            );
        }
        debug!("Plugin registry holds {} plugins", loaded.len());

        Self {
            plugins: loaded,
            plugin_dir,
            prompt,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run a plugin against the current screen, returning lines to speak.
    pub fn run(&self, name: &str, screen: &Screen) -> Result<Vec<String>> {
        let plugin = self
            .plugins
            .get(name)
            .ok_or_else(|| TdsrError::Plugin(format!("unknown plugin {}", name)))?;

        let lines = self.collect_lines(screen, plugin.command_filter.as_ref());
        self.run_script(&plugin.name, lines)
    }

    /// Collect rows bottom-up. Collection stops after a row that matches
    /// the prompt regex and the plugin's command regex; with no command
    /// regex bound, the whole screen is collected.
    fn collect_lines(&self, screen: &Screen, command: Option<&Regex>) -> Vec<String> {
        let mut lines = Vec::new();
        for y in (0..screen.rows()).rev() {
            let line = screen.line_trimmed(y);
            let stop = self.prompt.is_match(&line)
                && command.map(|re| re.is_match(&line)).unwrap_or(false);
            lines.push(line);
            if stop {
                break;
            }
        }
        lines
    }

    fn run_script(&self, name: &str, lines: Vec<String>) -> Result<Vec<String>> {
        let script = self.plugin_dir.join(format!("{}.py", name));
        if !script.exists() {
            return Err(TdsrError::Plugin(format!(
                "plugin script not found: {}",
                script.display()
            )));
        }

        let input = serde_json::to_string(&PluginInput { lines })?;

        let mut child = Command::new("python3")
            .arg(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TdsrError::Plugin(format!("failed to run {}: {}", script.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
            stdin.write_all(b"\n")?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Plugin {} failed: {}", name, stderr);
            return Err(TdsrError::Plugin(format!("{} failed: {}", name, stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: PluginOutput = serde_json::from_str(&stdout)
            .map_err(|e| TdsrError::Plugin(format!("bad output from {}: {}", name, e)))?;
        Ok(parsed.speak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Screen;

    fn write_line(screen: &mut Screen, y: u16, text: &str) {
        for (x, ch) in text.chars().enumerate() {
            screen.buffer[y as usize][x].data = ch.to_string();
        }
    }

    fn registry(prompt: &str, command: Option<&str>) -> PluginRegistry {
        let mut plugins = HashMap::new();
        plugins.insert("demo".to_string(), "p".to_string());
        let mut commands = HashMap::new();
        if let Some(c) = command {
            commands.insert("demo".to_string(), c.to_string());
        }
        PluginRegistry::new(&plugins, &commands, PathBuf::from("/nonexistent"), prompt)
    }

    #[test]
    fn collects_bottom_up_until_command_line() {
        let mut screen = Screen::new(20, 5);
        write_line(&mut screen, 0, "old noise");
        write_line(&mut screen, 1, "$ make test");
        write_line(&mut screen, 2, "ok 1");
        write_line(&mut screen, 3, "ok 2");

        let registry = registry(r"^\$", Some("make"));
        let plugin = registry.plugins.get("demo").unwrap();
        let lines = registry.collect_lines(&screen, plugin.command_filter.as_ref());

        assert_eq!(lines, vec!["", "ok 2", "ok 1", "$ make test"]);
    }

    #[test]
    fn without_command_regex_collects_everything() {
        let mut screen = Screen::new(20, 3);
        write_line(&mut screen, 0, "$ ls");
        write_line(&mut screen, 1, "a b");

        let registry = registry(r"^\$", None);
        let plugin = registry.plugins.get("demo").unwrap();
        let lines = registry.collect_lines(&screen, plugin.command_filter.as_ref());

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "$ ls");
    }

    #[test]
    fn unknown_plugin_is_an_error() {
        let registry = registry(".*", None);
        let screen = Screen::new(10, 2);
        assert!(registry.run("nope", &screen).is_err());
    }
}
