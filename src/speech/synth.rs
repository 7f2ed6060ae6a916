//! Speech server driver
//!
//! Speech is produced by an external process consuming a small
//! newline-terminated protocol on stdin:
//!
//! - `s<text>` speak text
//! - `l<ch>`   speak a single character
//! - `x`       cancel current speech
//! - `r<int>`, `v<int>`, `V<int>`  set rate, volume, voice index
//!
//! The driver owns the child and transparently respawns it once when a
//! write hits a broken pipe; if the retry fails too, the message is
//! dropped and the next send tries a fresh start.

use crate::{Result, TdsrError};
use log::{debug, warn};
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};

/// Interface to the speech server.
///
/// Everything above this layer talks in protocol terms; tests substitute
/// a recording implementation to assert on the exact lines sent.
pub trait Synth: Send {
    /// Send one raw protocol line (including the trailing newline).
    fn send(&mut self, data: &str) -> Result<()>;

    /// Speak text.
    fn speak(&mut self, text: &str) -> Result<()> {
        self.send(&format!("s{}\n", text))
    }

    /// Speak a single character, unmapped.
    fn letter(&mut self, ch: &str) -> Result<()> {
        self.send(&format!("l{}\n", ch))
    }

    /// Cancel whatever is currently being spoken.
    fn cancel(&mut self) -> Result<()> {
        self.send("x\n")
    }

    fn set_rate(&mut self, rate: i32) -> Result<()> {
        self.send(&format!("r{}\n", rate))
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        self.send(&format!("v{}\n", volume))
    }

    fn set_voice_idx(&mut self, idx: i32) -> Result<()> {
        self.send(&format!("V{}\n", idx))
    }

    /// Shut the server down cleanly.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Default speech server command for this platform.
pub fn default_server_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["tdsr-mac".to_string()]
    } else {
        vec!["tdsr-speechd".to_string()]
    }
}

/// Driver for a speech server subprocess.
pub struct ServerSynth {
    command: Vec<String>,
    child: Option<Child>,

    // Settings are cached so a respawned server picks them back up.
    rate: Option<i32>,
    volume: Option<i32>,
    voice_idx: Option<i32>,
}

impl ServerSynth {
    /// Create the driver and spawn the server.
    pub fn spawn(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(TdsrError::Speech("empty speech server command".to_string()));
        }
        let mut synth = Self {
            command,
            child: None,
            rate: None,
            volume: None,
            voice_idx: None,
        };
        synth.start()?;
        Ok(synth)
    }

    /// Spawn (or respawn) the server and replay cached settings.
    fn start(&mut self) -> Result<()> {
        debug!("Starting speech server: {:?}", self.command);
        let child = Command::new(&self.command[0])
            .args(&self.command[1..])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TdsrError::Speech(format!(
                    "Failed to start speech server {:?}: {}",
                    self.command[0], e
                ))
            })?;
        self.child = Some(child);

        if let Some(rate) = self.rate {
            let _ = self.write_line(&format!("r{}\n", rate));
        }
        if let Some(volume) = self.volume {
            let _ = self.write_line(&format!("v{}\n", volume));
        }
        if let Some(idx) = self.voice_idx {
            let _ = self.write_line(&format!("V{}\n", idx));
        }
        Ok(())
    }

    fn write_line(&mut self, data: &str) -> io::Result<()> {
        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        stdin.write_all(data.as_bytes())?;
        stdin.flush()
    }

    fn is_broken_pipe(e: &io::Error) -> bool {
        e.kind() == io::ErrorKind::BrokenPipe
    }
}

impl Synth for ServerSynth {
    fn send(&mut self, data: &str) -> Result<()> {
        if self.child.is_none() {
            self.start()?;
        }
        match self.write_line(data) {
            Ok(()) => Ok(()),
            Err(e) if Self::is_broken_pipe(&e) => {
                warn!("Speech server pipe broken, respawning");
                if let Some(mut dead) = self.child.take() {
                    let _ = dead.wait();
                }
                if self.start().is_err() {
                    return Ok(());
                }
                if let Err(e) = self.write_line(data) {
                    // Give up on this message; a later send retries.
                    warn!("Speech server write failed after respawn: {}", e);
                    if Self::is_broken_pipe(&e) {
                        if let Some(mut dead) = self.child.take() {
                            let _ = dead.wait();
                        }
                    }
                }
                Ok(())
            }
            Err(e) => Err(TdsrError::Io(e)),
        }
    }

    fn set_rate(&mut self, rate: i32) -> Result<()> {
        self.rate = Some(rate);
        self.send(&format!("r{}\n", rate))
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        self.volume = Some(volume);
        self.send(&format!("v{}\n", volume))
    }

    fn set_voice_idx(&mut self, idx: i32) -> Result<()> {
        self.voice_idx = Some(idx);
        self.send(&format!("V{}\n", idx))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            let _ = child.wait();
        }
        Ok(())
    }
}

impl Drop for ServerSynth {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
pub mod testing {
    //! A recording synth for protocol-level assertions in unit tests.

    use super::Synth;
    use crate::Result;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct RecordingSynth {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSynth {
        pub fn new() -> (Box<dyn Synth>, Arc<Mutex<Vec<String>>>) {
            let lines = Arc::new(Mutex::new(Vec::new()));
            let synth = RecordingSynth {
                lines: Arc::clone(&lines),
            };
            (Box::new(synth), lines)
        }
    }

    impl Synth for RecordingSynth {
        fn send(&mut self, data: &str) -> Result<()> {
            self.lines.lock().unwrap().push(data.to_string());
            Ok(())
        }
    }
}
