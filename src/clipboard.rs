//! Clipboard bridge
//!
//! Copying goes through the platform's clipboard helper, spawned per
//! copy: `pbcopy` on macOS, `wl-copy` under Wayland, `xclip` under X11.
//! The payload is written to the helper's stdin, which is then closed.

use crate::{Result, TdsrError};
use log::debug;
use std::io::Write;
use std::process::{Command, Stdio};

/// Helper command for this platform, or an error when there is none.
fn helper_command() -> Result<Vec<&'static str>> {
    if cfg!(target_os = "macos") {
        return Ok(vec!["pbcopy"]);
    }
    if cfg!(target_os = "linux") {
        if std::env::var("XDG_SESSION_TYPE").as_deref() == Ok("wayland") {
            return Ok(vec!["wl-copy"]);
        }
        return Ok(vec!["xclip", "-selection", "clip"]);
    }
    Err(TdsrError::Clipboard(
        "no clipboard helper for this platform".to_string(),
    ))
}

/// Hand text to the clipboard helper.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let argv = helper_command()?;
    debug!("Copying {} bytes via {:?}", text.len(), argv);

    let mut child = Command::new(argv[0])
        .args(&argv[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| TdsrError::Clipboard(format!("failed to run {}: {}", argv[0], e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| TdsrError::Clipboard(format!("write to {} failed: {}", argv[0], e)))?;
    }

    let status = child
        .wait()
        .map_err(|e| TdsrError::Clipboard(format!("wait for {} failed: {}", argv[0], e)))?;
    if !status.success() {
        return Err(TdsrError::Clipboard(format!(
            "{} exited with {}",
            argv[0], status
        )));
    }
    Ok(())
}
