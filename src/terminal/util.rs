//! Terminal mode and size helpers

use crate::{Result, TdsrError};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::BorrowedFd;
use std::os::unix::io::RawFd;

/// Zero-timeout readability check.
///
/// The event loop's epoll registrations are edge triggered, so anything
/// that reads in fixed-size chunks has to drain the fd before waiting
/// again; this is the probe both the PTY and stdin paths use.
pub fn fd_readable(fd: RawFd) -> Result<bool> {
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::ZERO) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(fds[0]
            .revents()
            .map(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
            .unwrap_or(false)),
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(e) => Err(TdsrError::Io(std::io::Error::from_raw_os_error(e as i32))),
    }
}

/// Current terminal size as (cols, rows).
pub fn terminal_size(fd: RawFd) -> Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    if rc == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Ok((ws.ws_col, ws.ws_row))
    } else {
        // Not a real tty or a zero-sized one; assume the classic size.
        Ok((80, 24))
    }
}

/// Put the terminal in raw mode, returning the prior attributes.
///
/// Raw mode is what lets the reader see every keystroke, including the
/// ones that would otherwise be line-edited or turned into signals.
pub fn set_raw_mode(fd: RawFd) -> Result<libc::termios> {
    let mut original: libc::termios = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::tcgetattr(fd, &mut original) };
    if rc != 0 {
        return Err(TdsrError::Terminal(
            "tcgetattr failed; is stdin a terminal?".to_string(),
        ));
    }

    let mut raw = original;
    unsafe {
        libc::cfmakeraw(&mut raw);
        if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
            return Err(TdsrError::Terminal("tcsetattr failed".to_string()));
        }
    }
    Ok(original)
}

/// Restore saved terminal attributes. Best effort; used on exit paths
/// where there is nothing useful to do with a failure.
pub fn restore_termios(fd: RawFd, termios: &libc::termios) {
    unsafe {
        libc::tcsetattr(fd, libc::TCSANOW, termios);
    }
}
