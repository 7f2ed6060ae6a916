//! Pseudo-terminal host
//!
//! The screen reader sits between the user's terminal and the child
//! shell: a PTY carries the child's I/O, all of it observed on the way
//! through. The raw master fd is registered with the event loop; reads
//! drain the fd completely so each wake speaks a coherent snapshot.

use super::util::fd_readable;
use crate::{Result, TdsrError};
use log::{debug, info};
use nix::unistd::dup;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::io::RawFd;

pub struct Pty {
    master: Box<dyn portable_pty::MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    _child: Box<dyn Child + Send>,

    /// Our own dup of the master fd; stays valid for event registration
    /// and readability polls regardless of what the pty crate does with
    /// its handles.
    _fd_owner: OwnedFd,
    fd: RawFd,
}

impl Pty {
    /// Allocate a PTY and spawn `program` on it, or the user's shell when
    /// none is given. The child gets `TSDR_ACTIVE=true` in its
    /// environment so scripts can tell they are being read.
    pub fn spawn(program: Option<Vec<String>>, cols: u16, rows: u16) -> Result<Self> {
        let pty_system = native_pty_system();
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(size)
            .map_err(|e| TdsrError::Pty(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = match program {
            Some(argv) if !argv.is_empty() => {
                info!("Spawning program: {:?}", argv);
                let mut cmd = CommandBuilder::new(&argv[0]);
                for arg in &argv[1..] {
                    cmd.arg(arg);
                }
                cmd
            }
            _ => {
                let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
                info!("Spawning login shell: {}", shell);
                CommandBuilder::new(shell)
            }
        };
        cmd.env("TSDR_ACTIVE", "true");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TdsrError::Pty(format!("Failed to spawn child: {}", e)))?;
        drop(pair.slave);

        let raw_fd = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| TdsrError::Pty("No master file descriptor".to_string()))?;
        let dup_fd =
            dup(raw_fd).map_err(|e| TdsrError::Pty(format!("Failed to dup master fd: {}", e)))?;
        let fd_owner = unsafe { OwnedFd::from_raw_fd(dup_fd) };
        let fd = fd_owner.as_raw_fd();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TdsrError::Pty(format!("Failed to get PTY reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TdsrError::Pty(format!("Failed to get PTY writer: {}", e)))?;

        debug!("PTY ready, fd {}", fd);

        Ok(Self {
            master: pair.master,
            reader,
            writer,
            _child: child,
            _fd_owner: fd_owner,
            fd,
        })
    }

    /// The master fd for event loop registration.
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// Read everything currently available from the child.
    ///
    /// One blocking read, then zero-timeout polls drain the rest, so a
    /// burst of output lands in a single chunk and is spoken once.
    /// EOF and EIO both mean the child is gone.
    pub fn read_all(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut buf = [0u8; 4096];

        let n = self.read_chunk(&mut buf)?;
        out.extend_from_slice(&buf[..n]);
        let mut total = n;

        while fd_readable(self.fd)? {
            let n = self.read_chunk(&mut buf)?;
            out.extend_from_slice(&buf[..n]);
            total += n;
        }

        Ok(total)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.reader.read(buf) {
            Ok(0) => Err(TdsrError::ChildGone),
            Ok(n) => Ok(n),
            // Linux reports EIO on the master once the child exits.
            Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => Err(TdsrError::ChildGone),
            Err(e) => Err(TdsrError::Io(e)),
        }
    }

    /// Forward user input to the child.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Propagate a new window size to the child's side of the PTY.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        debug!("Resizing PTY to {}x{}", cols, rows);
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TdsrError::Pty(format!("Failed to resize PTY: {}", e)))
    }
}
