//! TDSR entry point
//!
//! The event loop waits on three sources and a deadline:
//! 1. stdin — the user's keystrokes, dispatched through the handler stack
//! 2. the PTY master — child output, parsed and spoken
//! 3. a signal self-pipe — SIGWINCH, observed synchronously
//!
//! Within one wake, resize is handled before input and input before
//! output, so keys are never dispatched against stale dimensions and a
//! keystroke always silences output arriving in the same wake.

use clap::Parser as ClapParser;
use log::{debug, error, info};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use once_cell::sync::Lazy;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::io::RawFd;
use std::process;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tdsr::input::{
    add_binding, default_keymap, HandlerAction, KeyAction, RootDispatcher,
};
use tdsr::speech::{default_server_command, ServerSynth};
use tdsr::state::config::Config;
use tdsr::state::State;
use tdsr::terminal::{fd_readable, restore_termios, set_raw_mode, terminal_size, Emulator, Pty};
use tdsr::{Result, TdsrError};

const SIGNAL: Token = Token(0);
const STDIN: Token = Token(1);
const PTY: Token = Token(2);

/// How long one emulator feed's draw events may coalesce before the
/// speech buffer is flushed.
const OUTPUT_COALESCE: Duration = Duration::from_millis(5);

/// A cursor position report the child requested from the terminal. It
/// arrives on stdin but belongs to the child; interpreting it as a
/// command would eat it.
static CPR_REPLY: Lazy<regex::bytes::Regex> =
    Lazy::new(|| regex::bytes::Regex::new(r"^\x1b\[[0-9]+;[0-9]+R").expect("cpr regex"));

/// Write end of the signal self-pipe, for the SIGWINCH handler.
static SIGNAL_PIPE_WR: AtomicI32 = AtomicI32::new(-1);

extern "C" fn handle_sigwinch(_: libc::c_int) {
    let fd = SIGNAL_PIPE_WR.load(Ordering::Relaxed);
    if fd >= 0 {
        unsafe {
            libc::write(fd, b"w".as_ptr() as *const libc::c_void, 1);
        }
    }
}

#[derive(ClapParser, Debug)]
#[command(name = "tdsr", version, about = "A console screen reader")]
struct Cli {
    /// Speech server command to run (shell-split)
    #[arg(short = 's', long = "speech-server", value_name = "CMD")]
    speech_server: Option<String>,

    /// Log debug output to tdsr.log
    #[arg(long)]
    debug: bool,

    /// Program to run; defaults to $SHELL
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "PROGRAM")]
    program: Vec<String>,
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        use std::fs::OpenOptions;
        match OpenOptions::new().create(true).append(true).open("tdsr.log") {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
                info!("tdsr {} starting, debug log in tdsr.log", tdsr::VERSION);
            }
            Err(e) => {
                eprintln!("Warning: cannot open tdsr.log: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli) {
        error!("Fatal error: {}", e);
        eprintln!("tdsr: {}", e);
        process::exit(1);
    }
}

/// Restores the parent tty on every exit path. Keeping the terminal
/// usable after a crash matters more here than anywhere: the user may
/// not be able to see that the shell is wedged.
struct TermiosGuard {
    fd: RawFd,
    termios: libc::termios,
}

impl Drop for TermiosGuard {
    fn drop(&mut self) {
        restore_termios(self.fd, &self.termios);
        debug!("Terminal attributes restored");
    }
}

fn run(cli: Cli) -> Result<()> {
    let stdin_fd = io::stdin().as_raw_fd();
    if unsafe { libc::isatty(stdin_fd) } == 0 {
        return Err(TdsrError::Terminal(
            "tdsr requires an interactive terminal".to_string(),
        ));
    }

    let original_termios = set_raw_mode(stdin_fd)?;
    let _guard = TermiosGuard {
        fd: stdin_fd,
        termios: original_termios,
    };

    let (cols, rows) = terminal_size(stdin_fd)?;
    info!("Terminal size {}x{}", cols, rows);

    let server_command = match cli.speech_server.as_deref() {
        Some(cmd) => shlex::split(cmd).ok_or_else(|| {
            TdsrError::Speech(format!("unparsable speech server command: {}", cmd))
        })?,
        None => default_server_command(),
    };
    let synth = Box::new(ServerSynth::spawn(server_command)?);

    let config = Config::load()?;
    info!("Configuration loaded from {:?}", config.path());

    // Plugin bindings ride under ESC like the built-ins.
    let mut keymap = default_keymap();
    for (name, suffix) in &config.plugins {
        let mut key = vec![0x1b];
        key.extend_from_slice(suffix.as_bytes());
        add_binding(&mut keymap, key, KeyAction::Plugin(name.clone()));
    }

    let mut state = State::new(cols, rows, config, synth)?;
    state.handlers.push(Box::new(RootDispatcher::new(keymap)));

    let program = if cli.program.is_empty() {
        None
    } else {
        Some(cli.program)
    };
    let mut pty = Pty::spawn(program, cols, rows)?;
    let mut emulator = Emulator::new(cols, rows);

    // Self-pipe for SIGWINCH: the handler writes a byte, the loop sees
    // the read end become readable.
    let (pipe_rd, pipe_wr) = nix::unistd::pipe()
        .map_err(|e| TdsrError::Terminal(format!("signal pipe failed: {}", e)))?;
    for fd in [pipe_rd.as_raw_fd(), pipe_wr.as_raw_fd()] {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
    SIGNAL_PIPE_WR.store(pipe_wr.as_raw_fd(), Ordering::Relaxed);
    unsafe {
        signal::signal(Signal::SIGWINCH, SigHandler::Handler(handle_sigwinch))
            .map_err(|e| TdsrError::Terminal(format!("SIGWINCH handler failed: {}", e)))?;
    }

    let pty_fd = pty.as_raw_fd();
    let signal_fd = pipe_rd.as_raw_fd();

    let mut poll = Poll::new()?;
    poll.registry()
        .register(&mut SourceFd(&signal_fd), SIGNAL, Interest::READABLE)?;
    poll.registry()
        .register(&mut SourceFd(&stdin_fd), STDIN, Interest::READABLE)?;
    poll.registry()
        .register(&mut SourceFd(&pty_fd), PTY, Interest::READABLE)?;

    let mut events = Events::with_capacity(16);

    info!("Entering event loop");
    state.say("tdsr, presented by Lighthouse of San Francisco", false)?;

    loop {
        let timeout = state.time_until_next_scheduled();
        if let Err(e) = poll.poll(&mut events, timeout) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        let mut resize_ready = false;
        let mut input_ready = false;
        let mut output_ready = false;
        for event in events.iter() {
            match event.token() {
                SIGNAL => resize_ready = true,
                STDIN => input_ready = true,
                PTY => output_ready = true,
                _ => {}
            }
        }

        // Resize first, so everything after sees the new dimensions.
        if resize_ready {
            let mut sink = [0u8; 16];
            while unsafe {
                libc::read(signal_fd, sink.as_mut_ptr() as *mut libc::c_void, sink.len())
            } > 0
            {}
            handle_resize(stdin_fd, &mut pty, &mut emulator, &mut state)?;
        }

        if input_ready {
            // Registration is edge triggered; drain stdin in 4 KiB
            // chunks, each dispatched as its own event.
            loop {
                let n = handle_input(&mut state, &mut emulator, &mut pty)?;
                if n == 0 || !fd_readable(stdin_fd)? {
                    break;
                }
            }
        }

        if output_ready {
            match handle_output(&mut pty, &mut emulator, &mut state) {
                Ok(()) => {}
                Err(TdsrError::ChildGone) => {
                    info!("Child exited, shutting down");
                    state.flush_speech()?;
                    state.synth.close()?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        state.run_scheduled(emulator.screen())?;
    }
}

fn handle_resize(
    stdin_fd: RawFd,
    pty: &mut Pty,
    emulator: &mut Emulator,
    state: &mut State,
) -> Result<()> {
    let (cols, rows) = terminal_size(stdin_fd)?;
    info!("Resized to {}x{}", cols, rows);
    pty.resize(cols, rows)?;
    emulator.resize(cols, rows);
    state.resize(cols, rows);
    Ok(())
}

/// One chunk of user input: silence speech, drop pending deferred reads,
/// then let the handler stack decide what the bytes mean. Returns the
/// number of bytes consumed.
fn handle_input(state: &mut State, emulator: &mut Emulator, pty: &mut Pty) -> Result<usize> {
    let mut buf = [0u8; 4096];
    let n = match io::stdin().read(&mut buf) {
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    if n == 0 {
        return Ok(0);
    }
    let input = &buf[..n];

    // Some shells ask the terminal where the cursor is; the reply is not
    // a keystroke. Forward it untouched.
    if CPR_REPLY.is_match(input) {
        pty.write_all(input)?;
        return Ok(n);
    }

    state.tap.last_key.clear();
    state.silence()?;
    state.clear_scheduled();
    state.delaying_output = false;
    state.tempsilence = false;

    let Some(mut handler) = state.handlers.pop() else {
        pty.write_all(input)?;
        return Ok(n);
    };
    let action = handler.process(input, state, emulator.screen())?;
    match action {
        HandlerAction::Consumed => state.handlers.push(handler),
        HandlerAction::Passthrough => {
            state.handlers.push(handler);
            pty.write_all(input)?;
        }
        HandlerAction::Pop => {}
        HandlerAction::Push(next) => {
            state.handlers.push(handler);
            state.handlers.push(next);
        }
    }

    // Remembered so the emulator can tell the echo of this keystroke
    // apart from real output.
    state.tap.last_key = String::from_utf8_lossy(input).into_owned();
    Ok(n)
}

/// One fully drained burst of child output: update the grid and speech
/// buffer, echo the bytes to the terminal, then arrange for the
/// accumulated text to be spoken.
fn handle_output(pty: &mut Pty, emulator: &mut Emulator, state: &mut State) -> Result<()> {
    let mut chunk = Vec::with_capacity(4096);
    pty.read_all(&mut chunk)?;

    state.tap.quiet = state.quiet;
    state.tap.temp_muted = state.tempsilence;
    state.tap.key_echo = state.config.key_echo();
    state.tap.line_pause = state.config.line_pause();

    let cursor_before = emulator.cursor();
    emulator.feed(&chunk, &mut state.tap);

    let mut stdout = io::stdout().lock();
    stdout.write_all(&chunk)?;
    stdout.flush()?;

    if state.config.cursor_tracking() && emulator.cursor() != cursor_before {
        state.review.track(emulator.cursor());
    }

    // Keystroke echoes found during the feed go out through character
    // speech, ahead of any buffered text.
    let echoes: Vec<String> = std::mem::take(&mut state.tap.echoes);
    for echo in echoes {
        state.say_character(&echo)?;
    }

    // Lines completed by linefeeds are spoken now; the unfinished tail
    // waits for the coalescing window in case more output is coming.
    if state.tap.buffer.has_pending_lines() {
        state.flush_pending_lines()?;
    }

    if !state.quiet
        && !state.tempsilence
        && !state.tap.buffer.is_empty()
        && !state.delaying_output
    {
        state.delaying_output = true;
        state.schedule(OUTPUT_COALESCE, false, |st, _screen| {
            st.delaying_output = false;
            st.flush_speech()
        });
    }

    Ok(())
}
