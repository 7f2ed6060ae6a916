//! Terminal emulator built on the vte parser
//!
//! Child output bytes go through the parser, which drives the performer
//! to update the screen grid and the speech tap in lockstep.

use super::performer::ScreenPerformer;
use super::Screen;
use crate::speech::SpeechTap;
use log::debug;
use vte::Parser;

pub struct Emulator {
    screen: Screen,
    parser: Parser,
}

impl Emulator {
    pub fn new(cols: u16, rows: u16) -> Self {
        debug!("Creating emulator, {}x{}", cols, rows);
        Self {
            screen: Screen::new(cols, rows),
            parser: Parser::new(),
        }
    }

    /// Feed a chunk of child output. Grid updates always happen; whether
    /// text also reaches the speech buffer is governed by the tap's
    /// gating flags.
    pub fn feed(&mut self, bytes: &[u8], tap: &mut SpeechTap) {
        let mut performer = ScreenPerformer {
            screen: &mut self.screen,
            tap,
        };
        for &byte in bytes {
            self.parser.advance(&mut performer, byte);
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        debug!("Resizing emulator to {}x{}", cols, rows);
        self.screen.resize(cols, rows);
    }

    /// Program cursor position (x, y).
    pub fn cursor(&self) -> (u16, u16) {
        self.screen.cursor
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }
}
