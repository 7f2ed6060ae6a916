//! Terminal screen buffer
//!
//! The grid the review cursor reads from. It mirrors what the host
//! terminal is showing: glyph rendering stays with the host, this buffer
//! only records content and cursor movement so speech and review have
//! something to read.

use super::cell::{Cell, CellAttrs};

/// Saved state for the alternate screen (mode 1049).
#[derive(Clone)]
struct SavedScreen {
    cursor: (u16, u16),
    pen: CellAttrs,
    buffer: Vec<Vec<Cell>>,
}

pub struct Screen {
    /// `buffer[y][x]`, row major.
    pub buffer: Vec<Vec<Cell>>,

    /// Cursor position (x, y). Stays within the grid after every
    /// operation; the performer may park x at `cols` transiently to
    /// implement deferred autowrap.
    pub cursor: (u16, u16),

    /// Current pen attributes applied to newly drawn cells.
    pub pen: CellAttrs,

    /// Dimensions (cols, rows).
    pub size: (u16, u16),

    /// Scroll margins (top, bottom), 0-indexed inclusive. `None` means
    /// the full screen.
    pub margins: Option<(u16, u16)>,

    /// Cursor saved by DECSC (ESC 7).
    pub saved_cursor: Option<(u16, u16)>,

    /// Primary screen stashed away while mode 1049 is active.
    alternate_save: Option<SavedScreen>,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            buffer: blank_buffer(cols, rows),
            cursor: (0, 0),
            pen: CellAttrs::default(),
            size: (cols, rows),
            margins: None,
            saved_cursor: None,
            alternate_save: None,
        }
    }

    pub fn cols(&self) -> u16 {
        self.size.0
    }

    pub fn rows(&self) -> u16 {
        self.size.1
    }

    /// The scroll region in effect, full screen when no margins are set.
    pub fn scroll_bounds(&self) -> (u16, u16) {
        self.margins.unwrap_or((0, self.size.1.saturating_sub(1)))
    }

    /// Cell payload at (x, y): empty string for the right half of a wide
    /// character, `None` out of bounds.
    pub fn cell_data(&self, x: u16, y: u16) -> Option<&str> {
        self.buffer
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .map(|cell| cell.data.as_str())
    }

    /// A full row as text. Wide-filler cells contribute nothing, so the
    /// text reads naturally past CJK characters.
    pub fn line(&self, y: u16) -> String {
        match self.buffer.get(y as usize) {
            Some(row) => row.iter().map(|cell| cell.data.as_str()).collect(),
            None => String::new(),
        }
    }

    pub fn line_trimmed(&self, y: u16) -> String {
        self.line(y).trim_end().to_string()
    }

    /// Resize, preserving as much content as fits. The cursor and any
    /// margins are clamped into the new dimensions.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let mut new_buffer = blank_buffer(cols, rows);
        for (y, row) in new_buffer.iter_mut().enumerate() {
            if let Some(old_row) = self.buffer.get(y) {
                let n = (cols as usize).min(old_row.len());
                row[..n].clone_from_slice(&old_row[..n]);
            }
        }
        self.buffer = new_buffer;
        self.size = (cols, rows);
        self.margins = None;
        self.cursor.0 = self.cursor.0.min(cols.saturating_sub(1));
        self.cursor.1 = self.cursor.1.min(rows.saturating_sub(1));
    }

    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            for cell in row {
                cell.clear();
            }
        }
    }

    /// Erase from the cursor to the end of the screen.
    pub fn clear_below(&mut self) {
        let (x, y) = self.cursor;
        if let Some(row) = self.buffer.get_mut(y as usize) {
            for cell in row.iter_mut().skip(x as usize) {
                cell.clear();
            }
        }
        for row in self.buffer.iter_mut().skip(y as usize + 1) {
            for cell in row {
                cell.clear();
            }
        }
    }

    /// Erase from the start of the screen through the cursor.
    pub fn clear_above(&mut self) {
        let (x, y) = self.cursor;
        for row in self.buffer.iter_mut().take(y as usize) {
            for cell in row {
                cell.clear();
            }
        }
        if let Some(row) = self.buffer.get_mut(y as usize) {
            for cell in row.iter_mut().take(x as usize + 1) {
                cell.clear();
            }
        }
    }

    /// Scroll content up within the margins. A count of zero means one.
    /// The cursor does not move.
    pub fn scroll_up(&mut self, count: u16) {
        let count = count.max(1);
        let (top, bottom) = self.scroll_bounds();
        let (top, bottom) = (top as usize, bottom as usize);
        if top >= self.buffer.len() || bottom >= self.buffer.len() || top > bottom {
            return;
        }
        let cols = self.size.0 as usize;
        for _ in 0..count {
            for y in top..bottom {
                self.buffer.swap(y, y + 1);
            }
            self.buffer[bottom] = vec![Cell::blank(); cols];
        }
    }

    /// Scroll content down within the margins. A count of zero means one.
    /// The cursor does not move.
    pub fn scroll_down(&mut self, count: u16) {
        let count = count.max(1);
        let (top, bottom) = self.scroll_bounds();
        let (top, bottom) = (top as usize, bottom as usize);
        if top >= self.buffer.len() || bottom >= self.buffer.len() || top > bottom {
            return;
        }
        let cols = self.size.0 as usize;
        for _ in 0..count {
            for y in (top..bottom).rev() {
                self.buffer.swap(y, y + 1);
            }
            self.buffer[top] = vec![Cell::blank(); cols];
        }
    }

    /// Insert blank lines at the cursor, shifting the rest of the scroll
    /// region down.
    pub fn insert_lines(&mut self, count: u16) {
        let count = count.max(1);
        let y = self.cursor.1 as usize;
        let (_, bottom) = self.scroll_bounds();
        let bottom = bottom as usize;
        let cols = self.size.0 as usize;
        if y > bottom || bottom >= self.buffer.len() {
            return;
        }
        for _ in 0..count {
            for row in (y..bottom).rev() {
                self.buffer.swap(row, row + 1);
            }
            self.buffer[y] = vec![Cell::blank(); cols];
        }
    }

    /// Delete lines at the cursor, shifting the rest of the scroll region
    /// up.
    pub fn delete_lines(&mut self, count: u16) {
        let count = count.max(1);
        let y = self.cursor.1 as usize;
        let (_, bottom) = self.scroll_bounds();
        let bottom = bottom as usize;
        let cols = self.size.0 as usize;
        if y > bottom || bottom >= self.buffer.len() {
            return;
        }
        for _ in 0..count {
            for row in y..bottom {
                self.buffer.swap(row, row + 1);
            }
            self.buffer[bottom] = vec![Cell::blank(); cols];
        }
    }

    /// Insert blank cells at the cursor, pushing the rest of the row
    /// right.
    pub fn insert_chars(&mut self, count: u16) {
        let count = count.max(1);
        let (x, y) = (self.cursor.0 as usize, self.cursor.1 as usize);
        let cols = self.size.0 as usize;
        if let Some(row) = self.buffer.get_mut(y) {
            for _ in 0..count {
                if x < cols {
                    for i in (x..cols - 1).rev() {
                        row.swap(i, i + 1);
                    }
                    row[x] = Cell::blank();
                }
            }
        }
    }

    /// Delete cells at the cursor, pulling the rest of the row left.
    pub fn delete_chars(&mut self, count: u16) {
        let count = count.max(1);
        let (x, y) = (self.cursor.0 as usize, self.cursor.1 as usize);
        let cols = self.size.0 as usize;
        if let Some(row) = self.buffer.get_mut(y) {
            for _ in 0..count {
                if x < cols {
                    for i in x..cols - 1 {
                        row.swap(i, i + 1);
                    }
                    if cols > 0 {
                        row[cols - 1] = Cell::blank();
                    }
                }
            }
        }
    }

    /// Set scroll margins from 1-indexed DECSTBM parameters. A region
    /// covering the whole screen, or a degenerate one, resets margins.
    /// The cursor homes either way.
    pub fn set_margins(&mut self, top: u16, bottom: u16) {
        let top0 = top.saturating_sub(1);
        let bottom0 = bottom.saturating_sub(1).min(self.size.1.saturating_sub(1));
        if top0 < bottom0 && !(top0 == 0 && bottom0 == self.size.1.saturating_sub(1)) {
            self.margins = Some((top0, bottom0));
        } else {
            self.margins = None;
        }
        self.cursor = (0, 0);
    }

    /// Enter the alternate screen (mode 1049): stash a deep copy of the
    /// buffer and cursor, then present a cleared screen with the cursor
    /// homed.
    pub fn enter_alternate(&mut self) {
        self.alternate_save = Some(SavedScreen {
            cursor: self.cursor,
            pen: self.pen,
            buffer: self.buffer.clone(),
        });
        self.cursor = (0, 0);
        self.clear();
    }

    /// Leave the alternate screen, restoring the stashed buffer and
    /// cursor. Without a matching save this is a no-op.
    pub fn leave_alternate(&mut self) {
        if let Some(saved) = self.alternate_save.take() {
            self.buffer = saved.buffer;
            self.cursor = saved.cursor;
            self.pen = saved.pen;
        }
    }

    pub fn in_alternate(&self) -> bool {
        self.alternate_save.is_some()
    }
}

fn blank_buffer(cols: u16, rows: u16) -> Vec<Vec<Cell>> {
    vec![vec![Cell::blank(); cols as usize]; rows as usize]
}
