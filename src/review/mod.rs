//! Review cursor
//!
//! A reading position independent of the program cursor. The motion and
//! speech logic lives in `state`; this type only tracks the position and
//! keeps it inside the screen across resizes.

pub struct ReviewCursor {
    /// Current position (x, y).
    pub pos: (u16, u16),

    /// Screen dimensions (cols, rows) the position is clamped to.
    pub bounds: (u16, u16),
}

impl ReviewCursor {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            pos: (0, 0),
            bounds: (cols, rows),
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.bounds = (cols, rows);
        self.pos.0 = self.pos.0.min(cols.saturating_sub(1));
        self.pos.1 = self.pos.1.min(rows.saturating_sub(1));
    }

    /// Follow the program cursor, clamped to the grid. The emulator can
    /// transiently hold x == cols for deferred autowrap.
    pub fn track(&mut self, cursor: (u16, u16)) {
        self.pos.0 = cursor.0.min(self.bounds.0.saturating_sub(1));
        self.pos.1 = cursor.1.min(self.bounds.1.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_clamps_position() {
        let mut cursor = ReviewCursor::new(80, 24);
        cursor.pos = (79, 23);

        cursor.resize(40, 12);
        assert_eq!(cursor.pos, (39, 11));

        cursor.resize(100, 50);
        assert_eq!(cursor.pos, (39, 11));
    }

    #[test]
    fn track_clamps_wrap_pending_cursor() {
        let mut cursor = ReviewCursor::new(10, 5);
        cursor.track((10, 2));
        assert_eq!(cursor.pos, (9, 2));
    }
}
