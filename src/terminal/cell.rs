//! A single character position on the screen

/// Presentation attributes carried by the cursor pen and stamped onto
/// cells as they are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CellAttrs {
    /// ANSI color index, `None` for the terminal default.
    pub fg: Option<u8>,
    pub bg: Option<u8>,
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

/// One grid cell.
///
/// `data` holds a base character plus any combining marks. The right
/// half of a wide character is an empty cell; review navigation skips
/// leftward off those to land on the base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub data: String,
    pub attrs: CellAttrs,
}

impl Cell {
    /// A blank cell (a plain space).
    pub fn blank() -> Self {
        Self {
            data: " ".to_string(),
            attrs: CellAttrs::default(),
        }
    }

    /// The empty right half of a wide character.
    pub fn wide_filler() -> Self {
        Self {
            data: String::new(),
            attrs: CellAttrs::default(),
        }
    }

    pub fn is_wide_filler(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.data.push(' ');
        self.attrs = CellAttrs::default();
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cell_is_a_space() {
        let cell = Cell::blank();
        assert_eq!(cell.data, " ");
        assert!(!cell.is_wide_filler());
    }

    #[test]
    fn wide_filler_is_empty() {
        let cell = Cell::wide_filler();
        assert_eq!(cell.data, "");
        assert!(cell.is_wide_filler());
    }

    #[test]
    fn clear_resets_data_and_attrs() {
        let mut cell = Cell {
            data: "語".to_string(),
            attrs: CellAttrs {
                bold: true,
                ..Default::default()
            },
        };
        cell.clear();
        assert_eq!(cell, Cell::blank());
    }
}
