use std::fmt;
use std::str::FromStr;

use crate::error::MoveError;

/// Number of board rows.
pub const ROWS: usize = 9;

/// Number of board columns.
pub const COLS: usize = 7;

/// Size of the (from-row, from-col, dest-row, dest-col) action space.
pub const ACTION_SPACE: usize = ROWS * COLS * ROWS * COLS;

/// A single board square, rows and columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    row: u8,
    col: u8,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Result<Self, MoveError> {
        if row >= ROWS || col >= COLS {
            return Err(MoveError::InvalidMove(format!(
                "cell ({row}, {col}) is outside the {ROWS}x{COLS} board"
            )));
        }
        Ok(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Reflect across the row midline.
    pub fn invert(self) -> Self {
        Self {
            row: (ROWS as u8 - 1) - self.row,
            col: self.col,
        }
    }
}

/// A move from one cell to another. `from == dest` is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    from: Cell,
    dest: Cell,
}

impl Move {
    pub fn new(from: Cell, dest: Cell) -> Self {
        Self { from, dest }
    }

    pub fn from_cell(self) -> Cell {
        self.from
    }

    pub fn dest_cell(self) -> Cell {
        self.dest
    }

    /// Coordinate encoding: (from_row, from_col, dest_row, dest_col).
    pub fn encode(self) -> (usize, usize, usize, usize) {
        (
            self.from.row(),
            self.from.col(),
            self.dest.row(),
            self.dest.col(),
        )
    }

    pub fn decode(
        from_row: usize,
        from_col: usize,
        dest_row: usize,
        dest_col: usize,
    ) -> Result<Self, MoveError> {
        Ok(Self {
            from: Cell::new(from_row, from_col)?,
            dest: Cell::new(dest_row, dest_col)?,
        })
    }

    /// Mirror the move for the opposite side's point of view.
    pub fn invert(self) -> Self {
        Self {
            from: self.from.invert(),
            dest: self.dest.invert(),
        }
    }

    /// Flat index into the row-major (9, 7, 9, 7) action tensor.
    pub fn index(self) -> usize {
        let (fr, fc, dr, dc) = self.encode();
        ((fr * COLS + fc) * ROWS + dr) * COLS + dc
    }

    pub fn from_index(index: usize) -> Result<Self, MoveError> {
        if index >= ACTION_SPACE {
            return Err(MoveError::InvalidMove(format!(
                "action index {index} is outside the action space of {ACTION_SPACE}"
            )));
        }
        let dc = index % COLS;
        let rest = index / COLS;
        let dr = rest % ROWS;
        let rest = rest / ROWS;
        let fc = rest % COLS;
        let fr = rest / COLS;
        Self::decode(fr, fc, dr, dc)
    }
}

/// 0/1 indicator over the full action space, 1 exactly at the given moves.
pub fn mask(legal_moves: &[Move]) -> Vec<f32> {
    let mut mask = vec![0.0f32; ACTION_SPACE];
    for mv in legal_moves {
        mask[mv.index()] = 1.0;
    }
    mask
}

/// Space-separated move text, the form the rules service keys positions by.
pub fn format_history(history: &[Move]) -> String {
    history
        .iter()
        .map(Move::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            (b'A' + self.from.col) as char,
            self.from.row + 1,
            (b'A' + self.dest.col) as char,
            self.dest.row + 1
        )
    }
}

impl FromStr for Move {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(MoveError::InvalidMove(format!(
                "expected 4 characters, got {s:?}"
            )));
        }

        let parse_cell = |col: u8, row: u8| -> Result<Cell, MoveError> {
            if !col.is_ascii_uppercase() || !(b'1'..=b'9').contains(&row) {
                return Err(MoveError::InvalidMove(format!("malformed cell in {s:?}")));
            }
            Cell::new((row - b'1') as usize, (col - b'A') as usize)
        };

        Ok(Self {
            from: parse_cell(bytes[0], bytes[1])?,
            dest: parse_cell(bytes[2], bytes[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let m = mv("B2C4");
        assert_eq!(m.encode(), (1, 1, 3, 2));
        assert_eq!(m.to_string(), "B2C4");
    }

    #[test]
    fn test_parse_rejects_out_of_bounds() {
        assert!("H1A1".parse::<Move>().is_err());
        assert!("A0A1".parse::<Move>().is_err());
        assert!("A1A".parse::<Move>().is_err());
        assert!("a1a2".parse::<Move>().is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_bounds() {
        assert_eq!(Move::decode(0, 0, 8, 6).unwrap(), mv("A1G9"));
        assert!(matches!(
            Move::decode(9, 0, 0, 0),
            Err(MoveError::InvalidMove(_))
        ));
        assert!(Move::decode(0, 7, 0, 0).is_err());
    }

    #[test]
    fn test_invert_reflects_rows() {
        let m = mv("A1G9");
        assert_eq!(m.invert(), mv("A9G1"));
        assert_eq!(mv("D5D5").invert(), mv("D5D5"));
    }

    #[test]
    fn test_invert_twice_is_identity() {
        for index in (0..ACTION_SPACE).step_by(37) {
            let m = Move::from_index(index).unwrap();
            assert_eq!(m.invert().invert(), m);
        }
    }

    #[test]
    fn test_index_matches_row_major_layout() {
        assert_eq!(mv("A1A1").index(), 0);
        assert_eq!(mv("B1A1").index(), ROWS * COLS);
        assert_eq!(mv("A1B1").index(), 1);
        assert_eq!(mv("G9G9").index(), ACTION_SPACE - 1);
        assert!(Move::from_index(ACTION_SPACE).is_err());
    }

    #[test]
    fn test_index_inverse() {
        for index in [0, 1, 62, 63, 1000, 2024, ACTION_SPACE - 1] {
            assert_eq!(Move::from_index(index).unwrap().index(), index);
        }
    }

    #[test]
    fn test_mask_marks_only_legal_moves() {
        let legal = vec![mv("B2B3"), mv("C1E3")];
        let mask = mask(&legal);

        assert_eq!(mask.len(), ACTION_SPACE);
        assert_relative_eq!(mask.iter().sum::<f32>(), 2.0);
        assert_eq!(mask[legal[0].index()], 1.0);
        assert_eq!(mask[legal[1].index()], 1.0);
    }

    #[test]
    fn test_format_history() {
        assert_eq!(format_history(&[]), "");
        assert_eq!(format_history(&[mv("B2B3"), mv("C8C7")]), "B2B3 C8C7");
    }
}
