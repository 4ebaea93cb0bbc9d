//! Board Coordinates
//!
//! A cell is addressed by (row, col); its Merkle leaf index is
//! `row * BOARD_LEN + col` (row-major).

use serde::{Serialize, Deserialize};

use crate::BOARD_LEN;
use crate::board::BoardError;

/// A single board coordinate.
///
/// Ordered row-major so BTree collections iterate in leaf order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row (0-based).
    pub row: u8,
    /// Column (0-based).
    pub col: u8,
}

impl Cell {
    /// Create a cell, rejecting coordinates off the board.
    pub fn new(row: usize, col: usize) -> Result<Self, BoardError> {
        if row >= BOARD_LEN || col >= BOARD_LEN {
            return Err(BoardError::CellOutOfBounds { row, col });
        }
        Ok(Self { row: row as u8, col: col as u8 })
    }

    /// Cell for a leaf index, if the index addresses a real cell.
    pub fn from_leaf_index(index: usize) -> Option<Self> {
        if index >= BOARD_LEN * BOARD_LEN {
            return None;
        }
        Some(Self {
            row: (index / BOARD_LEN) as u8,
            col: (index % BOARD_LEN) as u8,
        })
    }

    /// Row-major leaf index.
    #[inline]
    pub fn leaf_index(&self) -> usize {
        self.row as usize * BOARD_LEN + self.col as usize
    }

    /// Whether the coordinates lie on the board.
    ///
    /// Cells arriving over the wire skip [`Cell::new`], so receivers check this.
    #[inline]
    pub fn is_on_board(&self) -> bool {
        (self.row as usize) < BOARD_LEN && (self.col as usize) < BOARD_LEN
    }

    /// Iterate every cell in leaf order.
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..BOARD_LEN * BOARD_LEN).filter_map(Cell::from_leaf_index)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_index_row_major() {
        assert_eq!(Cell::new(0, 0).unwrap().leaf_index(), 0);
        assert_eq!(Cell::new(2, 3).unwrap().leaf_index(), 23);
        assert_eq!(Cell::new(9, 9).unwrap().leaf_index(), 99);
    }

    #[test]
    fn test_from_leaf_index() {
        assert_eq!(Cell::from_leaf_index(23), Some(Cell { row: 2, col: 3 }));
        assert_eq!(Cell::from_leaf_index(100), None);
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(Cell::new(10, 0), Err(BoardError::CellOutOfBounds { .. })));
        assert!(!Cell { row: 0, col: 10 }.is_on_board());
    }

    #[test]
    fn test_all_cells_in_order() {
        let cells: Vec<Cell> = Cell::all().collect();
        assert_eq!(cells.len(), BOARD_LEN * BOARD_LEN);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.leaf_index(), i);
        }
    }
}
