//! Secret Board Layout
//!
//! The owner's own N×N ship grid. It never leaves the owning process;
//! only openings of individual cells are ever sent.

use serde::{Serialize, Deserialize};

use crate::{BOARD_LEN, SHIP_CELLS};
use crate::board::{BoardError, Cell};

/// Validated ship layout (`true` = ship present).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[bool; BOARD_LEN]; BOARD_LEN],
}

impl Board {
    /// Build a board from a row-major layout.
    ///
    /// The layout must be exactly `BOARD_LEN` rows of `BOARD_LEN` cells with
    /// exactly `SHIP_CELLS` occupied cells.
    pub fn from_layout(layout: &[Vec<bool>]) -> Result<Self, BoardError> {
        if layout.len() != BOARD_LEN {
            return Err(BoardError::InvalidBoardShape {
                rows: layout.len(),
                row: None,
                cols: 0,
            });
        }

        let mut cells = [[false; BOARD_LEN]; BOARD_LEN];
        for (i, row) in layout.iter().enumerate() {
            if row.len() != BOARD_LEN {
                return Err(BoardError::InvalidBoardShape {
                    rows: layout.len(),
                    row: Some(i),
                    cols: row.len(),
                });
            }
            cells[i].copy_from_slice(row);
        }

        Self::from_cells(cells)
    }

    /// Build a board from a fixed-size grid.
    pub fn from_cells(cells: [[bool; BOARD_LEN]; BOARD_LEN]) -> Result<Self, BoardError> {
        let occupied = cells.iter().flatten().filter(|c| **c).count();
        if occupied != SHIP_CELLS {
            return Err(BoardError::InvalidShipCount {
                expected: SHIP_CELLS,
                found: occupied,
            });
        }
        Ok(Self { cells })
    }

    /// Build a board with ships at the given coordinates.
    pub fn from_ship_cells(ships: &[Cell]) -> Result<Self, BoardError> {
        let mut cells = [[false; BOARD_LEN]; BOARD_LEN];
        for ship in ships {
            if !ship.is_on_board() {
                return Err(BoardError::CellOutOfBounds {
                    row: ship.row as usize,
                    col: ship.col as usize,
                });
            }
            cells[ship.row as usize][ship.col as usize] = true;
        }
        Self::from_cells(cells)
    }

    /// Truth value at a cell.
    #[inline]
    pub fn is_ship(&self, cell: Cell) -> bool {
        self.cells[cell.row as usize][cell.col as usize]
    }

    /// All occupied cells in leaf order.
    pub fn ship_cells(&self) -> Vec<Cell> {
        Cell::all().filter(|c| self.is_ship(*c)).collect()
    }
}

/// Validate a layout into a [`Board`].
pub fn create_board(layout: &[Vec<bool>]) -> Result<Board, BoardError> {
    Board::from_layout(layout)
}
