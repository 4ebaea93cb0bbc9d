//! Board & Commitment Model
//!
//! The secret layout, its blinding nonces and the belief grid kept about the
//! opponent's board.

pub mod cell;
pub mod layout;
pub mod nonce;
pub mod view;

use thiserror::Error;

pub use cell::Cell;
pub use layout::{Board, create_board};
pub use nonce::{Nonce, NonceMatrix, NONCE_LEN, generate_nonces};
pub use view::{CellBelief, GuessState, OpponentGrid};

/// Board validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Layout is not BOARD_LEN × BOARD_LEN.
    #[error("invalid board shape: {rows} rows (row {row:?} has {cols} columns)")]
    InvalidBoardShape {
        /// Number of rows supplied.
        rows: usize,
        /// First offending row, if the row count itself was right.
        row: Option<usize>,
        /// Column count of the offending row.
        cols: usize,
    },

    /// Wrong number of occupied cells.
    #[error("invalid ship count: expected {expected}, found {found}")]
    InvalidShipCount {
        /// Required ship cells.
        expected: usize,
        /// Occupied cells in the layout.
        found: usize,
    },

    /// Coordinate off the board.
    #[error("cell ({row}, {col}) is off the board")]
    CellOutOfBounds {
        /// Row.
        row: usize,
        /// Column.
        col: usize,
    },
}
