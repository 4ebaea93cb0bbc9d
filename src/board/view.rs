//! Opponent Belief Grid
//!
//! What a player knows about the opponent's board: nothing but verified
//! hit/miss answers. It is deliberately not a [`Board`](crate::board::Board).

use serde::{Serialize, Deserialize};

use crate::BOARD_LEN;
use crate::board::Cell;

/// What is known about one opponent cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellBelief {
    /// No verified answer yet.
    Unknown,
    /// Verified empty water.
    Miss,
    /// Verified ship cell.
    Hit,
}

/// Guess lifecycle of one opponent cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessState {
    /// Never guessed.
    Unasked,
    /// Guess sent, no answer accepted yet.
    Asked,
    /// Answered with a verified opening of `true`.
    Hit,
    /// Answered with a verified opening of `false`.
    Miss,
    /// Answered with an opening that failed verification.
    Disputed,
}

impl GuessState {
    /// Belief implied by this state.
    pub fn belief(self) -> CellBelief {
        match self {
            GuessState::Hit => CellBelief::Hit,
            GuessState::Miss => CellBelief::Miss,
            GuessState::Unasked | GuessState::Asked | GuessState::Disputed => CellBelief::Unknown,
        }
    }

    /// Whether a verified answer has been accepted.
    pub fn is_resolved(self) -> bool {
        matches!(self, GuessState::Hit | GuessState::Miss)
    }
}

/// Per-cell guess state for the opponent's board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpponentGrid {
    states: [[GuessState; BOARD_LEN]; BOARD_LEN],
}

impl Default for OpponentGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl OpponentGrid {
    /// Grid with every cell unasked.
    pub fn new() -> Self {
        Self {
            states: [[GuessState::Unasked; BOARD_LEN]; BOARD_LEN],
        }
    }

    /// Guess state of a cell.
    #[inline]
    pub fn state(&self, cell: Cell) -> GuessState {
        self.states[cell.row as usize][cell.col as usize]
    }

    /// Belief about a cell.
    #[inline]
    pub fn belief(&self, cell: Cell) -> CellBelief {
        self.state(cell).belief()
    }

    pub(crate) fn set(&mut self, cell: Cell, state: GuessState) {
        self.states[cell.row as usize][cell.col as usize] = state;
    }

    /// Count of cells in a given state.
    pub fn count(&self, state: GuessState) -> usize {
        self.states.iter().flatten().filter(|s| **s == state).count()
    }

    /// Cells with a guess outstanding.
    pub fn outstanding(&self) -> Vec<Cell> {
        Cell::all().filter(|c| self.state(*c) == GuessState::Asked).collect()
    }

    /// Render the belief grid (`.` unknown, `o` miss, `X` hit).
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(BOARD_LEN * (BOARD_LEN + 1));
        for row in &self.states {
            for state in row {
                out.push(match state.belief() {
                    CellBelief::Unknown => '.',
                    CellBelief::Miss => 'o',
                    CellBelief::Hit => 'X',
                });
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_unknown() {
        let grid = OpponentGrid::new();
        assert!(Cell::all().all(|c| grid.belief(c) == CellBelief::Unknown));
        assert_eq!(grid.count(GuessState::Unasked), BOARD_LEN * BOARD_LEN);
    }

    #[test]
    fn test_disputed_stays_unknown() {
        let mut grid = OpponentGrid::new();
        let cell = Cell::new(2, 3).unwrap();
        grid.set(cell, GuessState::Disputed);
        assert_eq!(grid.belief(cell), CellBelief::Unknown);
        assert!(!grid.state(cell).is_resolved());
    }

    #[test]
    fn test_outstanding_and_render() {
        let mut grid = OpponentGrid::new();
        grid.set(Cell::new(0, 0).unwrap(), GuessState::Hit);
        grid.set(Cell::new(0, 1).unwrap(), GuessState::Miss);
        grid.set(Cell::new(4, 4).unwrap(), GuessState::Asked);

        assert_eq!(grid.outstanding(), vec![Cell::new(4, 4).unwrap()]);
        assert!(grid.render().starts_with("Xo........\n"));
    }
}
