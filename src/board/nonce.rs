//! Per-Cell Blinding Nonces
//!
//! One 32-byte secret per cell, drawn from the OS CSPRNG once per game.
//! Without them a leaf hash would reveal its cell's truth value.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::BOARD_LEN;
use crate::board::Cell;

/// Length of a cell nonce in bytes.
pub const NONCE_LEN: usize = 32;

/// A single cell nonce.
pub type Nonce = [u8; NONCE_LEN];

/// Secret nonce for every cell of one board.
#[derive(Clone, PartialEq, Eq)]
pub struct NonceMatrix {
    nonces: [[Nonce; BOARD_LEN]; BOARD_LEN],
}

impl NonceMatrix {
    /// Draw a fresh matrix from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut nonces = [[[0u8; NONCE_LEN]; BOARD_LEN]; BOARD_LEN];
        for row in nonces.iter_mut() {
            for nonce in row.iter_mut() {
                OsRng.fill_bytes(nonce);
            }
        }
        Self { nonces }
    }

    /// Wrap explicit nonces (fixtures and replays).
    pub fn from_nonces(nonces: [[Nonce; BOARD_LEN]; BOARD_LEN]) -> Self {
        Self { nonces }
    }

    /// Nonce at a cell.
    #[inline]
    pub fn get(&self, cell: Cell) -> &Nonce {
        &self.nonces[cell.row as usize][cell.col as usize]
    }
}

impl std::fmt::Debug for NonceMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NonceMatrix(<redacted>)")
    }
}

/// Generate a fresh nonce matrix for a new game.
pub fn generate_nonces() -> NonceMatrix {
    NonceMatrix::generate()
}
