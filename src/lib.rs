//! # Battleship Fair Play
//!
//! Protocol core for two-party Battleship where neither player trusts the
//! other and an external ledger holds the stakes and settles disputes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  BATTLESHIP FAIR PLAY                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── hash.rs     - Domain-separated SHA-256                  │
//! │                                                              │
//! │  board/          - Secret board and opponent view            │
//! │  ├── cell.rs     - Cell coordinates and leaf indices         │
//! │  ├── layout.rs   - Board validation                          │
//! │  ├── nonce.rs    - Per-cell blinding nonces                  │
//! │  └── view.rs     - Belief grid about the opponent            │
//! │                                                              │
//! │  proof/          - Commitments                               │
//! │  ├── merkle.rs   - Padded Merkle tree and proofs             │
//! │  └── commitment.rs - Board commitment and openings           │
//! │                                                              │
//! │  network/        - Peer messages (transport agnostic)        │
//! │  ├── auth.rs     - Ed25519 identities and signed payloads    │
//! │  ├── protocol.rs - Message types and codecs                  │
//! │  └── session.rs  - Guess/response state machine              │
//! │                                                              │
//! │  arbiter/        - Ledger contract and player driver         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantees
//!
//! - A board is fixed by its Merkle root before the first guess
//! - Every answer is an opening checked against that root
//! - Every peer message is signed and checked before it is used
//! - Any failed opening can be handed to the ledger as evidence
//!
//! Hashing and commitments are fully deterministic: identical board and
//! nonces give a byte-identical root on every platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod board;
pub mod proof;
pub mod network;
pub mod arbiter;
pub mod config;

// Re-export commonly used types
pub use board::{Board, BoardError, Cell, CellBelief, GuessState, NonceMatrix, create_board, generate_nonces};
pub use proof::{BoardCommitment, CellEvidence, CommittedBoard, MerkleError, MerkleProof, build_commitment};
pub use network::{Identity, PlayerId, PlayerSession, ProtocolError};
pub use arbiter::{InMemoryLedger, Ledger, LedgerError, LedgerWatcher, Player, PlayerError};
pub use config::{GameConfig, LedgerConfig};

/// Board side length.
pub const BOARD_LEN: usize = 10;

/// Cells on a board.
pub const CELL_COUNT: usize = BOARD_LEN * BOARD_LEN;

/// Occupied cells on every valid board.
pub const SHIP_CELLS: usize = 10;

/// Leaf slots in the commitment tree (next power of two above CELL_COUNT).
pub const TREE_CAPACITY: usize = 128;

/// Levels between a leaf and the root.
pub const TREE_DEPTH: usize = 7;

/// Game identifier (UUID bytes).
pub type GameId = [u8; 16];

/// Fresh random game id.
pub fn new_game_id() -> GameId {
    *uuid::Uuid::new_v4().as_bytes()
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
