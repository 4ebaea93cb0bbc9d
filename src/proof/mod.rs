//! Commitment Proof System
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  merkle.rs       - Padded binary Merkle tree + proofs       │
//! │  commitment.rs   - Board commitment, openings, evidence     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod merkle;
pub mod commitment;

// Re-export key types
pub use merkle::{MerkleTree, MerkleProof, MerkleError, verify_leaf_hash};
pub use commitment::{
    BoardCommitment, CommitmentTree, CommittedBoard, CellEvidence,
    build_commitment, verify_opening, encode_opening, opening_leaf_hash, OPENING_LEN,
};
