//! Board Commitment Protocol
//!
//! Commit to a board before the first guess by publishing the Merkle root of
//! its blinded cells. Each guess is later answered by opening a single leaf.
//!
//! The opening encoding is the bit-exact contract shared with the ledger:
//! `[value as u8] || nonce` (33 bytes), hashed under the leaf domain.

use serde::{Serialize, Deserialize};

use crate::{CELL_COUNT, TREE_DEPTH};
use crate::board::{Board, Cell, Nonce, NonceMatrix, NONCE_LEN};
use crate::core::hash::{Hash32, hash_leaf, short_hex};
use crate::proof::merkle::{MerkleTree, MerkleProof, MerkleError, verify_leaf_hash};

/// Length of an encoded opening.
pub const OPENING_LEN: usize = 1 + NONCE_LEN;

/// Canonical byte string of a cell opening (value first, then nonce).
pub fn encode_opening(value: bool, nonce: &Nonce) -> [u8; OPENING_LEN] {
    let mut out = [0u8; OPENING_LEN];
    out[0] = value as u8;
    out[1..].copy_from_slice(nonce);
    out
}

/// Leaf hash of a cell opening.
pub fn opening_leaf_hash(value: bool, nonce: &Nonce) -> Hash32 {
    hash_leaf(&encode_opening(value, nonce))
}

/// Published board commitment (Merkle root).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoardCommitment(pub Hash32);

impl BoardCommitment {
    /// Raw root bytes.
    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }
}

impl std::fmt::Display for BoardCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Merkle tree over the blinded cells of one board.
#[derive(Clone, Debug)]
pub struct CommitmentTree {
    tree: MerkleTree,
}

impl CommitmentTree {
    /// Root of the tree.
    pub fn root(&self) -> BoardCommitment {
        BoardCommitment(self.tree.root())
    }

    /// Inclusion proof for a leaf.
    pub fn prove(&self, leaf_index: usize) -> Result<MerkleProof, MerkleError> {
        self.tree.prove(leaf_index)
    }
}

/// Hash every cell and fold them into a commitment tree.
///
/// Deterministic: identical inputs always give a byte-identical root.
pub fn build_commitment(board: &Board, nonces: &NonceMatrix) -> (BoardCommitment, CommitmentTree) {
    let leaves: Vec<Hash32> = Cell::all()
        .map(|cell| opening_leaf_hash(board.is_ship(cell), nonces.get(cell)))
        .collect();
    debug_assert_eq!(leaves.len(), CELL_COUNT);

    let tree = CommitmentTree { tree: MerkleTree::from_leaf_hashes(leaves) };
    (tree.root(), tree)
}

/// Check a claimed opening against a commitment.
pub fn verify_opening(
    value: bool,
    nonce: &Nonce,
    leaf_index: usize,
    proof: &MerkleProof,
    root: &BoardCommitment,
) -> Result<bool, MerkleError> {
    verify_leaf_hash(&root.0, &opening_leaf_hash(value, nonce), leaf_index, proof, TREE_DEPTH)
}

/// Everything needed to check one cell against a commitment.
///
/// This is both the payload of an opening response and the evidence
/// submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEvidence {
    /// Claimed truth value.
    pub value: bool,
    /// Claimed nonce.
    pub nonce: Nonce,
    /// Row-major leaf index.
    pub leaf_index: usize,
    /// Inclusion proof.
    pub proof: MerkleProof,
}

impl CellEvidence {
    /// Canonical opening bytes.
    pub fn encoded(&self) -> [u8; OPENING_LEN] {
        encode_opening(self.value, &self.nonce)
    }

    /// Verify against a commitment.
    pub fn verify(&self, root: &BoardCommitment) -> Result<bool, MerkleError> {
        verify_opening(self.value, &self.nonce, self.leaf_index, &self.proof, root)
    }

    /// Whether verification against `root` succeeds (out-of-range counts as failure).
    pub fn is_valid_for(&self, root: &BoardCommitment) -> bool {
        self.verify(root).unwrap_or(false)
    }

    /// Cell addressed by the evidence, if it is a real cell.
    pub fn cell(&self) -> Option<Cell> {
        Cell::from_leaf_index(self.leaf_index)
    }
}

/// A board together with its nonces and commitment tree.
///
/// Owned by the defending player for the whole game.
#[derive(Clone, Debug)]
pub struct CommittedBoard {
    board: Board,
    nonces: NonceMatrix,
    tree: CommitmentTree,
    root: BoardCommitment,
}

impl CommittedBoard {
    /// Commit to a board.
    pub fn new(board: Board, nonces: NonceMatrix) -> Self {
        let (root, tree) = build_commitment(&board, &nonces);
        tracing::debug!(root = %short_hex(&root.0), "board committed");
        Self { board, nonces, tree, root }
    }

    /// The published root.
    pub fn root(&self) -> BoardCommitment {
        self.root
    }

    /// The secret board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Open one cell from the committed tree.
    pub fn open(&self, cell: Cell) -> Result<CellEvidence, MerkleError> {
        let leaf_index = cell.leaf_index();
        Ok(CellEvidence {
            value: self.board.is_ship(cell),
            nonce: *self.nonces.get(cell),
            leaf_index,
            proof: self.tree.prove(leaf_index)?,
        })
    }

    /// Openings of every own ship cell (used to prove the fleet when claiming a win).
    pub fn ship_openings(&self) -> Result<Vec<CellEvidence>, MerkleError> {
        self.board.ship_cells().into_iter().map(|cell| self.open(cell)).collect()
    }
}
