//! Merkle Tree Commitments
//!
//! Binary SHA-256 Merkle tree with a fixed padding rule:
//! leaves are padded up to the next power of two with [`empty_leaf_hash`].
//! Proofs carry no direction flags; bit `k` of the leaf index says whether
//! the running hash is the left (0) or right (1) input at level `k`.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{Hash32, hash_nodes, empty_leaf_hash};

/// Merkle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// Index is not below the padded capacity.
    #[error("leaf index {index} out of range (capacity {capacity})")]
    LeafIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Padded leaf capacity.
        capacity: usize,
    },
}

/// Binary Merkle tree over a padded, power-of-two leaf level.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// All tree levels (padded leaves at index 0, root at last index)
    levels: Vec<Vec<Hash32>>,
    /// Number of real (unpadded) leaves.
    leaf_count: usize,
}

impl MerkleTree {
    /// Create a Merkle tree from pre-hashed leaves.
    pub fn from_leaf_hashes(leaves: Vec<Hash32>) -> Self {
        let leaf_count = leaves.len();
        let mut current_level = leaves;

        // Pad to power of 2 for balanced tree
        let target_size = current_level.len().next_power_of_two();
        current_level.resize(target_size.max(1), empty_leaf_hash());

        let mut levels = vec![current_level.clone()];

        // Build up to root
        while current_level.len() > 1 {
            let next_level: Vec<Hash32> = current_level
                .chunks(2)
                .map(|pair| hash_nodes(&pair[0], &pair[1]))
                .collect();
            levels.push(next_level.clone());
            current_level = next_level;
        }

        Self { levels, leaf_count }
    }

    /// Root hash.
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(empty_leaf_hash)
    }

    /// Number of real leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Padded leaf capacity (a power of two).
    pub fn capacity(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Number of sibling hashes in every proof.
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Leaf hash at an index (padding slots included).
    pub fn leaf(&self, index: usize) -> Result<Hash32, MerkleError> {
        self.levels[0].get(index).copied().ok_or(MerkleError::LeafIndexOutOfRange {
            index,
            capacity: self.capacity(),
        })
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn prove(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= self.capacity() {
            return Err(MerkleError::LeafIndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }

        let mut current_index = index;
        let mut siblings = Vec::with_capacity(self.depth());

        // Walk up the tree, collecting sibling hashes
        for level in &self.levels[..self.depth()] {
            siblings.push(level[current_index ^ 1]);
            current_index >>= 1;
        }

        Ok(MerkleProof { siblings })
    }
}

/// Merkle inclusion proof: sibling hashes ordered leaf to root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling hash at each level, leaf level first.
    pub siblings: Vec<Hash32>,
}

impl MerkleProof {
    /// Number of levels this proof spans.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Fold a leaf hash up to the root the proof implies.
    pub fn compute_root(&self, leaf_hash: &Hash32, leaf_index: usize) -> Hash32 {
        let mut current_hash = *leaf_hash;
        for (level, sibling) in self.siblings.iter().enumerate() {
            current_hash = if (leaf_index >> level) & 1 == 0 {
                hash_nodes(&current_hash, sibling)
            } else {
                hash_nodes(sibling, &current_hash)
            };
        }
        current_hash
    }
}

/// Verify a proof for a pre-hashed leaf in a tree of the given depth.
///
/// A proof with the wrong number of siblings never verifies.
pub fn verify_leaf_hash(
    root: &Hash32,
    leaf_hash: &Hash32,
    leaf_index: usize,
    proof: &MerkleProof,
    depth: usize,
) -> Result<bool, MerkleError> {
    let capacity = 1usize.checked_shl(depth as u32).unwrap_or(usize::MAX);
    if leaf_index >= capacity {
        return Err(MerkleError::LeafIndexOutOfRange { index: leaf_index, capacity });
    }
    if proof.depth() != depth {
        return Ok(false);
    }
    Ok(proof.compute_root(leaf_hash, leaf_index) == *root)
}
