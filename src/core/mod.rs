//! Core hashing primitives.
//!
//! Everything here is deterministic and byte-exact: the ledger-side verifier
//! must derive the same digests from the same inputs.

pub mod hash;

// Re-export core types
pub use hash::{Hash32, DomainHasher, hash_leaf, hash_nodes, empty_leaf_hash};
