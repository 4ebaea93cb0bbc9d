//! Domain-Separated Hashing
//!
//! Every digest in the protocol is SHA-256 over a domain tag followed by
//! fixed-width fields. Leaf hashes, tree nodes and signed payloads each use
//! their own tag so a value from one context can never be replayed in another.
//!
//! The byte layout written here is part of the wire format: the ledger-side
//! verifier must reproduce it exactly.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type Hash32 = [u8; 32];

/// Domain tag for Merkle leaves.
pub const LEAF_DOMAIN: &[u8] = b"BATTLESHIP_MERKLE_LEAF_V1";

/// Domain tag for Merkle internal nodes.
pub const NODE_DOMAIN: &[u8] = b"BATTLESHIP_MERKLE_NODE_V1";

/// Domain tag for the padding leaf.
pub const EMPTY_DOMAIN: &[u8] = b"BATTLESHIP_MERKLE_EMPTY_V1";

/// Domain tag for signed board commitments.
pub const COMMIT_DOMAIN: &[u8] = b"BATTLESHIP_COMMIT_V1";

/// Domain tag for signed guesses.
pub const GUESS_DOMAIN: &[u8] = b"BATTLESHIP_GUESS_V1";

/// Domain tag for signed openings.
pub const OPENING_DOMAIN: &[u8] = b"BATTLESHIP_OPENING_V1";

/// Incremental hasher that always starts with a domain tag.
///
/// Order of updates is significant.
pub struct DomainHasher {
    hasher: Sha256,
}

impl DomainHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a 32-byte hash.
    #[inline]
    pub fn update_hash(&mut self, hash: &Hash32) {
        self.hasher.update(hash);
    }

    /// Update with a UUID (16 bytes).
    #[inline]
    pub fn update_uuid(&mut self, uuid: &[u8; 16]) {
        self.hasher.update(uuid);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash32 {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = DomainHasher::new(domain);
    hasher.update_bytes(data);
    hasher.finalize()
}

/// Hash leaf data with domain separation.
pub fn hash_leaf(data: &[u8]) -> Hash32 {
    hash_with_domain(LEAF_DOMAIN, data)
}

/// Hash two child nodes with domain separation.
pub fn hash_nodes(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = DomainHasher::new(NODE_DOMAIN);
    hasher.update_hash(left);
    hasher.update_hash(right);
    hasher.finalize()
}

/// Hash occupying every padding slot of the tree.
pub fn empty_leaf_hash() -> Hash32 {
    DomainHasher::new(EMPTY_DOMAIN).finalize()
}

/// Short hex prefix for log lines.
pub fn short_hex(hash: &Hash32) -> String {
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_determinism() {
        let make_hash = || {
            let mut hasher = DomainHasher::new(GUESS_DOMAIN);
            hasher.update_uuid(&[7; 16]);
            hasher.update_u8(3);
            hasher.update_u64(42);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = DomainHasher::new(b"test");
            h.update_u8(1);
            h.update_u8(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = DomainHasher::new(b"test");
            h.update_u8(2);
            h.update_u8(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];

        assert_ne!(hash_with_domain(LEAF_DOMAIN, &data), hash_with_domain(NODE_DOMAIN, &data));
        assert_ne!(hash_leaf(&[]), empty_leaf_hash());
    }

    #[test]
    fn test_node_hash_is_ordered() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(hash_nodes(&a, &b), hash_nodes(&b, &a));
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&[0xab; 32]), "abababab");
    }
}
