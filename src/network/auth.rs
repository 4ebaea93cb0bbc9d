//! Message Signing
//!
//! Every peer message is signed with the sender's Ed25519 key and checked by
//! the receiver before it is acted upon. A player's public key doubles as its
//! identity on the ledger.
//!
//! Signatures are taken over a domain-tagged SHA-256 digest bound to the game
//! id, so a message from one game or one message kind cannot be replayed as
//! another.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::GameId;
use crate::board::Cell;
use crate::core::hash::{
    DomainHasher, Hash32, COMMIT_DOMAIN, GUESS_DOMAIN, OPENING_DOMAIN,
};
use crate::proof::{BoardCommitment, CellEvidence};

/// Player identity: the Ed25519 verifying key bytes.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub [u8; 32]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the verifying key, if the bytes are a valid curve point.
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).ok()
    }
}

impl std::fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlayerId({})", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..4]))
    }
}

/// A player's signing identity.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Restore from a 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(secret) }
    }

    /// Public identity.
    pub fn player_id(&self) -> PlayerId {
        PlayerId(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a payload.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.signing_key.sign(payload)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("player_id", &self.player_id()).finish()
    }
}

/// Sign a payload with the given identity.
pub fn sign(payload: &[u8], identity: &Identity) -> Signature {
    identity.sign(payload)
}

/// Check a signature against the claimed signer.
///
/// Malformed keys count as a failed verification.
pub fn verify_signature(payload: &[u8], signature: &Signature, claimed: &PlayerId) -> bool {
    match claimed.verifying_key() {
        Some(key) => key.verify(payload, signature).is_ok(),
        None => false,
    }
}

/// Digest signed when publishing a board commitment.
pub fn commitment_payload(game_id: &GameId, root: &BoardCommitment) -> Hash32 {
    let mut hasher = DomainHasher::new(COMMIT_DOMAIN);
    hasher.update_uuid(game_id);
    hasher.update_hash(root.as_bytes());
    hasher.finalize()
}

/// Digest signed when guessing a cell.
pub fn guess_payload(game_id: &GameId, cell: Cell) -> Hash32 {
    let mut hasher = DomainHasher::new(GUESS_DOMAIN);
    hasher.update_uuid(game_id);
    hasher.update_u8(cell.row);
    hasher.update_u8(cell.col);
    hasher.finalize()
}

/// Digest signed when answering a guess.
pub fn opening_payload(game_id: &GameId, evidence: &CellEvidence) -> Hash32 {
    let mut hasher = DomainHasher::new(OPENING_DOMAIN);
    hasher.update_uuid(game_id);
    hasher.update_u64(evidence.leaf_index as u64);
    hasher.update_bytes(&evidence.encoded());
    for sibling in &evidence.proof.siblings {
        hasher.update_hash(sibling);
    }
    hasher.finalize()
}
