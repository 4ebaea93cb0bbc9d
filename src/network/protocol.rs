//! Peer Protocol Messages
//!
//! Wire format for the player-to-player channel. Three message kinds only:
//! the initial board commitment, guesses and openings. Messages serialize as
//! JSON for debugging ease, with binary (bincode) for production.

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GameId;
use crate::board::{Cell, Nonce};
use crate::proof::{BoardCommitment, CellEvidence, MerkleProof};

/// Board commitment sent once before play begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommitment {
    /// Game this commitment belongs to.
    pub game_id: GameId,
    /// Merkle root of the sender's board.
    pub root: BoardCommitment,
    /// Sender's signature over the commitment payload.
    pub signature: Signature,
}

/// "I am guessing cell (row, col)".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessMessage {
    /// Game id.
    pub game_id: GameId,
    /// Guessed row.
    pub row: u8,
    /// Guessed column.
    pub col: u8,
    /// Guesser's signature over the guess payload.
    pub signature: Signature,
}

impl GuessMessage {
    /// Guessed cell.
    pub fn cell(&self) -> Cell {
        Cell { row: self.row, col: self.col }
    }
}

/// Defender's answer to a guess: the opening of the guessed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningResponse {
    /// Game id.
    pub game_id: GameId,
    /// Row of the guess being answered.
    pub row: u8,
    /// Column of the guess being answered.
    pub col: u8,
    /// Claimed truth value.
    pub hit: bool,
    /// Claimed cell nonce.
    pub nonce: Nonce,
    /// Inclusion proof for the cell's leaf.
    pub proof: MerkleProof,
    /// Defender's signature over the opening payload.
    pub signature: Signature,
}

impl OpeningResponse {
    /// Answered cell.
    pub fn cell(&self) -> Cell {
        Cell { row: self.row, col: self.col }
    }

    /// Evidence carried by this response.
    ///
    /// The leaf index is derived from the answered cell, never claimed separately.
    pub fn evidence(&self) -> CellEvidence {
        CellEvidence {
            value: self.hit,
            nonce: self.nonce,
            leaf_index: self.cell().leaf_index(),
            proof: self.proof.clone(),
        }
    }
}

/// Any message on the peer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Initial board commitment.
    Commitment(SignedCommitment),
    /// A guess.
    Guess(GuessMessage),
    /// An opening answering a guess.
    Opening(OpeningResponse),
}

/// Encoding/decoding failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON encoding error.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding error.
    #[error("binary codec error: {0}")]
    Binary(#[from] bincode::Error),

    /// Binary frame with a missing or unknown kind byte.
    #[error("unknown message kind {0:?}")]
    UnknownKind(Option<u8>),
}

const KIND_COMMITMENT: u8 = 0;
const KIND_GUESS: u8 = 1;
const KIND_OPENING: u8 = 2;

impl PeerMessage {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(s: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Encode as a kind byte followed by the bincode body.
    ///
    /// bincode cannot decode internally tagged enums, so the tag is framed by hand.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let (kind, body) = match self {
            PeerMessage::Commitment(m) => (KIND_COMMITMENT, bincode::serialize(m)?),
            PeerMessage::Guess(m) => (KIND_GUESS, bincode::serialize(m)?),
            PeerMessage::Opening(m) => (KIND_OPENING, bincode::serialize(m)?),
        };
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(kind);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode from the framed binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (&kind, body) = bytes.split_first().ok_or(CodecError::UnknownKind(None))?;
        Ok(match kind {
            KIND_COMMITMENT => PeerMessage::Commitment(bincode::deserialize(body)?),
            KIND_GUESS => PeerMessage::Guess(bincode::deserialize(body)?),
            KIND_OPENING => PeerMessage::Opening(bincode::deserialize(body)?),
            other => return Err(CodecError::UnknownKind(Some(other))),
        })
    }

    /// Message kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Commitment(_) => "commitment",
            PeerMessage::Guess(_) => "guess",
            PeerMessage::Opening(_) => "opening",
        }
    }
}

impl From<SignedCommitment> for PeerMessage {
    fn from(msg: SignedCommitment) -> Self {
        PeerMessage::Commitment(msg)
    }
}

impl From<GuessMessage> for PeerMessage {
    fn from(msg: GuessMessage) -> Self {
        PeerMessage::Guess(msg)
    }
}

impl From<OpeningResponse> for PeerMessage {
    fn from(msg: OpeningResponse) -> Self {
        PeerMessage::Opening(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_guess() -> GuessMessage {
        GuessMessage {
            game_id: [3; 16],
            row: 2,
            col: 3,
            signature: Signature::from_bytes(&[7; 64]),
        }
    }

    #[test]
    fn test_json_tagging() {
        let msg = PeerMessage::from(test_guess());
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"guess\""));
        assert_eq!(PeerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_binary_codec() {
        let opening = OpeningResponse {
            game_id: [3; 16],
            row: 0,
            col: 0,
            hit: true,
            nonce: [4; 32],
            proof: MerkleProof { siblings: vec![[5; 32]; 7] },
            signature: Signature::from_bytes(&[8; 64]),
        };
        let msg = PeerMessage::from(opening);
        let bytes = msg.to_bytes().unwrap();

        assert_eq!(PeerMessage::from_bytes(&bytes).unwrap(), msg);
        assert_eq!(msg.kind(), "opening");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(PeerMessage::from_json("{\"type\":\"nope\"}"), Err(CodecError::Json(_))));
        assert!(matches!(PeerMessage::from_bytes(&[0xff; 3]), Err(CodecError::UnknownKind(Some(0xff)))));
        assert!(matches!(PeerMessage::from_bytes(&[]), Err(CodecError::UnknownKind(None))));
        assert!(matches!(PeerMessage::from_bytes(&[1, 0, 0]), Err(CodecError::Binary(_))));
    }

    #[test]
    fn test_opening_evidence_uses_cell_index() {
        let opening = OpeningResponse {
            game_id: [0; 16],
            row: 2,
            col: 3,
            hit: false,
            nonce: [1; 32],
            proof: MerkleProof { siblings: Vec::new() },
            signature: Signature::from_bytes(&[0; 64]),
        };
        assert_eq!(opening.evidence().leaf_index, 23);
    }
}
