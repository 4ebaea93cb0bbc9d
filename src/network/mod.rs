//! Peer Layer
//!
//! Signed messages exchanged directly between the two players, and the
//! per-player state machine that consumes them. Transport is the caller's
//! concern; this layer only produces and checks messages.

pub mod auth;
pub mod protocol;
pub mod session;

pub use auth::{Identity, PlayerId, sign, verify_signature};
pub use protocol::{
    PeerMessage, SignedCommitment, GuessMessage, OpeningResponse, CodecError,
};
pub use session::{PlayerSession, SessionState, ProtocolError, DisputedOpening};
