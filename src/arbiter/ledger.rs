//! Arbitration Ledger Contract
//!
//! The exact requests a player issues to the external ledger and the outcomes
//! it expects back. The ledger custodies stakes, keeps the authoritative
//! clock, and re-verifies every piece of submitted evidence itself.
//!
//! Every state-changing call either succeeds or fails with a distinguishable
//! [`LedgerError`]; callers never mutate local state before a call succeeds.

use chrono::{DateTime, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::GameId;
use crate::network::auth::PlayerId;
use crate::network::session::DisputedOpening;
use crate::proof::{BoardCommitment, CellEvidence};

/// Ledger call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A precondition of the call did not hold.
    #[error("{call} rejected: {reason}")]
    ArbitrationRejected {
        /// Ledger entry point.
        call: &'static str,
        /// Why the ledger refused.
        reason: String,
    },

    /// Win claimed before every required proof was recorded.
    #[error("incomplete proof: {own_ships}/{required} own ships, {hits}/{required} hits")]
    IncompleteProof {
        /// Own ship cells proven.
        own_ships: usize,
        /// Opponent hits proven.
        hits: usize,
        /// Cells required of each.
        required: usize,
    },

    /// The game has already been settled.
    #[error("game already over")]
    GameAlreadyOver,
}

impl LedgerError {
    /// Shorthand for a precondition failure.
    pub fn rejected(call: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::ArbitrationRejected { call, reason: reason.into() }
    }
}

/// Evidence for an accusation of cheating.
///
/// Carries the accused's signature so the ledger can attribute the opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheatingAccusation {
    /// Claimed value, nonce, proof and leaf index as received.
    pub evidence: CellEvidence,
    /// The accused party.
    pub accused: PlayerId,
    /// Accused's signature over the opening.
    pub signature: Signature,
}

impl CheatingAccusation {
    /// Build an accusation from a retained opening.
    pub fn from_disputed(disputed: &DisputedOpening, accused: PlayerId) -> Self {
        Self {
            evidence: disputed.response.evidence(),
            accused,
            signature: disputed.response.signature,
        }
    }
}

/// Why a game was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementReason {
    /// Winner proved its fleet and every hit.
    Win,
    /// Opponent failed to answer a timeout flag in time.
    Timeout,
    /// Loser conceded.
    Forfeit,
    /// Accused's signed opening did not verify.
    CheatingProven,
    /// Accuser submitted evidence the accused never signed.
    FalseEvidence,
}

/// Notifications emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A player deposited a stake and joined.
    PlayerJoined {
        /// Joining player.
        player: PlayerId,
        /// Amount locked.
        stake: u64,
    },

    /// A player registered its board commitment.
    CommitmentRegistered {
        /// Registering player.
        player: PlayerId,
    },

    /// A player was flagged as unresponsive.
    PlayerAccused {
        /// Flagging player.
        accuser: PlayerId,
        /// Flagged player.
        accused: PlayerId,
        /// Ledger time after which the accuser may claim the stake.
        deadline: DateTime<Utc>,
    },

    /// The flagged player answered in time.
    TimeoutAnswered {
        /// Player that answered.
        accused: PlayerId,
    },

    /// A player left by forfeiting.
    PlayerLeft {
        /// Leaving player.
        player: PlayerId,
    },

    /// The game was settled.
    GameSettled {
        /// Stake recipient.
        winner: PlayerId,
        /// Settlement path.
        reason: SettlementReason,
        /// Amount paid out.
        payout: u64,
    },
}

/// Entry points of the arbitration ledger.
///
/// `caller` identifies the account issuing each request.
#[allow(async_fn_in_trait)]
pub trait Ledger: Send + Sync {
    /// Game this ledger instance arbitrates.
    fn game_id(&self) -> GameId;

    /// Subscribe to ledger events.
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;

    /// Lock the caller's stake.
    async fn deposit_stake(&self, caller: PlayerId, amount: u64) -> Result<(), LedgerError>;

    /// Publish the caller's board commitment.
    async fn register_commitment(&self, caller: PlayerId, root: BoardCommitment) -> Result<(), LedgerError>;

    /// Root registered by `player`, if any.
    async fn registered_commitment(&self, player: PlayerId) -> Result<Option<BoardCommitment>, LedgerError>;

    /// Submit a failed opening; returns whether the accusation was upheld.
    async fn accuse_cheating(&self, caller: PlayerId, accusation: CheatingAccusation) -> Result<bool, LedgerError>;

    /// Verify one occupied cell against `board_owner`'s commitment.
    async fn check_one_ship(
        &self,
        caller: PlayerId,
        evidence: CellEvidence,
        board_owner: PlayerId,
    ) -> Result<bool, LedgerError>;

    /// Claim the stake after all proofs are recorded.
    async fn claim_win(&self, caller: PlayerId) -> Result<(), LedgerError>;

    /// Flag the opponent as unresponsive and start the fencing timer.
    async fn claim_opponent_left(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError>;

    /// Answer a timeout flag raised by `opponent`.
    async fn handle_timeout(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError>;

    /// Collect the stake after the fencing timer expired unanswered.
    async fn claim_timeout_winnings(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError>;

    /// Concede to `opponent`.
    async fn forfeit(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError>;

    /// Whether the game has been settled.
    async fn is_game_over(&self) -> Result<bool, LedgerError>;
}
