//! Player Driver
//!
//! Couples one player's [`PlayerSession`] with the arbitration ledger. Local
//! state only changes after the ledger confirms a call; a rejection is
//! returned to the caller untouched and never retried.

use std::sync::Arc;

use futures_util::future::try_join_all;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::SHIP_CELLS;
use crate::arbiter::ledger::{CheatingAccusation, Ledger, LedgerError};
use crate::arbiter::watcher::PlayerNotification;
use crate::board::{Cell, CellBelief};
use crate::config::GameConfig;
use crate::network::auth::PlayerId;
use crate::network::protocol::{GuessMessage, OpeningResponse, SignedCommitment};
use crate::network::session::{PlayerSession, ProtocolError};
use crate::proof::BoardCommitment;

/// Player driver errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// Local protocol failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Ledger refused a call.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The opponent has not registered a commitment with the ledger.
    #[error("opponent has no commitment registered with the ledger")]
    CommitmentNotRegistered,

    /// The peer commitment differs from the root the opponent registered.
    #[error("peer commitment {received} does not match the registered root {registered}")]
    CommitmentMismatch {
        /// Root in the signed peer message.
        received: BoardCommitment,
        /// Root held by the ledger.
        registered: BoardCommitment,
    },

    /// Accusation requested with nothing to accuse.
    #[error("no disputed opening to submit")]
    NoDisputedOpening,

    /// Neither claiming the timeout nor forfeiting could settle the game.
    #[error("game stuck: timeout claim failed ({timeout}), forfeit failed ({forfeit})")]
    StuckGame {
        /// Why the timeout claim failed.
        timeout: LedgerError,
        /// Why the forfeit failed.
        forfeit: LedgerError,
    },
}

/// One player taking part in a ledger-arbitrated game.
pub struct Player<L: Ledger> {
    session: PlayerSession,
    ledger: Arc<L>,
    config: GameConfig,
}

impl<L: Ledger> Player<L> {
    /// Wrap a session.
    pub fn new(session: PlayerSession, ledger: Arc<L>, config: GameConfig) -> Self {
        Self { session, ledger, config }
    }

    /// Local session state.
    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    /// Own identity.
    pub fn id(&self) -> PlayerId {
        self.session.player_id()
    }

    /// Opponent identity.
    pub fn opponent(&self) -> PlayerId {
        self.session.opponent()
    }

    /// Ledger handle.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Lock the configured stake.
    pub async fn place_bet(&self) -> Result<(), PlayerError> {
        self.ledger.deposit_stake(self.id(), self.config.stake).await?;
        Ok(())
    }

    /// Register our commitment with the ledger and return the signed copy for the opponent.
    pub async fn register_commitment(&self) -> Result<SignedCommitment, PlayerError> {
        self.ledger
            .register_commitment(self.id(), self.session.own_commitment())
            .await?;
        Ok(self.session.commitment_message())
    }

    /// Accept the opponent's signed commitment once it matches the root the
    /// opponent registered with the ledger.
    ///
    /// Openings are checked locally against this root while the ledger checks
    /// win proofs against its own copy, so the two must be identical.
    pub async fn receive_commitment(&mut self, msg: &SignedCommitment) -> Result<(), PlayerError> {
        let registered = self
            .ledger
            .registered_commitment(self.opponent())
            .await?
            .ok_or(PlayerError::CommitmentNotRegistered)?;
        if registered != msg.root {
            warn!(received = %msg.root, %registered, "peer commitment differs from the ledger");
            return Err(PlayerError::CommitmentMismatch { received: msg.root, registered });
        }
        Ok(self.session.receive_commitment(msg)?)
    }

    /// Sign a guess.
    pub fn guess(&mut self, cell: Cell) -> Result<GuessMessage, PlayerError> {
        Ok(self.session.build_guess(cell)?)
    }

    /// Answer the opponent's guess.
    pub fn answer(&self, msg: &GuessMessage) -> Result<OpeningResponse, PlayerError> {
        Ok(self.session.respond_to_guess(msg)?)
    }

    /// Fold an opening into the belief grid.
    pub fn receive_opening(&mut self, msg: &OpeningResponse) -> Result<CellBelief, PlayerError> {
        Ok(self.session.receive_response(msg)?)
    }

    /// Submit the oldest failed opening to the ledger.
    ///
    /// The dispute is dropped locally only once the ledger has ruled.
    /// Returns whether the game is over afterwards.
    #[instrument(skip_all, fields(player = %self.id()))]
    pub async fn accuse_cheating(&mut self) -> Result<bool, PlayerError> {
        let disputed = self
            .session
            .disputed_openings()
            .first()
            .cloned()
            .ok_or(PlayerError::NoDisputedOpening)?;

        let accusation = CheatingAccusation::from_disputed(&disputed, self.opponent());
        let upheld = self.ledger.accuse_cheating(self.id(), accusation).await?;
        self.session.clear_dispute(disputed.cell);
        info!(cell = %disputed.cell, upheld, "accusation ruled");

        self.sync_game_over().await
    }

    /// Prove our fleet and every hit, then claim the stake.
    ///
    /// All proofs are submitted concurrently and must all be confirmed before
    /// the claim. Returns whether the game is over afterwards.
    #[instrument(skip_all, fields(player = %self.id()))]
    pub async fn claim_win(&mut self) -> Result<bool, PlayerError> {
        let me = self.id();
        let opponent = self.opponent();

        let own = self.session.own_ship_openings()?;
        let hits = self.session.hit_evidence().to_vec();
        if own.len() < SHIP_CELLS || hits.len() < SHIP_CELLS {
            return Err(LedgerError::IncompleteProof {
                own_ships: own.len(),
                hits: hits.len(),
                required: SHIP_CELLS,
            }
            .into());
        }

        let own_count = own.len();
        let ledger = &self.ledger;
        let submissions = own
            .into_iter()
            .map(|evidence| ledger.check_one_ship(me, evidence, me))
            .chain(hits.into_iter().map(|evidence| ledger.check_one_ship(me, evidence, opponent)));
        let results = try_join_all(submissions).await?;

        let own_ships = results[..own_count].iter().filter(|ok| **ok).count();
        let hit_count = results[own_count..].iter().filter(|ok| **ok).count();
        if own_ships < SHIP_CELLS || hit_count < SHIP_CELLS {
            warn!(own_ships, hits = hit_count, "ledger did not confirm every proof");
            return Err(LedgerError::IncompleteProof {
                own_ships,
                hits: hit_count,
                required: SHIP_CELLS,
            }
            .into());
        }

        self.ledger.claim_win(me).await?;
        info!("win claimed");
        self.sync_game_over().await
    }

    /// Flag the opponent as unresponsive.
    pub async fn accuse_timeout(&self) -> Result<(), PlayerError> {
        self.ledger.claim_opponent_left(self.id(), self.opponent()).await?;
        Ok(())
    }

    /// Answer a timeout flag raised against us. Returns whether the game is over.
    pub async fn handle_timeout_accusation(&mut self) -> Result<bool, PlayerError> {
        self.ledger.handle_timeout(self.id(), self.opponent()).await?;
        debug!(player = %self.id(), "timeout accusation answered");
        self.sync_game_over().await
    }

    /// Collect the stake after an unanswered timeout. Returns whether the game is over.
    pub async fn claim_timeout_winnings(&mut self) -> Result<bool, PlayerError> {
        self.ledger.claim_timeout_winnings(self.id(), self.opponent()).await?;
        self.sync_game_over().await
    }

    /// Concede to the opponent.
    pub async fn forfeit(&mut self) -> Result<(), PlayerError> {
        self.ledger.forfeit(self.id(), self.opponent()).await?;
        self.session.mark_finished();
        Ok(())
    }

    /// Settle a game the opponent abandoned: claim the timeout, or failing
    /// that, forfeit.
    ///
    /// If both fail the game cannot be settled from this side and needs an
    /// operator.
    #[instrument(skip_all, fields(player = %self.id()))]
    pub async fn leave_game(&mut self) -> Result<(), PlayerError> {
        let timeout = match self.claim_timeout_winnings().await {
            Ok(_) => return Ok(()),
            Err(PlayerError::Ledger(e)) => e,
            Err(other) => return Err(other),
        };
        let forfeit = match self.forfeit().await {
            Ok(()) => return Ok(()),
            Err(PlayerError::Ledger(e)) => e,
            Err(other) => return Err(other),
        };

        error!(%timeout, %forfeit, "game cannot be settled");
        Err(PlayerError::StuckGame { timeout, forfeit })
    }

    /// React to a ledger notification.
    pub async fn handle_notification(&mut self, notification: PlayerNotification) -> Result<(), PlayerError> {
        match notification {
            PlayerNotification::Accused { accuser, deadline } => {
                if self.config.auto_answer_timeouts && !self.session.is_finished() {
                    info!(%accuser, %deadline, "answering timeout flag");
                    self.handle_timeout_accusation().await?;
                } else {
                    warn!(%accuser, %deadline, "flagged as unresponsive");
                }
            }
            PlayerNotification::GameSettled { winner, reason, payout } => {
                info!(%winner, ?reason, payout, won = winner == self.id(), "game settled");
                self.session.mark_finished();
            }
            other => debug!(?other, "ledger notification"),
        }
        Ok(())
    }

    async fn sync_game_over(&mut self) -> Result<bool, PlayerError> {
        let over = self.ledger.is_game_over().await?;
        if over {
            self.session.mark_finished();
        }
        Ok(over)
    }
}
