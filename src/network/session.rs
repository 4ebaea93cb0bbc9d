//! Guess/Response Session
//!
//! The per-player state machine for one game. It owns the player's committed
//! board and everything learned about the opponent, and turns incoming peer
//! messages into verified knowledge.
//!
//! Every inbound message is authenticated before any state is touched, and a
//! failed check never leaves a partial update behind.

use tracing::{debug, info, warn};
use thiserror::Error;

use crate::{GameId, SHIP_CELLS};
use crate::board::{Board, BoardError, Cell, CellBelief, GuessState, NonceMatrix, OpponentGrid};
use crate::core::hash::short_hex;
use crate::network::auth::{
    commitment_payload, guess_payload, opening_payload, verify_signature, Identity, PlayerId,
};
use crate::network::protocol::{GuessMessage, OpeningResponse, SignedCommitment};
use crate::proof::{BoardCommitment, CellEvidence, CommittedBoard, MerkleError};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the opponent's commitment.
    AwaitingCommitment,
    /// Exchanging guesses.
    Playing,
    /// The ledger reported the game over.
    Finished,
}

/// An opening that failed verification, kept for an accusation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputedOpening {
    /// Cell the opening claims to answer.
    pub cell: Cell,
    /// The signed response exactly as received.
    pub response: OpeningResponse,
}

/// Local protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Board validation failed.
    #[error("board error: {0}")]
    Board(#[from] BoardError),

    /// Proof index out of range.
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    /// Signature did not verify against the expected sender.
    #[error("unauthenticated {kind} message")]
    UnauthenticatedMessage {
        /// Message kind.
        kind: &'static str,
    },

    /// Cell was already guessed.
    #[error("duplicate guess at {cell} (state {state:?})")]
    DuplicateGuess {
        /// Guessed cell.
        cell: Cell,
        /// Current state of that cell.
        state: GuessState,
    },

    /// Opening does not verify against the opponent's commitment.
    #[error("invalid opening for {cell}")]
    InvalidOpening {
        /// Cell the opening claimed to answer.
        cell: Cell,
    },

    /// Opening for a cell with no outstanding guess.
    #[error("unsolicited opening for {cell}")]
    UnsolicitedOpening {
        /// Cell in the opening.
        cell: Cell,
    },

    /// No verified commitment from the opponent yet.
    #[error("opponent commitment not received")]
    MissingOpponentCommitment,

    /// Opponent tried to replace its commitment.
    #[error("opponent commitment already received")]
    CommitmentAlreadyReceived,

    /// Message belongs to another game.
    #[error("message for another game")]
    WrongGame,

    /// The game is over.
    #[error("game already over")]
    GameAlreadyOver,
}

/// One player's view of a game.
pub struct PlayerSession {
    game_id: GameId,
    identity: Identity,
    opponent: PlayerId,
    state: SessionState,
    /// Own board, nonces and commitment tree.
    own: CommittedBoard,
    /// Opponent commitment with its authenticating signature.
    opponent_commitment: Option<SignedCommitment>,
    /// Belief grid about the opponent's board.
    grid: OpponentGrid,
    /// Verified hits, in the order they were learned. Never shrinks.
    hit_evidence: Vec<CellEvidence>,
    /// Every opening that failed verification and is not yet disputed.
    disputed: Vec<DisputedOpening>,
    /// Most recent valid opening.
    last_opening: Option<CellEvidence>,
}

impl PlayerSession {
    /// Create a session and commit to the board.
    pub fn new(
        game_id: GameId,
        identity: Identity,
        opponent: PlayerId,
        board: Board,
        nonces: NonceMatrix,
    ) -> Self {
        let own = CommittedBoard::new(board, nonces);
        info!(
            player = %identity.player_id(),
            opponent = %opponent,
            root = %short_hex(own.root().as_bytes()),
            "session created"
        );

        Self {
            game_id,
            identity,
            opponent,
            state: SessionState::AwaitingCommitment,
            own,
            opponent_commitment: None,
            grid: OpponentGrid::new(),
            hit_evidence: Vec::new(),
            disputed: Vec::new(),
            last_opening: None,
        }
    }

    /// Game id.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Own identity.
    pub fn player_id(&self) -> PlayerId {
        self.identity.player_id()
    }

    /// Opponent identity.
    pub fn opponent(&self) -> PlayerId {
        self.opponent
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Own board commitment.
    pub fn own_commitment(&self) -> BoardCommitment {
        self.own.root()
    }

    /// Opponent's verified commitment.
    pub fn opponent_commitment(&self) -> Option<&SignedCommitment> {
        self.opponent_commitment.as_ref()
    }

    /// Belief grid about the opponent.
    pub fn grid(&self) -> &OpponentGrid {
        &self.grid
    }

    /// Belief about one opponent cell.
    pub fn belief(&self, cell: Cell) -> CellBelief {
        self.grid.belief(cell)
    }

    /// Verified hits accumulated for a win claim.
    pub fn hit_evidence(&self) -> &[CellEvidence] {
        &self.hit_evidence
    }

    /// Openings that failed verification and can be disputed.
    pub fn disputed_openings(&self) -> &[DisputedOpening] {
        &self.disputed
    }

    /// Most recent valid opening.
    pub fn last_opening(&self) -> Option<&CellEvidence> {
        self.last_opening.as_ref()
    }

    /// Whether every opponent ship cell has been hit.
    pub fn has_sunk_fleet(&self) -> bool {
        self.hit_evidence.len() >= SHIP_CELLS
    }

    /// Openings of all own ship cells.
    pub fn own_ship_openings(&self) -> Result<Vec<CellEvidence>, ProtocolError> {
        Ok(self.own.ship_openings()?)
    }

    /// Whether the session has been closed.
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Close the session once the ledger reports the game over.
    pub fn mark_finished(&mut self) {
        if self.state != SessionState::Finished {
            info!(player = %self.player_id(), "session finished");
            self.state = SessionState::Finished;
        }
    }

    /// Signed commitment to send to the opponent.
    pub fn commitment_message(&self) -> SignedCommitment {
        let root = self.own.root();
        let payload = commitment_payload(&self.game_id, &root);
        SignedCommitment {
            game_id: self.game_id,
            root,
            signature: self.identity.sign(&payload),
        }
    }

    /// Accept the opponent's signed commitment.
    ///
    /// Receiving the same commitment again is a no-op.
    pub fn receive_commitment(&mut self, msg: &SignedCommitment) -> Result<(), ProtocolError> {
        self.ensure_active()?;
        if msg.game_id != self.game_id {
            return Err(ProtocolError::WrongGame);
        }

        let payload = commitment_payload(&self.game_id, &msg.root);
        if !verify_signature(&payload, &msg.signature, &self.opponent) {
            warn!(opponent = %self.opponent, "commitment signature rejected");
            return Err(ProtocolError::UnauthenticatedMessage { kind: "commitment" });
        }

        if let Some(existing) = &self.opponent_commitment {
            if existing.root == msg.root {
                return Ok(());
            }
            return Err(ProtocolError::CommitmentAlreadyReceived);
        }

        debug!(root = %short_hex(msg.root.as_bytes()), "opponent commitment accepted");
        self.opponent_commitment = Some(msg.clone());
        self.state = SessionState::Playing;
        Ok(())
    }

    /// Sign a guess for an unasked cell.
    ///
    /// Fails before anything is signed if the cell was already guessed.
    pub fn build_guess(&mut self, cell: Cell) -> Result<GuessMessage, ProtocolError> {
        self.ensure_active()?;
        if !cell.is_on_board() {
            return Err(BoardError::CellOutOfBounds { row: cell.row as usize, col: cell.col as usize }.into());
        }
        if self.opponent_commitment.is_none() {
            return Err(ProtocolError::MissingOpponentCommitment);
        }

        let state = self.grid.state(cell);
        if state != GuessState::Unasked {
            return Err(ProtocolError::DuplicateGuess { cell, state });
        }

        let payload = guess_payload(&self.game_id, cell);
        let signature = self.identity.sign(&payload);
        self.grid.set(cell, GuessState::Asked);
        debug!(%cell, "guess sent");

        Ok(GuessMessage {
            game_id: self.game_id,
            row: cell.row,
            col: cell.col,
            signature,
        })
    }

    /// Answer an authenticated guess with an opening of the committed cell.
    pub fn respond_to_guess(&self, msg: &GuessMessage) -> Result<OpeningResponse, ProtocolError> {
        self.ensure_active()?;
        if msg.game_id != self.game_id {
            return Err(ProtocolError::WrongGame);
        }

        let cell = msg.cell();
        let payload = guess_payload(&self.game_id, cell);
        if !verify_signature(&payload, &msg.signature, &self.opponent) {
            warn!(%cell, "guess signature rejected");
            return Err(ProtocolError::UnauthenticatedMessage { kind: "guess" });
        }
        if !cell.is_on_board() {
            return Err(BoardError::CellOutOfBounds { row: cell.row as usize, col: cell.col as usize }.into());
        }

        let evidence = self.own.open(cell)?;
        let signature = self.identity.sign(&opening_payload(&self.game_id, &evidence));
        debug!(%cell, hit = evidence.value, "guess answered");

        Ok(OpeningResponse {
            game_id: self.game_id,
            row: cell.row,
            col: cell.col,
            hit: evidence.value,
            nonce: evidence.nonce,
            proof: evidence.proof,
            signature,
        })
    }

    /// Verify an opening and fold it into the belief grid.
    ///
    /// An opening that fails verification is retained once for an accusation and
    /// reported as [`ProtocolError::InvalidOpening`]; the belief grid is not
    /// touched. Re-receiving a valid opening for a resolved cell is a no-op.
    pub fn receive_response(&mut self, msg: &OpeningResponse) -> Result<CellBelief, ProtocolError> {
        self.ensure_active()?;
        if msg.game_id != self.game_id {
            return Err(ProtocolError::WrongGame);
        }

        let cell = msg.cell();
        let evidence = msg.evidence();
        let payload = opening_payload(&self.game_id, &evidence);
        if !verify_signature(&payload, &msg.signature, &self.opponent) {
            warn!(%cell, "opening signature rejected");
            return Err(ProtocolError::UnauthenticatedMessage { kind: "opening" });
        }
        if !cell.is_on_board() {
            return Err(BoardError::CellOutOfBounds { row: cell.row as usize, col: cell.col as usize }.into());
        }

        let root = self
            .opponent_commitment
            .as_ref()
            .map(|c| c.root)
            .ok_or(ProtocolError::MissingOpponentCommitment)?;

        let state = self.grid.state(cell);
        match state {
            GuessState::Unasked | GuessState::Disputed => {
                return Err(ProtocolError::UnsolicitedOpening { cell });
            }
            GuessState::Hit | GuessState::Miss | GuessState::Asked => {}
        }

        if !evidence.is_valid_for(&root) {
            warn!(%cell, claimed = msg.hit, "opening failed verification, retained for dispute");
            if state == GuessState::Asked {
                self.grid.set(cell, GuessState::Disputed);
            }
            let known = self
                .disputed
                .iter()
                .any(|d| d.cell == cell && d.response.signature == msg.signature);
            if !known {
                self.disputed.push(DisputedOpening { cell, response: msg.clone() });
            }
            return Err(ProtocolError::InvalidOpening { cell });
        }

        if state.is_resolved() {
            return Ok(state.belief());
        }

        let next = if evidence.value { GuessState::Hit } else { GuessState::Miss };
        self.grid.set(cell, next);
        if evidence.value {
            self.hit_evidence.push(evidence.clone());
            info!(%cell, hits = self.hit_evidence.len(), "hit confirmed");
        } else {
            debug!(%cell, "miss confirmed");
        }
        self.last_opening = Some(evidence);

        Ok(next.belief())
    }

    /// Drop a disputed opening after the ledger has ruled on it.
    pub(crate) fn clear_dispute(&mut self, cell: Cell) -> Option<DisputedOpening> {
        let pos = self.disputed.iter().position(|d| d.cell == cell)?;
        Some(self.disputed.remove(pos))
    }

    fn ensure_active(&self) -> Result<(), ProtocolError> {
        if self.state == SessionState::Finished {
            return Err(ProtocolError::GameAlreadyOver);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::generate_nonces;

    fn fleet(offset: usize) -> Board {
        let ships: Vec<Cell> = (0..SHIP_CELLS)
            .map(|i| Cell::new((i + offset) % 10, i).unwrap())
            .collect();
        Board::from_ship_cells(&ships).unwrap()
    }

    fn create_pair() -> (PlayerSession, PlayerSession) {
        let game_id = [9; 16];
        let alice = Identity::generate();
        let bob = Identity::generate();
        let alice_id = alice.player_id();
        let bob_id = bob.player_id();

        let mut a = PlayerSession::new(game_id, alice, bob_id, fleet(0), generate_nonces());
        let mut b = PlayerSession::new(game_id, bob, alice_id, fleet(3), generate_nonces());

        let a_commit = a.commitment_message();
        let b_commit = b.commitment_message();
        a.receive_commitment(&b_commit).unwrap();
        b.receive_commitment(&a_commit).unwrap();
        (a, b)
    }

    #[test]
    fn test_commitment_exchange() {
        let (a, b) = create_pair();
        assert_eq!(a.state(), SessionState::Playing);
        assert_eq!(a.opponent_commitment().unwrap().root, b.own_commitment());
    }

    #[test]
    fn test_forged_commitment_rejected() {
        let (mut a, _) = create_pair();
        let mallory = Identity::generate();
        let mut forged = a.commitment_message();
        forged.signature = mallory.sign(&commitment_payload(&forged.game_id, &forged.root));

        let before = a.opponent_commitment().cloned();
        assert_eq!(
            a.receive_commitment(&forged),
            Err(ProtocolError::UnauthenticatedMessage { kind: "commitment" })
        );
        assert_eq!(a.opponent_commitment().cloned(), before);
    }

    #[test]
    fn test_guess_requires_commitment() {
        let bob = Identity::generate();
        let mut a = PlayerSession::new([1; 16], Identity::generate(), bob.player_id(), fleet(0), generate_nonces());
        assert_eq!(
            a.build_guess(Cell::new(0, 0).unwrap()),
            Err(ProtocolError::MissingOpponentCommitment)
        );
    }

    #[test]
    fn test_hit_and_miss() {
        let (mut a, b) = create_pair();

        // fleet(3) has a ship at (3, 0) and nothing at (0, 0)
        let hit_cell = Cell::new(3, 0).unwrap();
        let guess = a.build_guess(hit_cell).unwrap();
        let response = b.respond_to_guess(&guess).unwrap();
        assert_eq!(a.receive_response(&response), Ok(CellBelief::Hit));
        assert_eq!(a.hit_evidence().len(), 1);
        assert_eq!(a.last_opening().unwrap().leaf_index, 30);

        let miss_cell = Cell::new(0, 0).unwrap();
        let guess = a.build_guess(miss_cell).unwrap();
        let response = b.respond_to_guess(&guess).unwrap();
        assert_eq!(a.receive_response(&response), Ok(CellBelief::Miss));
        assert_eq!(a.hit_evidence().len(), 1);
    }

    #[test]
    fn test_duplicate_guess() {
        let (mut a, b) = create_pair();
        let cell = Cell::new(5, 5).unwrap();

        let guess = a.build_guess(cell).unwrap();
        assert!(matches!(a.build_guess(cell), Err(ProtocolError::DuplicateGuess { state: GuessState::Asked, .. })));

        let response = b.respond_to_guess(&guess).unwrap();
        a.receive_response(&response).unwrap();
        assert!(matches!(a.build_guess(cell), Err(ProtocolError::DuplicateGuess { .. })));
    }

    #[test]
    fn test_repeat_response_is_noop() {
        let (mut a, b) = create_pair();
        let guess = a.build_guess(Cell::new(3, 0).unwrap()).unwrap();
        let response = b.respond_to_guess(&guess).unwrap();

        a.receive_response(&response).unwrap();
        assert_eq!(a.receive_response(&response), Ok(CellBelief::Hit));
        assert_eq!(a.hit_evidence().len(), 1);
    }

    #[test]
    fn test_unsigned_guess_not_answered() {
        let (a, b) = create_pair();
        let mallory = Identity::generate();
        let cell = Cell::new(1, 1).unwrap();
        let forged = GuessMessage {
            game_id: *a.game_id(),
            row: 1,
            col: 1,
            signature: mallory.sign(&guess_payload(a.game_id(), cell)),
        };

        assert_eq!(
            b.respond_to_guess(&forged),
            Err(ProtocolError::UnauthenticatedMessage { kind: "guess" })
        );
    }

    #[test]
    fn test_unsolicited_opening() {
        let (mut a, b) = create_pair();
        let cell = Cell::new(4, 4).unwrap();

        // Correctly signed by `a`, but never recorded in a's grid
        let guess = GuessMessage {
            game_id: *a.game_id(),
            row: cell.row,
            col: cell.col,
            signature: a.identity.sign(&guess_payload(a.game_id(), cell)),
        };
        let response = b.respond_to_guess(&guess).unwrap();

        assert_eq!(a.receive_response(&response), Err(ProtocolError::UnsolicitedOpening { cell }));
        assert_eq!(a.belief(cell), CellBelief::Unknown);
    }

    #[test]
    fn test_relabelled_response_unauthenticated() {
        let (mut a, b) = create_pair();
        let guess = a.build_guess(Cell::new(7, 7).unwrap()).unwrap();
        let mut moved = b.respond_to_guess(&guess).unwrap();
        moved.row = 8;

        assert_eq!(
            a.receive_response(&moved),
            Err(ProtocolError::UnauthenticatedMessage { kind: "opening" })
        );
        assert_eq!(a.grid().state(Cell::new(7, 7).unwrap()), GuessState::Asked);
    }

    #[test]
    fn test_invalid_opening_retained() {
        let (mut a, b) = create_pair();
        let cell = Cell::new(2, 3).unwrap();
        let guess = a.build_guess(cell).unwrap();

        // Defender lies about the value and signs the lie
        let mut lie = b.respond_to_guess(&guess).unwrap();
        lie.hit = !lie.hit;
        lie.signature = b.identity.sign(&opening_payload(b.game_id(), &lie.evidence()));

        assert_eq!(a.receive_response(&lie), Err(ProtocolError::InvalidOpening { cell }));
        assert_eq!(a.belief(cell), CellBelief::Unknown);
        assert_eq!(a.grid().state(cell), GuessState::Disputed);
        assert_eq!(a.disputed_openings().len(), 1);
        assert!(matches!(a.build_guess(cell), Err(ProtocolError::DuplicateGuess { .. })));

        assert!(a.clear_dispute(cell).is_some());
        assert!(a.disputed_openings().is_empty());
    }

    #[test]
    fn test_replayed_invalid_opening_kept_once() {
        let (mut a, b) = create_pair();
        let cell = Cell::new(2, 3).unwrap();
        let guess = a.build_guess(cell).unwrap();
        let honest = b.respond_to_guess(&guess).unwrap();
        assert_eq!(a.receive_response(&honest), Ok(CellBelief::Miss));

        let mut lie = honest.clone();
        lie.hit = true;
        lie.signature = b.identity.sign(&opening_payload(b.game_id(), &lie.evidence()));

        for _ in 0..3 {
            assert_eq!(a.receive_response(&lie), Err(ProtocolError::InvalidOpening { cell }));
        }
        assert_eq!(a.disputed_openings().len(), 1);
        assert_eq!(a.grid().state(cell), GuessState::Miss);
    }

    #[test]
    fn test_wrong_game_rejected() {
        let (mut a, _) = create_pair();
        let mut commit = a.commitment_message();
        commit.game_id = [0; 16];
        assert_eq!(a.receive_commitment(&commit), Err(ProtocolError::WrongGame));
    }

    #[test]
    fn test_finished_session_rejects_guesses() {
        let (mut a, _) = create_pair();
        a.mark_finished();
        assert_eq!(a.build_guess(Cell::new(0, 0).unwrap()), Err(ProtocolError::GameAlreadyOver));
    }
}
