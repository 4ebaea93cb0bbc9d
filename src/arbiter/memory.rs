//! In-Memory Reference Ledger
//!
//! A single-process implementation of the [`Ledger`] contract. It enforces
//! every ledger-side guarantee the players rely on: bid rules, one commitment
//! per player, independent re-verification of evidence, exactly-once
//! settlement, and a fencing timer driven by its own clock.
//!
//! Uses BTree collections so state dumps are ordered.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn, instrument};

use crate::{GameId, SHIP_CELLS, new_game_id};
use crate::arbiter::clock::{LedgerClock, SystemClock};
use crate::config::LedgerConfig;
use crate::arbiter::ledger::{
    CheatingAccusation, Ledger, LedgerError, LedgerEvent, SettlementReason,
};
use crate::core::hash::short_hex;
use crate::network::auth::{opening_payload, verify_signature, PlayerId};
use crate::proof::{BoardCommitment, CellEvidence, MerkleError};

/// Game phase as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Fewer than two stakes deposited, or commitments outstanding.
    Setup,
    /// Both stakes and both commitments in place.
    Playing,
    /// Stake paid out.
    Settled {
        /// Recipient.
        winner: PlayerId,
        /// Settlement path.
        reason: SettlementReason,
    },
}

/// One seated player.
#[derive(Debug, Clone)]
struct Seat {
    player: PlayerId,
    commitment: Option<BoardCommitment>,
    /// Own ship cells proven by this player.
    proven_own: BTreeSet<usize>,
    /// Opponent cells this player proved as hits.
    proven_hits: BTreeSet<usize>,
}

impl Seat {
    fn new(player: PlayerId) -> Self {
        Self {
            player,
            commitment: None,
            proven_own: BTreeSet::new(),
            proven_hits: BTreeSet::new(),
        }
    }
}

/// Pending unresponsiveness flag.
#[derive(Debug, Clone, Copy)]
struct TimeoutFlag {
    accuser: PlayerId,
    accused: PlayerId,
    deadline: DateTime<Utc>,
}

#[derive(Debug)]
struct LedgerState {
    phase: GamePhase,
    bid: u64,
    seats: Vec<Seat>,
    /// Funds currently locked.
    balance: u64,
    /// Excess stake returned on deposit.
    refunds: BTreeMap<PlayerId, u64>,
    /// Settled winnings.
    payouts: BTreeMap<PlayerId, u64>,
    timeout: Option<TimeoutFlag>,
    /// Roots registered in earlier games.
    retired_roots: BTreeSet<BoardCommitment>,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            phase: GamePhase::Setup,
            bid: 0,
            seats: Vec::with_capacity(2),
            balance: 0,
            refunds: BTreeMap::new(),
            payouts: BTreeMap::new(),
            timeout: None,
            retired_roots: BTreeSet::new(),
        }
    }

    fn seat(&self, player: &PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player == *player)
    }

    fn seat_mut(&mut self, player: &PlayerId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.player == *player)
    }

    /// The other seated player, if `caller` is seated and the game is full.
    fn opponent_of(&self, call: &'static str, caller: &PlayerId) -> Result<PlayerId, LedgerError> {
        if self.seat(caller).is_none() {
            return Err(LedgerError::rejected(call, "caller is not a player in this game"));
        }
        self.seats
            .iter()
            .map(|s| s.player)
            .find(|p| p != caller)
            .ok_or_else(|| LedgerError::rejected(call, "no opponent has joined"))
    }

    /// Require the named opponent to be the caller's actual opponent.
    fn check_opponent(
        &self,
        call: &'static str,
        caller: &PlayerId,
        opponent: &PlayerId,
    ) -> Result<(), LedgerError> {
        if caller == opponent {
            return Err(LedgerError::rejected(call, "caller and opponent are the same player"));
        }
        if self.opponent_of(call, caller)? != *opponent {
            return Err(LedgerError::rejected(call, "named opponent is not in this game"));
        }
        Ok(())
    }

    fn require_not_settled(&self) -> Result<(), LedgerError> {
        match self.phase {
            GamePhase::Settled { .. } => Err(LedgerError::GameAlreadyOver),
            _ => Ok(()),
        }
    }

    fn require_playing(&self, call: &'static str) -> Result<(), LedgerError> {
        match self.phase {
            GamePhase::Playing => Ok(()),
            GamePhase::Settled { .. } => Err(LedgerError::GameAlreadyOver),
            GamePhase::Setup => Err(LedgerError::rejected(call, "game has not started")),
        }
    }

    fn commitment_of(&self, call: &'static str, player: &PlayerId) -> Result<BoardCommitment, LedgerError> {
        self.seat(player)
            .and_then(|s| s.commitment)
            .ok_or_else(|| LedgerError::rejected(call, "player has no registered commitment"))
    }

    fn maybe_start(&mut self) {
        if self.seats.len() == 2 && self.seats.iter().all(|s| s.commitment.is_some()) {
            self.phase = GamePhase::Playing;
        }
    }
}

/// Reference ledger held entirely in memory.
pub struct InMemoryLedger {
    game_id: Mutex<GameId>,
    config: LedgerConfig,
    clock: Arc<dyn LedgerClock>,
    state: RwLock<LedgerState>,
    events: broadcast::Sender<LedgerEvent>,
}

impl InMemoryLedger {
    /// Ledger on the system clock.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Ledger on a supplied clock.
    pub fn with_clock(config: LedgerConfig, clock: Arc<dyn LedgerClock>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            game_id: Mutex::new(new_game_id()),
            config,
            clock,
            state: RwLock::new(LedgerState::new()),
            events,
        }
    }

    /// Current phase.
    pub async fn phase(&self) -> GamePhase {
        self.state.read().await.phase
    }

    /// Recorded winner, if settled.
    pub async fn winner(&self) -> Option<PlayerId> {
        match self.state.read().await.phase {
            GamePhase::Settled { winner, .. } => Some(winner),
            _ => None,
        }
    }

    /// Funds currently locked.
    pub async fn locked_balance(&self) -> u64 {
        self.state.read().await.balance
    }

    /// Winnings paid to a player.
    pub async fn payout_of(&self, player: &PlayerId) -> u64 {
        self.state.read().await.payouts.get(player).copied().unwrap_or(0)
    }

    /// Excess stake refunded to a player.
    pub async fn refund_of(&self, player: &PlayerId) -> u64 {
        self.state.read().await.refunds.get(player).copied().unwrap_or(0)
    }

    /// (own ships, hits) proven by a player so far.
    pub async fn proven_counts(&self, player: &PlayerId) -> (usize, usize) {
        let state = self.state.read().await;
        state
            .seat(player)
            .map(|s| (s.proven_own.len(), s.proven_hits.len()))
            .unwrap_or((0, 0))
    }

    /// Open a fresh game on this ledger after settlement.
    ///
    /// Roots from the finished game are retired and can never be registered again.
    pub async fn start_next_game(&self) -> Result<GameId, LedgerError> {
        let mut state = self.state.write().await;
        if !matches!(state.phase, GamePhase::Settled { .. }) {
            return Err(LedgerError::rejected("start_next_game", "current game is not settled"));
        }

        let mut retired = std::mem::take(&mut state.retired_roots);
        retired.extend(state.seats.iter().filter_map(|s| s.commitment));
        *state = LedgerState::new();
        state.retired_roots = retired;

        let id = new_game_id();
        *self.game_id.lock().unwrap_or_else(|e| e.into_inner()) = id;
        info!(game = %hex::encode(id), "next game opened");
        Ok(id)
    }

    fn emit(&self, event: LedgerEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn settle(&self, state: &mut LedgerState, winner: PlayerId, reason: SettlementReason) {
        let payout = state.balance;
        let total = state.payouts.entry(winner).or_insert(0);
        *total = total.saturating_add(payout);
        state.balance = 0;
        state.timeout = None;
        state.phase = GamePhase::Settled { winner, reason };
        info!(%winner, ?reason, payout, "game settled");
        self.emit(LedgerEvent::GameSettled { winner, reason, payout });
    }
}

impl Ledger for InMemoryLedger {
    fn game_id(&self) -> GameId {
        *self.game_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    #[instrument(skip_all, fields(caller = %caller))]
    async fn deposit_stake(&self, caller: PlayerId, amount: u64) -> Result<(), LedgerError> {
        const CALL: &str = "deposit_stake";
        let mut state = self.state.write().await;
        state.require_not_settled()?;

        if amount == 0 {
            return Err(LedgerError::rejected(CALL, "stake must be greater than zero"));
        }
        if state.seats.len() >= 2 {
            return Err(LedgerError::rejected(CALL, "game already has two players"));
        }
        if state.seat(&caller).is_some() {
            return Err(LedgerError::rejected(CALL, "a player cannot play against itself"));
        }

        let (locked, excess) = if state.seats.is_empty() {
            (amount, 0)
        } else {
            if amount < state.bid {
                return Err(LedgerError::rejected(
                    CALL,
                    format!("stake {} is below the opening bid {}", amount, state.bid),
                ));
            }
            (state.bid, amount - state.bid)
        };
        let balance = state
            .balance
            .checked_add(locked)
            .ok_or_else(|| LedgerError::rejected(CALL, "stake overflows the pot"))?;

        if state.seats.is_empty() {
            state.bid = amount;
        }
        if excess > 0 {
            let refund = state.refunds.entry(caller).or_insert(0);
            *refund = refund.saturating_add(excess);
        }
        state.balance = balance;
        state.seats.push(Seat::new(caller));
        state.maybe_start();
        info!(stake = locked, "player joined");
        self.emit(LedgerEvent::PlayerJoined { player: caller, stake: locked });
        Ok(())
    }

    #[instrument(skip_all, fields(caller = %caller))]
    async fn register_commitment(&self, caller: PlayerId, root: BoardCommitment) -> Result<(), LedgerError> {
        const CALL: &str = "register_commitment";
        let mut state = self.state.write().await;
        state.require_not_settled()?;

        if state.phase == GamePhase::Playing {
            return Err(LedgerError::rejected(CALL, "both commitments are already registered"));
        }
        if state.retired_roots.contains(&root) {
            warn!(root = %short_hex(root.as_bytes()), "stale commitment rejected");
            return Err(LedgerError::rejected(CALL, "commitment was used in a previous game"));
        }
        let seat = state
            .seat_mut(&caller)
            .ok_or_else(|| LedgerError::rejected(CALL, "only seated players may register a commitment"))?;
        if seat.commitment.is_some() {
            return Err(LedgerError::rejected(CALL, "commitment already registered"));
        }

        seat.commitment = Some(root);
        state.maybe_start();
        info!(root = %short_hex(root.as_bytes()), "commitment registered");
        self.emit(LedgerEvent::CommitmentRegistered { player: caller });
        Ok(())
    }

    async fn registered_commitment(&self, player: PlayerId) -> Result<Option<BoardCommitment>, LedgerError> {
        Ok(self.state.read().await.seat(&player).and_then(|s| s.commitment))
    }

    #[instrument(skip_all, fields(caller = %caller, accused = %accusation.accused))]
    async fn accuse_cheating(&self, caller: PlayerId, accusation: CheatingAccusation) -> Result<bool, LedgerError> {
        const CALL: &str = "accuse_cheating";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        state.check_opponent(CALL, &caller, &accusation.accused)?;

        let payload = opening_payload(&self.game_id(), &accusation.evidence);
        if !verify_signature(&payload, &accusation.signature, &accusation.accused) {
            warn!("accusation evidence not signed by the accused");
            self.settle(&mut state, accusation.accused, SettlementReason::FalseEvidence);
            return Ok(false);
        }

        let root = state.commitment_of(CALL, &accusation.accused)?;
        if accusation.evidence.is_valid_for(&root) {
            info!(leaf = accusation.evidence.leaf_index, "accusation unfounded");
            return Ok(false);
        }

        warn!(leaf = accusation.evidence.leaf_index, "cheating proven");
        self.settle(&mut state, caller, SettlementReason::CheatingProven);
        Ok(true)
    }

    #[instrument(skip_all, fields(caller = %caller, owner = %board_owner, leaf = evidence.leaf_index))]
    async fn check_one_ship(
        &self,
        caller: PlayerId,
        evidence: CellEvidence,
        board_owner: PlayerId,
    ) -> Result<bool, LedgerError> {
        const CALL: &str = "check_one_ship";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        if state.seat(&caller).is_none() {
            return Err(LedgerError::rejected(CALL, "caller is not a player in this game"));
        }
        let root = state.commitment_of(CALL, &board_owner)?;

        let verified = match evidence.verify(&root) {
            Ok(ok) => ok,
            Err(MerkleError::LeafIndexOutOfRange { index, capacity }) => {
                return Err(LedgerError::rejected(
                    CALL,
                    format!("leaf index {} out of range (capacity {})", index, capacity),
                ));
            }
        };
        if !verified || !evidence.value || evidence.cell().is_none() {
            return Ok(false);
        }

        if let Some(seat) = state.seat_mut(&caller) {
            if board_owner == caller {
                seat.proven_own.insert(evidence.leaf_index);
            } else {
                seat.proven_hits.insert(evidence.leaf_index);
            }
        }
        Ok(true)
    }

    #[instrument(skip_all, fields(caller = %caller))]
    async fn claim_win(&self, caller: PlayerId) -> Result<(), LedgerError> {
        const CALL: &str = "claim_win";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        let seat = state
            .seat(&caller)
            .ok_or_else(|| LedgerError::rejected(CALL, "caller is not a player in this game"))?;

        let (own_ships, hits) = (seat.proven_own.len(), seat.proven_hits.len());
        if own_ships < SHIP_CELLS || hits < SHIP_CELLS {
            return Err(LedgerError::IncompleteProof { own_ships, hits, required: SHIP_CELLS });
        }

        self.settle(&mut state, caller, SettlementReason::Win);
        Ok(())
    }

    #[instrument(skip_all, fields(caller = %caller, opponent = %opponent))]
    async fn claim_opponent_left(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError> {
        const CALL: &str = "claim_opponent_left";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        state.check_opponent(CALL, &caller, &opponent)?;
        if state.timeout.is_some() {
            return Err(LedgerError::rejected(CALL, "a timeout is already pending"));
        }

        let deadline = self.clock.now() + self.config.timeout_window;
        state.timeout = Some(TimeoutFlag { accuser: caller, accused: opponent, deadline });
        info!(%deadline, "opponent flagged as unresponsive");
        self.emit(LedgerEvent::PlayerAccused { accuser: caller, accused: opponent, deadline });
        Ok(())
    }

    #[instrument(skip_all, fields(caller = %caller, opponent = %opponent))]
    async fn handle_timeout(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError> {
        const CALL: &str = "handle_timeout";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        state.check_opponent(CALL, &caller, &opponent)?;

        let flag = match state.timeout {
            Some(flag) if flag.accused == caller && flag.accuser == opponent => flag,
            _ => return Err(LedgerError::rejected(CALL, "no pending timeout against caller")),
        };
        if self.clock.now() >= flag.deadline {
            return Err(LedgerError::rejected(CALL, "timeout window has elapsed"));
        }

        state.timeout = None;
        info!("timeout answered");
        self.emit(LedgerEvent::TimeoutAnswered { accused: caller });
        Ok(())
    }

    #[instrument(skip_all, fields(caller = %caller, opponent = %opponent))]
    async fn claim_timeout_winnings(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError> {
        const CALL: &str = "claim_timeout_winnings";
        let mut state = self.state.write().await;
        state.require_playing(CALL)?;
        state.check_opponent(CALL, &caller, &opponent)?;

        let flag = match state.timeout {
            Some(flag) if flag.accuser == caller && flag.accused == opponent => flag,
            _ => return Err(LedgerError::rejected(CALL, "no pending timeout raised by caller")),
        };
        if self.clock.now() < flag.deadline {
            return Err(LedgerError::rejected(CALL, "timeout window is still open"));
        }

        self.settle(&mut state, caller, SettlementReason::Timeout);
        Ok(())
    }

    #[instrument(skip_all, fields(caller = %caller, opponent = %opponent))]
    async fn forfeit(&self, caller: PlayerId, opponent: PlayerId) -> Result<(), LedgerError> {
        const CALL: &str = "forfeit";
        let mut state = self.state.write().await;
        state.require_not_settled()?;
        state.check_opponent(CALL, &caller, &opponent)?;

        self.emit(LedgerEvent::PlayerLeft { player: caller });
        self.settle(&mut state, opponent, SettlementReason::Forfeit);
        Ok(())
    }

    async fn is_game_over(&self) -> Result<bool, LedgerError> {
        Ok(matches!(self.state.read().await.phase, GamePhase::Settled { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::arbiter::clock::ManualClock;
    use crate::board::{Board, Cell, generate_nonces};
    use crate::network::auth::Identity;
    use crate::CELL_COUNT;
    use crate::core::hash::empty_leaf_hash;
    use crate::proof::{opening_leaf_hash, CommittedBoard, MerkleTree};

    const BID: u64 = 1_000;

    fn create_test_ledger() -> (InMemoryLedger, ManualClock) {
        let clock = ManualClock::default();
        let ledger = InMemoryLedger::with_clock(LedgerConfig::default(), Arc::new(clock.clone()));
        (ledger, clock)
    }

    fn fleet() -> Board {
        let ships: Vec<Cell> = (0..SHIP_CELLS).map(|i| Cell::new(0, i).unwrap()).collect();
        Board::from_ship_cells(&ships).unwrap()
    }

    async fn start_game(ledger: &InMemoryLedger) -> (PlayerId, PlayerId, CommittedBoard, CommittedBoard) {
        let p1 = Identity::generate().player_id();
        let p2 = Identity::generate().player_id();
        let b1 = CommittedBoard::new(fleet(), generate_nonces());
        let b2 = CommittedBoard::new(fleet(), generate_nonces());

        ledger.deposit_stake(p1, BID).await.unwrap();
        ledger.deposit_stake(p2, BID).await.unwrap();
        ledger.register_commitment(p1, b1.root()).await.unwrap();
        ledger.register_commitment(p2, b2.root()).await.unwrap();
        (p1, p2, b1, b2)
    }

    #[tokio::test]
    async fn test_store_bids() {
        let (ledger, _) = create_test_ledger();
        let p1 = PlayerId::new([1; 32]);
        let p2 = PlayerId::new([2; 32]);

        ledger.deposit_stake(p1, BID).await.unwrap();
        ledger.deposit_stake(p2, BID * 2).await.unwrap();

        assert_eq!(ledger.locked_balance().await, BID * 2);
        assert_eq!(ledger.refund_of(&p2).await, BID);
        assert_eq!(ledger.phase().await, GamePhase::Setup);
    }

    #[tokio::test]
    async fn test_bid_rules() {
        let (ledger, _) = create_test_ledger();
        let p1 = PlayerId::new([1; 32]);
        let p2 = PlayerId::new([2; 32]);
        let p3 = PlayerId::new([3; 32]);

        assert!(matches!(ledger.deposit_stake(p1, 0).await, Err(LedgerError::ArbitrationRejected { .. })));
        ledger.deposit_stake(p1, BID).await.unwrap();
        assert!(matches!(ledger.deposit_stake(p1, BID).await, Err(LedgerError::ArbitrationRejected { .. })));
        assert!(matches!(ledger.deposit_stake(p2, BID / 2).await, Err(LedgerError::ArbitrationRejected { .. })));
        ledger.deposit_stake(p2, BID).await.unwrap();
        assert!(matches!(ledger.deposit_stake(p3, BID).await, Err(LedgerError::ArbitrationRejected { .. })));
    }

    #[tokio::test]
    async fn test_stake_overflow_rejected() {
        let (ledger, _) = create_test_ledger();
        let p1 = PlayerId::new([1; 32]);
        let p2 = PlayerId::new([2; 32]);

        ledger.deposit_stake(p1, u64::MAX).await.unwrap();
        assert!(matches!(
            ledger.deposit_stake(p2, u64::MAX).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
        assert_eq!(ledger.locked_balance().await, u64::MAX);
        assert_eq!(ledger.refund_of(&p2).await, 0);
        assert_eq!(ledger.phase().await, GamePhase::Setup);
    }

    #[tokio::test]
    async fn test_commitment_rules() {
        let (ledger, _) = create_test_ledger();
        let (p1, _, b1, _) = start_game(&ledger).await;
        assert_eq!(ledger.phase().await, GamePhase::Playing);

        // Late registration after both are set
        assert!(matches!(
            ledger.register_commitment(p1, b1.root()).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));

        let (other, _) = create_test_ledger();
        let outsider = PlayerId::new([9; 32]);
        assert!(matches!(
            other.register_commitment(outsider, b1.root()).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_check_one_ship_and_claim_win() {
        let (ledger, _) = create_test_ledger();
        let (p1, p2, b1, b2) = start_game(&ledger).await;

        assert!(matches!(ledger.claim_win(p1).await, Err(LedgerError::IncompleteProof { .. })));

        for opening in b1.ship_openings().unwrap() {
            assert!(ledger.check_one_ship(p1, opening.clone(), p1).await.unwrap());
            // Idempotent
            assert!(ledger.check_one_ship(p1, opening, p1).await.unwrap());
        }
        for opening in b2.ship_openings().unwrap() {
            assert!(ledger.check_one_ship(p1, opening, p2).await.unwrap());
        }
        assert_eq!(ledger.proven_counts(&p1).await, (SHIP_CELLS, SHIP_CELLS));

        ledger.claim_win(p1).await.unwrap();
        assert_eq!(ledger.winner().await, Some(p1));
        assert_eq!(ledger.payout_of(&p1).await, BID * 2);
        assert_eq!(ledger.claim_win(p1).await, Err(LedgerError::GameAlreadyOver));
        assert!(ledger.is_game_over().await.unwrap());
    }

    #[tokio::test]
    async fn test_check_one_ship_rejects_misses_and_bad_proofs() {
        let (ledger, _) = create_test_ledger();
        let (p1, p2, _, b2) = start_game(&ledger).await;

        let miss = b2.open(Cell::new(5, 5).unwrap()).unwrap();
        assert!(!ledger.check_one_ship(p1, miss, p2).await.unwrap());

        let mut forged = b2.open(Cell::new(0, 0).unwrap()).unwrap();
        forged.nonce[0] ^= 1;
        assert!(!ledger.check_one_ship(p1, forged, p2).await.unwrap());

        let mut out_of_range = b2.open(Cell::new(0, 0).unwrap()).unwrap();
        out_of_range.leaf_index = 500;
        assert!(matches!(
            ledger.check_one_ship(p1, out_of_range, p2).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
        assert_eq!(ledger.proven_counts(&p1).await, (0, 0));
    }

    #[tokio::test]
    async fn test_check_one_ship_rejects_padding_slots() {
        let (ledger, _) = create_test_ledger();
        let p1 = Identity::generate().player_id();
        let p2 = Identity::generate().player_id();
        let b1 = CommittedBoard::new(fleet(), generate_nonces());

        // A root whose padding slots 100 and 127 hold ship openings
        let nonce = [7u8; 32];
        let mut leaves = vec![empty_leaf_hash(); crate::TREE_CAPACITY];
        for leaf in &mut leaves[..CELL_COUNT] {
            *leaf = opening_leaf_hash(false, &[0u8; 32]);
        }
        leaves[CELL_COUNT] = opening_leaf_hash(true, &nonce);
        leaves[crate::TREE_CAPACITY - 1] = opening_leaf_hash(true, &nonce);
        let tree = MerkleTree::from_leaf_hashes(leaves);
        let forged_root = BoardCommitment(tree.root());

        ledger.deposit_stake(p1, BID).await.unwrap();
        ledger.deposit_stake(p2, BID).await.unwrap();
        ledger.register_commitment(p1, b1.root()).await.unwrap();
        ledger.register_commitment(p2, forged_root).await.unwrap();

        for leaf_index in [CELL_COUNT, crate::TREE_CAPACITY - 1] {
            let padding = CellEvidence {
                value: true,
                nonce,
                leaf_index,
                proof: tree.prove(leaf_index).unwrap(),
            };
            assert!(padding.is_valid_for(&forged_root));
            assert!(!ledger.check_one_ship(p1, padding, p2).await.unwrap());
        }
        assert_eq!(ledger.proven_counts(&p1).await, (0, 0));
    }

    #[tokio::test]
    async fn test_registered_commitment() {
        let (ledger, _) = create_test_ledger();
        let outsider = PlayerId::new([9; 32]);
        assert_eq!(ledger.registered_commitment(outsider).await.unwrap(), None);

        let (p1, p2, b1, b2) = start_game(&ledger).await;
        assert_eq!(ledger.registered_commitment(p1).await.unwrap(), Some(b1.root()));
        assert_eq!(ledger.registered_commitment(p2).await.unwrap(), Some(b2.root()));
    }

    #[tokio::test]
    async fn test_timeout_answered() {
        let (ledger, clock) = create_test_ledger();
        let (p1, p2, _, _) = start_game(&ledger).await;

        ledger.claim_opponent_left(p1, p2).await.unwrap();
        clock.advance(Duration::seconds(30));
        ledger.handle_timeout(p2, p1).await.unwrap();
        clock.advance(Duration::seconds(60));

        assert!(matches!(
            ledger.claim_timeout_winnings(p1, p2).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
        assert!(!ledger.is_game_over().await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_unanswered() {
        let (ledger, clock) = create_test_ledger();
        let (p1, p2, _, _) = start_game(&ledger).await;

        ledger.claim_opponent_left(p1, p2).await.unwrap();
        assert!(matches!(
            ledger.claim_timeout_winnings(p1, p2).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));

        clock.advance(Duration::seconds(61));
        assert!(matches!(
            ledger.handle_timeout(p2, p1).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
        ledger.claim_timeout_winnings(p1, p2).await.unwrap();
        assert_eq!(ledger.winner().await, Some(p1));
    }

    #[tokio::test]
    async fn test_forfeit() {
        let (ledger, _) = create_test_ledger();
        let (p1, p2, _, _) = start_game(&ledger).await;
        let mut events = ledger.subscribe();

        assert!(matches!(ledger.forfeit(p2, p2).await, Err(LedgerError::ArbitrationRejected { .. })));
        ledger.forfeit(p1, p2).await.unwrap();

        assert_eq!(ledger.winner().await, Some(p2));
        assert_eq!(events.recv().await.unwrap(), LedgerEvent::PlayerLeft { player: p1 });
        assert!(matches!(events.recv().await.unwrap(), LedgerEvent::GameSettled { reason: SettlementReason::Forfeit, .. }));
        assert_eq!(ledger.forfeit(p2, p1).await, Err(LedgerError::GameAlreadyOver));
    }

    #[tokio::test]
    async fn test_stale_commitment_rejected_next_game() {
        let (ledger, _) = create_test_ledger();
        let (p1, p2, b1, _) = start_game(&ledger).await;
        ledger.forfeit(p1, p2).await.unwrap();

        let old_id = ledger.game_id();
        let new_id = ledger.start_next_game().await.unwrap();
        assert_ne!(old_id, new_id);

        ledger.deposit_stake(p1, BID).await.unwrap();
        assert!(matches!(
            ledger.register_commitment(p1, b1.root()).await,
            Err(LedgerError::ArbitrationRejected { .. })
        ));
    }
}
