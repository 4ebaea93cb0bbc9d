//! Battleship Fair Play Demo
//!
//! Plays one complete game between two in-process players arbitrated by the
//! in-memory reference ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use battleship_fairplay::{
    Board, Cell, GameConfig, Identity, InMemoryLedger, Ledger, LedgerWatcher, Player,
    PlayerSession, CELL_COUNT, SHIP_CELLS, VERSION, generate_nonces,
    arbiter::PlayerNotification,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GameConfig::from_env();
    info!("Battleship Fair Play v{}", VERSION);
    info!("Stake: {}, timeout window: {}s", config.stake, config.timeout_secs);

    demo_game(config).await
}

/// Place SHIP_CELLS ships on distinct random cells.
fn random_fleet(rng: &mut StdRng) -> Result<Board> {
    let mut cells: Vec<Cell> = Cell::all().collect();
    cells.shuffle(rng);
    cells.truncate(SHIP_CELLS);
    Board::from_ship_cells(&cells).context("building demo fleet")
}

/// One attack: guess, answer, verify.
fn play_turn(
    attacker: &mut Player<InMemoryLedger>,
    defender: &Player<InMemoryLedger>,
    cell: Cell,
) -> Result<()> {
    let guess = attacker.guess(cell)?;
    let opening = defender.answer(&guess)?;
    let belief = attacker.receive_opening(&opening)?;
    info!("{} fires at {}: {:?}", attacker.id(), cell, belief);
    Ok(())
}

/// Forward pending ledger notifications to a player.
async fn drain(player: &mut Player<InMemoryLedger>, notes: &mut tokio::sync::mpsc::Receiver<PlayerNotification>) -> Result<()> {
    while let Ok(note) = notes.try_recv() {
        player.handle_notification(note).await?;
    }
    Ok(())
}

async fn demo_game(config: GameConfig) -> Result<()> {
    info!("=== Starting Demo Game ===");

    let ledger = Arc::new(InMemoryLedger::new(config.ledger_config()));
    let game_id = ledger.game_id();
    info!("Game ID: {}", hex::encode(game_id));

    let mut rng = StdRng::seed_from_u64(config.demo_seed);
    let alice = Identity::generate();
    let bob = Identity::generate();
    let (alice_id, bob_id) = (alice.player_id(), bob.player_id());

    let mut a = Player::new(
        PlayerSession::new(game_id, alice, bob_id, random_fleet(&mut rng)?, generate_nonces()),
        ledger.clone(),
        config.clone(),
    );
    let mut b = Player::new(
        PlayerSession::new(game_id, bob, alice_id, random_fleet(&mut rng)?, generate_nonces()),
        ledger.clone(),
        config,
    );

    let (a_watch, mut a_notes) = LedgerWatcher::start(ledger.subscribe(), alice_id);
    let (b_watch, mut b_notes) = LedgerWatcher::start(ledger.subscribe(), bob_id);

    a.place_bet().await?;
    b.place_bet().await?;
    let a_commit = a.register_commitment().await?;
    let b_commit = b.register_commitment().await?;
    a.receive_commitment(&b_commit).await?;
    b.receive_commitment(&a_commit).await?;
    info!("Commitments exchanged: {} / {}", a_commit.root, b_commit.root);

    let mut a_targets: Vec<Cell> = Cell::all().collect();
    let mut b_targets: Vec<Cell> = Cell::all().collect();
    a_targets.shuffle(&mut rng);
    b_targets.shuffle(&mut rng);

    for turn in 0..CELL_COUNT {
        play_turn(&mut a, &b, a_targets[turn])?;
        if a.session().has_sunk_fleet() {
            break;
        }
        play_turn(&mut b, &a, b_targets[turn])?;
        if b.session().has_sunk_fleet() {
            break;
        }
    }

    let winner = if a.session().has_sunk_fleet() { &mut a } else { &mut b };
    info!("{} sank the fleet, claiming win", winner.id());
    let over = winner.claim_win().await?;
    info!("Game over: {}", over);

    tokio::task::yield_now().await;
    drain(&mut a, &mut a_notes).await?;
    drain(&mut b, &mut b_notes).await?;
    a_watch.stop().await;
    b_watch.stop().await;

    info!("Alice's view of Bob's board:\n{}", a.session().grid().render());
    info!("Bob's view of Alice's board:\n{}", b.session().grid().render());

    for player in [&a, &b] {
        info!(
            "{}: payout {}, refund {}",
            player.id(),
            ledger.payout_of(&player.id()).await,
            ledger.refund_of(&player.id()).await
        );
    }

    info!("=== Demo Game Complete ===");
    Ok(())
}
