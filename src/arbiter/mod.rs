//! Arbitration Layer
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ARBITRATION                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ledger.rs   - Ledger contract, events, accusations         │
//! │  memory.rs   - In-memory reference ledger                   │
//! │  clock.rs    - Authoritative ledger clock                   │
//! │  watcher.rs  - Per-player event subscription                │
//! │  player.rs   - Player driver (session + ledger)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod ledger;
pub mod memory;
pub mod player;
pub mod watcher;

pub use clock::{LedgerClock, ManualClock, SystemClock};
pub use ledger::{CheatingAccusation, Ledger, LedgerError, LedgerEvent, SettlementReason};
pub use memory::{GamePhase, InMemoryLedger};
pub use player::{Player, PlayerError};
pub use watcher::{LedgerWatcher, PlayerNotification};
