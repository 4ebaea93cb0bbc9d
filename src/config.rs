//! Game and Ledger Configuration

use chrono::Duration;

/// Default fencing window in seconds.
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;

/// Player-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Stake deposited when placing a bet.
    pub stake: u64,
    /// Fencing window handed to the ledger.
    pub timeout_secs: i64,
    /// Answer timeout flags raised against us without operator input.
    pub auto_answer_timeouts: bool,
    /// Seed used by the demo binary to place ships.
    pub demo_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            stake: 1_000,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auto_answer_timeouts: true,
            demo_seed: 12345,
        }
    }
}

impl GameConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stake: std::env::var("BATTLESHIP_STAKE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.stake),
            timeout_secs: std::env::var("BATTLESHIP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.timeout_secs),
            auto_answer_timeouts: std::env::var("BATTLESHIP_AUTO_ANSWER_TIMEOUTS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.auto_answer_timeouts),
            demo_seed: std::env::var("BATTLESHIP_DEMO_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.demo_seed),
        }
    }

    /// Fencing window as a duration.
    pub fn timeout_window(&self) -> Duration {
        Duration::seconds(self.timeout_secs)
    }

    /// Ledger settings matching this config.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            timeout_window: self.timeout_window(),
            ..LedgerConfig::default()
        }
    }
}

/// Ledger parameters.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long a flagged player has to answer.
    pub timeout_window: Duration,
    /// Event channel capacity.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            timeout_window: Duration::seconds(DEFAULT_TIMEOUT_SECS),
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.timeout_window(), Duration::seconds(60));
        assert!(config.auto_answer_timeouts);
        assert_eq!(LedgerConfig::default().timeout_window, Duration::seconds(60));
    }

    #[test]
    fn test_ledger_config_follows_game_config() {
        let config = GameConfig { timeout_secs: 5, ..GameConfig::default() };
        let ledger = config.ledger_config();
        assert_eq!(ledger.timeout_window, Duration::seconds(5));
        assert_eq!(ledger.event_capacity, 256);
    }
}
