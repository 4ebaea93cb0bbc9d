//! Ledger Event Watcher
//!
//! Explicit subscription to ledger events on behalf of one player. The
//! watcher only filters and forwards; reacting (for example answering a
//! timeout flag) is left to the player driver on its own task.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::arbiter::ledger::{LedgerEvent, SettlementReason};
use crate::network::auth::PlayerId;

/// Ledger events that concern a particular player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerNotification {
    /// The opponent deposited its stake.
    OpponentJoined {
        /// Opponent.
        player: PlayerId,
        /// Stake locked.
        stake: u64,
    },
    /// The opponent registered its commitment.
    OpponentCommitted {
        /// Opponent.
        player: PlayerId,
    },
    /// We were flagged as unresponsive.
    Accused {
        /// Flagging player.
        accuser: PlayerId,
        /// Answer before this ledger time.
        deadline: DateTime<Utc>,
    },
    /// The opponent answered our timeout flag.
    TimeoutAnswered {
        /// Opponent.
        accused: PlayerId,
    },
    /// The opponent forfeited.
    OpponentLeft {
        /// Opponent.
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

impl PlayerNotification {
    /// Map a ledger event to a notification for `me`, if it concerns us.
    pub fn for_player(event: LedgerEvent, me: &PlayerId) -> Option<Self> {
        match event {
            LedgerEvent::PlayerJoined { player, stake } if player != *me => {
                Some(Self::OpponentJoined { player, stake })
            }
            LedgerEvent::CommitmentRegistered { player } if player != *me => {
                Some(Self::OpponentCommitted { player })
            }
            LedgerEvent::PlayerAccused { accuser, accused, deadline } if accused == *me => {
                Some(Self::Accused { accuser, deadline })
            }
            LedgerEvent::TimeoutAnswered { accused } if accused != *me => {
                Some(Self::TimeoutAnswered { accused })
            }
            LedgerEvent::PlayerLeft { player } if player != *me => Some(Self::OpponentLeft { player }),
            LedgerEvent::GameSettled { winner, reason, payout } => {
                Some(Self::GameSettled { winner, reason, payout })
            }
            _ => None,
        }
    }
}

/// Background forwarder from a ledger subscription to one player.
pub struct LedgerWatcher {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LedgerWatcher {
    /// Start watching. Notifications arrive on the returned receiver.
    ///
    /// The task ends on `stop`, after forwarding a settlement, or when the
    /// ledger drops its sender.
    pub fn start(
        mut events: broadcast::Receiver<LedgerEvent>,
        me: PlayerId,
    ) -> (Self, mpsc::Receiver<PlayerNotification>) {
        let (notify_tx, notify_rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        debug!(player = %me, "watcher stopped");
                        break;
                    }
                    result = events.recv() => {
                        let event = match result {
                            Ok(event) => event,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(player = %me, skipped, "watcher lagged behind ledger events");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };

                        let Some(notification) = PlayerNotification::for_player(event, &me) else {
                            continue;
                        };
                        let settled = matches!(notification, PlayerNotification::GameSettled { .. });
                        if notify_tx.send(notification).await.is_err() || settled {
                            break;
                        }
                    }
                }
            }
        });

        (Self { stop_tx: Some(stop_tx), handle: Some(handle) }, notify_rx)
    }

    /// Whether the forwarding task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop watching and wait for the task to end.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for LedgerWatcher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_own_events() {
        let me = PlayerId::new([1; 32]);
        let them = PlayerId::new([2; 32]);

        assert_eq!(PlayerNotification::for_player(LedgerEvent::PlayerJoined { player: me, stake: 5 }, &me), None);
        assert_eq!(
            PlayerNotification::for_player(LedgerEvent::PlayerJoined { player: them, stake: 5 }, &me),
            Some(PlayerNotification::OpponentJoined { player: them, stake: 5 })
        );

        let deadline = Utc::now();
        assert_eq!(
            PlayerNotification::for_player(LedgerEvent::PlayerAccused { accuser: me, accused: them, deadline }, &me),
            None
        );
        assert_eq!(
            PlayerNotification::for_player(LedgerEvent::PlayerAccused { accuser: them, accused: me, deadline }, &me),
            Some(PlayerNotification::Accused { accuser: them, deadline })
        );
    }

    #[tokio::test]
    async fn test_forwards_until_settled() {
        let me = PlayerId::new([1; 32]);
        let them = PlayerId::new([2; 32]);
        let (tx, rx) = broadcast::channel(16);
        let (watcher, mut notes) = LedgerWatcher::start(rx, me);

        tx.send(LedgerEvent::PlayerJoined { player: me, stake: 10 }).unwrap();
        tx.send(LedgerEvent::PlayerLeft { player: them }).unwrap();
        tx.send(LedgerEvent::GameSettled { winner: me, reason: SettlementReason::Forfeit, payout: 20 }).unwrap();

        assert_eq!(notes.recv().await, Some(PlayerNotification::OpponentLeft { player: them }));
        assert!(matches!(notes.recv().await, Some(PlayerNotification::GameSettled { payout: 20, .. })));
        assert_eq!(notes.recv().await, None);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_stop() {
        let (tx, rx) = broadcast::channel(16);
        let (watcher, mut notes) = LedgerWatcher::start(rx, PlayerId::new([1; 32]));

        watcher.stop().await;
        assert_eq!(notes.recv().await, None);
        drop(tx);
    }
}
