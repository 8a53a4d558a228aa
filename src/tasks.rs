//! Background tasks.
//!
//! The leaderboard loop recomputes and re-pushes the board for every
//! open event on a fixed period. This keeps spectator views moving even
//! when no discrete score-update message lands between their refreshes.

use std::time::Duration;

use crate::domain::{EventBus, Notice};
use crate::service::{EventService, LeaderboardService};

/// Spawns the periodic leaderboard broadcast loop.
///
/// Every `interval_secs` the task lists open events, computes each
/// event's current board (decorated while a round is playing), and
/// publishes it to the event's leaderboard topic. Per-event failures
/// are logged and skipped; the loop never exits.
pub fn spawn_leaderboard_loop(
    events: EventService,
    leaderboards: LeaderboardService,
    event_bus: EventBus,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let open = match events.list_open_events().await {
                Ok(open) => open,
                Err(error) => {
                    tracing::error!(%error, "leaderboard loop failed to list events");
                    continue;
                }
            };

            for event in open {
                match leaderboards.current_board(event.id).await {
                    Ok(entries) => {
                        let _ = event_bus.publish(Notice::LeaderboardUpdated {
                            event_id: event.id,
                            entries,
                        });
                    }
                    Err(error) => {
                        tracing::error!(event_id = %event.id, %error, "leaderboard recompute failed");
                    }
                }
            }
        }
    });
}
