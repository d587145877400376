use std::time::Duration;

use tokio::time;
use tracing::{debug, error, info};

use crate::{events::EventHub, logic::GameService};

/// Periodically deletes games that finished more than `retention` ago.
pub async fn start_cleanup_task(
    service: GameService,
    hub: EventHub,
    interval: Duration,
    retention: Duration,
) {
    let mut interval_timer = time::interval(interval);

    info!(
        "Started game cleanup task: checking every {}s, finished game retention: {}s",
        interval.as_secs(),
        retention.as_secs()
    );

    loop {
        interval_timer.tick().await;
        cleanup_games(&service, &hub, retention).await;
    }
}

pub async fn cleanup_games(service: &GameService, hub: &EventHub, retention: Duration) -> usize {
    match service.sweep_finished(retention).await {
        Ok(outcome) => {
            hub.dispatch(&outcome.events).await;
            if outcome.value > 0 {
                info!("Cleaned up {} finished games", outcome.value);
            } else {
                debug!("No finished games to clean up");
            }
            outcome.value
        }
        Err(e) => {
            error!("Game cleanup failed: {}", e);
            0
        }
    }
}
