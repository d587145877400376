use std::sync::Arc;

use minesweeper_server::{
    build_rocket,
    cleanup::start_cleanup_task,
    config::ServerConfig,
    events::EventHub,
    logic::{GameService, state::SystemClock},
    repository::MemoryRepository,
};
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
};
use tracing::{info, warn};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match (
            rocket.state::<GameService>(),
            rocket.state::<EventHub>(),
            rocket.state::<ServerConfig>(),
        ) {
            (Some(service), Some(hub), Some(config)) => {
                info!("Starting cleanup task for finished games");
                let service = service.clone();
                let hub = hub.clone();
                let (interval, retention) = (config.cleanup_interval, config.finished_retention);
                tokio::spawn(async move {
                    start_cleanup_task(service, hub, interval, retention).await;
                });
            }
            _ => warn!("Failed to get game state for cleanup task"),
        }
        Ok(rocket)
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    info!("Starting Minesweeper game service");

    let config = ServerConfig::from_env();
    info!(
        "Boards are {}x{}, {} games per minute per client",
        config.dimensions.width, config.dimensions.height, config.games_per_minute
    );

    let rocket = build_rocket(config, Arc::new(MemoryRepository::new()), Arc::new(SystemClock))?
        .attach(CleanupFairing);

    info!("Endpoints: POST /game, GET /game/active, GET|DELETE /game/<id>, GET /game/<id>/cells");
    info!("           POST /game/<id>/reveal/<cell_id>, POST /game/<id>/click, GET /game/<id>/events");

    let _ = rocket.launch().await?;
    Ok(())
}
