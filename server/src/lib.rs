//! Minesweeper game service.
//!
//! Games live behind a [`repository::BoardRepository`]; [`logic::GameService`]
//! validates requests, runs the board engine and persists the result. The
//! Rocket routes in [`routes`] expose it over HTTP with basic authentication,
//! and [`events::EventHub`] pushes game events to WebSocket subscribers.

use std::sync::Arc;

use rocket::{Build, Rocket};
use tracing::warn;

pub mod auth;
pub mod cleanup;
pub mod config;
pub mod cors;
pub mod data;
pub mod error;
pub mod events;
pub mod logic;
pub mod rate_limit;
pub mod repository;
pub mod routes;
pub mod validation;

use crate::{
    config::ServerConfig,
    cors::create_cors,
    events::EventHub,
    logic::{GameService, state::Clock},
    rate_limit::RateLimiter,
    repository::BoardRepository,
};

/// Assembles the Rocket instance with its managed state, routes and catchers.
pub fn build_rocket(
    config: ServerConfig,
    repository: Arc<dyn BoardRepository>,
    clock: Arc<dyn Clock>,
) -> Result<Rocket<Build>, rocket_cors::Error> {
    let cors = create_cors(&config.allowed_origins)?;
    let service = GameService::new(repository, clock, config.dimensions);

    if config.credentials.is_empty() {
        warn!("No basic auth users configured, every game route will answer 401");
    }

    Ok(rocket::build()
        .attach(cors)
        .manage(service)
        .manage(EventHub::default())
        .manage(RateLimiter::new(config.games_per_minute))
        .manage(config.credentials.clone())
        .manage(config)
        .mount("/", routes::routes())
        .register("/", routes::catchers()))
}
