use std::{env, str::FromStr, time::Duration};

use tracing::warn;

use crate::{auth::Credentials, logic::BoardDimensions};

/// Settings read from the environment at startup.
///
/// Address and port are left to Rocket's own `ROCKET_*` variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allowed_origins: Vec<String>,
    pub games_per_minute: u32,
    pub cleanup_interval: Duration,
    pub finished_retention: Duration,
    pub dimensions: BoardDimensions,
    pub credentials: Credentials,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            games_per_minute: 10,
            cleanup_interval: Duration::from_secs(60),
            finished_retention: Duration::from_secs(86400),
            dimensions: BoardDimensions::default(),
            credentials: Credentials::parse("games-app:games-app"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, value);
            default
        }),
        Err(_) => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.allowed_origins);

        let credentials = env::var("BASIC_AUTH_USERS")
            .map(|users| Credentials::parse(&users))
            .unwrap_or(defaults.credentials);

        let dimensions = BoardDimensions::clamped(
            env_or("BOARD_WIDTH", defaults.dimensions.width),
            env_or("BOARD_HEIGHT", defaults.dimensions.height),
        );

        Self {
            allowed_origins,
            games_per_minute: env_or("RATE_LIMIT_GAMES_PER_MINUTE", defaults.games_per_minute),
            cleanup_interval: Duration::from_secs(
                env_or("CLEANUP_INTERVAL_SECONDS", defaults.cleanup_interval.as_secs()).max(1),
            ),
            finished_retention: Duration::from_secs(env_or(
                "FINISHED_GAME_RETENTION_SECONDS",
                defaults.finished_retention.as_secs(),
            )),
            dimensions,
            credentials,
        }
    }
}
