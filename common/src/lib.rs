//! Shared types for the minesweeper game service.
//!
//! `models` holds the request and response bodies of the HTTP API, `protocol`
//! the domain events pushed to WebSocket subscribers of a game.

pub mod models;
pub mod protocol;
