use chrono::{DateTime, Utc};

use crate::{
    data::{Board, GameState},
    error::{GameError, Result},
};

/// Source of the timestamps written on creation and at game end.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn ensure_active(board: &Board) -> Result<()> {
    match board.state {
        GameState::Active => Ok(()),
        GameState::Finished => Err(GameError::GameFinished(board.id)),
    }
}

/// Moves an active board to `Finished`. The end timestamp never precedes creation.
pub fn finish(board: &mut Board, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    ensure_active(board)?;

    let ended_at = now.max(board.created_at);
    board.state = GameState::Finished;
    board.ended_at = Some(ended_at);
    Ok(ended_at)
}

/// Every cell without a mine is revealed. Does not end the game.
pub fn is_cleared(board: &Board) -> bool {
    board
        .cells
        .iter()
        .all(|cell| cell.has_mine || cell.is_revealed)
}
