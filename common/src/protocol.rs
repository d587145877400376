use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CellView;

/// Events produced by game operations and pushed to subscribers of a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    GameCreated { board_id: u64, name: String },
    #[serde(rename_all = "camelCase")]
    CellsRevealed { board_id: u64, cells: Vec<CellView> },
    #[serde(rename_all = "camelCase")]
    GameFinished {
        board_id: u64,
        ended_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    GameDeleted { board_id: u64 },
}

impl GameEvent {
    pub fn board_id(&self) -> u64 {
        match self {
            Self::GameCreated { board_id, .. }
            | Self::CellsRevealed { board_id, .. }
            | Self::GameFinished { board_id, .. }
            | Self::GameDeleted { board_id } => *board_id,
        }
    }
}
