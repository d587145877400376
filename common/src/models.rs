use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Active,
    Finished,
}

/// One grid position as seen by API consumers.
///
/// `adjacent_mines` is `-1` for mined cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub is_revealed: bool,
    pub has_mine: bool,
    pub adjacent_mines: i8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub id: u64,
    pub name: String,
    pub state: GameState,
    pub width: usize,
    pub height: usize,
    pub mines_count: u32,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Every safe cell has been revealed. Informational only, the game stays active.
    pub cleared: bool,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub name: String,
    pub mines_count: i64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRequest {
    pub game_id: u64,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_view_uses_camel_case() {
        let cell = CellView {
            id: 7,
            x: 1,
            y: 2,
            is_revealed: true,
            has_mine: false,
            adjacent_mines: 3,
        };

        let json = serde_json::to_value(&cell).unwrap();
        assert_eq!(json["isRevealed"], true);
        assert_eq!(json["hasMine"], false);
        assert_eq!(json["adjacentMines"], 3);
    }

    #[test]
    fn click_request_reads_game_id() {
        let click: ClickRequest = serde_json::from_str(r#"{"gameId":4,"x":3,"y":-1}"#).unwrap();
        assert_eq!(click.game_id, 4);
        assert_eq!(click.y, -1);
    }
}
