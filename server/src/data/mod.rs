use chrono::{DateTime, Utc};

pub use minesweeper_common::models::GameState;

pub type BoardId = u64;
pub type CellId = u64;

/// Stored in `adjacent_mines` of every mined cell.
pub const MINE_SENTINEL: i8 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Zero until the board is stored.
    pub id: CellId,
    pub board_id: BoardId,
    pub pos: Pos,
    pub has_mine: bool,
    pub is_revealed: bool,
    pub adjacent_mines: i8,
}

/// A board with its cells laid out row-major, `index = x + y * width`.
#[derive(Debug, Clone)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub mine_count: u32,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: GameState,
    pub version: u64,
    pub cells: Vec<Cell>,
}

/// A generated board that storage has not assigned identifiers to yet.
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub mine_count: u32,
    pub created_at: DateTime<Utc>,
    pub cells: Vec<Cell>,
}

impl Board {
    pub fn index_of(&self, pos: Pos) -> Option<usize> {
        (pos.x < self.width && pos.y < self.height).then_some(pos.x + pos.y * self.width)
    }

    pub fn cell_at(&self, pos: Pos) -> Option<&Cell> {
        self.index_of(pos).and_then(|index| self.cells.get(index))
    }

    pub fn position_of(&self, cell_id: CellId) -> Option<usize> {
        self.cells.iter().position(|cell| cell.id == cell_id)
    }
}
