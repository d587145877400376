use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, Entry};
use tracing::{debug, info, instrument, warn};

use crate::{
    data::{Board, BoardId, GameState, NewBoard},
    error::StorageError,
};

use super::BoardRepository;

/// Process-local store. Boards are lost on restart.
#[derive(Debug)]
pub struct MemoryRepository {
    boards: DashMap<BoardId, Board>,
    names: DashMap<String, BoardId>,
    next_board_id: AtomicU64,
    next_cell_id: AtomicU64,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            boards: DashMap::new(),
            names: DashMap::new(),
            next_board_id: AtomicU64::new(1),
            next_cell_id: AtomicU64::new(1),
        }
    }
}

#[rocket::async_trait]
impl BoardRepository for MemoryRepository {
    #[instrument(level = "trace", skip_all, fields(name = %new_board.name))]
    async fn insert(&self, new_board: NewBoard) -> Result<Board, StorageError> {
        let id = match self.names.entry(new_board.name.clone()) {
            Entry::Occupied(_) => {
                debug!("Game name '{}' already taken", new_board.name);
                return Err(StorageError::NameTaken(new_board.name));
            }
            Entry::Vacant(entry) => {
                let id = self.next_board_id.fetch_add(1, Ordering::Relaxed);
                entry.insert(id);
                id
            }
        };

        let cells = new_board
            .cells
            .into_iter()
            .map(|mut cell| {
                cell.id = self.next_cell_id.fetch_add(1, Ordering::Relaxed);
                cell.board_id = id;
                cell
            })
            .collect();

        let board = Board {
            id,
            name: new_board.name,
            width: new_board.width,
            height: new_board.height,
            mine_count: new_board.mine_count,
            created_at: new_board.created_at,
            ended_at: None,
            state: GameState::Active,
            version: 0,
            cells,
        };
        self.boards.insert(id, board.clone());

        info!("Stored game {} ({} cells)", id, board.cells.len());
        Ok(board)
    }

    async fn load(&self, id: BoardId) -> Result<Option<Board>, StorageError> {
        Ok(self.boards.get(&id).map(|entry| entry.value().clone()))
    }

    #[instrument(level = "trace", skip_all, fields(id = board.id, version = board.version))]
    async fn save(&self, board: &Board) -> Result<(), StorageError> {
        let Some(mut stored) = self.boards.get_mut(&board.id) else {
            warn!("Attempted to save missing game {}", board.id);
            return Err(StorageError::Missing(board.id));
        };

        if stored.version != board.version {
            return Err(StorageError::VersionConflict {
                id: board.id,
                expected: board.version,
                found: stored.version,
            });
        }

        let mut updated = board.clone();
        updated.version += 1;
        *stored = updated;
        debug!("Saved game {} at version {}", board.id, stored.version);
        Ok(())
    }

    async fn delete(&self, id: BoardId) -> Result<bool, StorageError> {
        match self.boards.remove(&id) {
            Some((_, board)) => {
                self.names.remove(&board.name);
                debug!("Removed game {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_active(&self) -> Result<Vec<Board>, StorageError> {
        let mut boards: Vec<Board> = self
            .boards
            .iter()
            .filter(|entry| entry.state == GameState::Active)
            .map(|entry| entry.value().clone())
            .collect();
        boards.sort_by_key(|board| board.id);
        Ok(boards)
    }

    async fn list_finished_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BoardId>, StorageError> {
        Ok(self
            .boards
            .iter()
            .filter(|entry| entry.ended_at.is_some_and(|ended_at| ended_at < cutoff))
            .map(|entry| *entry.key())
            .collect())
    }
}
