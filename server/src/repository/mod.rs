//! Storage boundary for boards and their cells.
//!
//! The engine only ever sees a fully loaded [`Board`]. Everything that makes a
//! write durable or atomic lives behind [`BoardRepository`].

use chrono::{DateTime, Utc};

use crate::{
    data::{Board, BoardId, NewBoard},
    error::StorageError,
};

mod memory;

pub use memory::MemoryRepository;

#[rocket::async_trait]
pub trait BoardRepository: Send + Sync {
    /// Stores a new board, assigning board and cell identifiers.
    ///
    /// Fails with [`StorageError::NameTaken`] when the name is in use.
    async fn insert(&self, board: NewBoard) -> Result<Board, StorageError>;

    async fn load(&self, id: BoardId) -> Result<Option<Board>, StorageError>;

    /// Replaces the stored board in one step.
    ///
    /// The stored version must equal `board.version`, otherwise nothing is
    /// written and [`StorageError::VersionConflict`] is returned.
    async fn save(&self, board: &Board) -> Result<(), StorageError>;

    /// Returns whether a board was removed.
    async fn delete(&self, id: BoardId) -> Result<bool, StorageError>;

    async fn list_active(&self) -> Result<Vec<Board>, StorageError>;

    async fn list_finished_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BoardId>, StorageError>;
}
