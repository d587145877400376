use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use minesweeper_common::{
    models::{BoardView, CellView},
    protocol::GameEvent,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    data::{Board, BoardId, Cell, CellId, NewBoard},
    error::{GameError, Result, StorageError},
    repository::BoardRepository,
    validation::{validate_coordinates, validate_mine_count, validate_name},
};

pub mod generate;
pub mod reveal;
pub mod state;

use reveal::Target;
use state::Clock;

/// Indices of the in-bounds Moore neighbours of `index` on a row-major grid.
pub(crate) fn neighbours(width: usize, height: usize, index: usize) -> impl Iterator<Item = usize> {
    let x = index % width;
    let y = index / width;

    (-1isize..=1)
        .flat_map(|dy| (-1isize..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let new_x = x.checked_add_signed(dx)?;
            let new_y = y.checked_add_signed(dy)?;
            (new_x < width && new_y < height).then_some(new_x + new_y * width)
        })
}

impl From<&Cell> for CellView {
    fn from(value: &Cell) -> Self {
        Self {
            id: value.id,
            x: value.pos.x,
            y: value.pos.y,
            is_revealed: value.is_revealed,
            has_mine: value.has_mine,
            adjacent_mines: value.adjacent_mines,
        }
    }
}

impl From<&Board> for BoardView {
    fn from(value: &Board) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            state: value.state,
            width: value.width,
            height: value.height,
            mines_count: value.mine_count,
            created_at: value.created_at,
            ended_at: value.ended_at,
            cleared: state::is_cleared(value),
            cells: value.cells.iter().map(CellView::from).collect(),
        }
    }
}

/// A result together with the events the caller should dispatch.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<GameEvent>,
}

impl<T> Outcome<T> {
    fn new(value: T, events: Vec<GameEvent>) -> Self {
        Self { value, events }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardDimensions {
    pub width: usize,
    pub height: usize,
}

impl BoardDimensions {
    pub const MAX_SIDE: usize = 100;

    /// Keeps each side within `1..=MAX_SIDE`.
    pub fn clamped(width: usize, height: usize) -> Self {
        Self {
            width: width.clamp(1, Self::MAX_SIDE),
            height: height.clamp(1, Self::MAX_SIDE),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

impl Default for BoardDimensions {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
        }
    }
}

/// Game operations over a storage collaborator.
///
/// Each mutating call loads the board, applies the engine, and persists the
/// result with a single save, so a failed save leaves nothing half-applied.
#[derive(Clone)]
pub struct GameService {
    repository: Arc<dyn BoardRepository>,
    clock: Arc<dyn Clock>,
    dimensions: BoardDimensions,
}

impl GameService {
    pub fn new(
        repository: Arc<dyn BoardRepository>,
        clock: Arc<dyn Clock>,
        dimensions: BoardDimensions,
    ) -> Self {
        Self {
            repository,
            clock,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> BoardDimensions {
        self.dimensions
    }

    /// Checks a creation request against this service's board size.
    pub fn validate_new_board(&self, name: &str, mine_count: i64) -> Result<u32> {
        validate_name(name)?;
        Ok(validate_mine_count(mine_count, self.dimensions.cell_count())?)
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn create_board(&self, name: &str, mine_count: i64) -> Result<Outcome<BoardView>> {
        let BoardDimensions { width, height } = self.dimensions;
        let mine_count = self.validate_new_board(name, mine_count)?;

        let cells = {
            let mut rng = rand::rng();
            generate::generate_cells(width, height, mine_count as usize, &mut rng)?
        };

        let board = self
            .repository
            .insert(NewBoard {
                name: name.to_string(),
                width,
                height,
                mine_count,
                created_at: self.clock.now(),
                cells,
            })
            .await?;

        info!(
            "Created game {} '{}': {}x{} with {} mines",
            board.id, board.name, width, height, mine_count
        );
        let event = GameEvent::GameCreated {
            board_id: board.id,
            name: board.name.clone(),
        };
        Ok(Outcome::new(BoardView::from(&board), vec![event]))
    }

    async fn load(&self, id: BoardId) -> Result<Board> {
        self.repository
            .load(id)
            .await?
            .ok_or(GameError::NotFound(id))
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn get_board(&self, id: BoardId) -> Result<BoardView> {
        let board = self.load(id).await?;
        Ok(BoardView::from(&board))
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn list_active_boards(&self) -> Result<Vec<BoardView>> {
        let boards = self.repository.list_active().await?;
        debug!("Listing {} active games", boards.len());
        Ok(boards.iter().map(BoardView::from).collect())
    }

    /// Cells of a board; empty when the board does not exist.
    #[instrument(level = "trace", skip(self))]
    pub async fn list_cells(&self, id: BoardId) -> Result<Vec<CellView>> {
        Ok(self
            .repository
            .load(id)
            .await?
            .map(|board| board.cells.iter().map(CellView::from).collect())
            .unwrap_or_default())
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn reveal_cell_by_id(
        &self,
        board_id: BoardId,
        cell_id: CellId,
    ) -> Result<Outcome<CellView>> {
        let board = self.load(board_id).await?;
        self.apply_reveal(board, Target::Id(cell_id)).await
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn reveal_cell_by_coordinates(
        &self,
        board_id: BoardId,
        x: i64,
        y: i64,
    ) -> Result<Outcome<CellView>> {
        let board = self.load(board_id).await?;
        let pos = validate_coordinates(x, y, board.width, board.height)?;
        self.apply_reveal(board, Target::Pos(pos)).await
    }

    async fn apply_reveal(&self, mut board: Board, target: Target) -> Result<Outcome<CellView>> {
        let outcome = reveal::reveal(&mut board, target, self.clock.now())?;
        let cell = CellView::from(&board.cells[outcome.index]);

        if outcome.revealed.is_empty() {
            debug!("Cell ({}, {}) already revealed", cell.x, cell.y);
            return Ok(Outcome::new(cell, Vec::new()));
        }

        self.repository.save(&board).await.map_err(|err| match err {
            StorageError::Missing(id) => GameError::NotFound(id),
            other => other.into(),
        })?;

        let mut events = vec![GameEvent::CellsRevealed {
            board_id: board.id,
            cells: outcome
                .revealed
                .iter()
                .map(|&index| CellView::from(&board.cells[index]))
                .collect(),
        }];

        if outcome.hit_mine
            && let Some(ended_at) = board.ended_at
        {
            warn!(
                "Mine hit at ({}, {}) in game {}, game over",
                cell.x, cell.y, board.id
            );
            events.push(GameEvent::GameFinished {
                board_id: board.id,
                ended_at,
            });
        } else {
            debug!(
                "Revealed {} cells in game {}",
                outcome.revealed.len(),
                board.id
            );
        }

        Ok(Outcome::new(cell, events))
    }

    /// Removes a board. Deleting a missing board is not an error.
    #[instrument(level = "trace", skip(self))]
    pub async fn delete_board(&self, id: BoardId) -> Result<Outcome<()>> {
        if self.repository.delete(id).await? {
            info!("Deleted game {}", id);
            Ok(Outcome::new((), vec![GameEvent::GameDeleted { board_id: id }]))
        } else {
            debug!("Game {} already absent, nothing to delete", id);
            Ok(Outcome::new((), Vec::new()))
        }
    }

    /// Deletes boards that finished longer than `retention` ago.
    #[instrument(level = "trace", skip(self))]
    pub async fn sweep_finished(&self, retention: Duration) -> Result<Outcome<usize>> {
        let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut events = Vec::new();
        for id in self.repository.list_finished_before(cutoff).await? {
            match self.delete_board(id).await {
                Ok(outcome) => events.extend(outcome.events),
                Err(e) => error!("Failed to delete expired game {}: {}", id, e),
            }
        }

        Ok(Outcome::new(events.len(), events))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use minesweeper_common::models::GameState;

    use super::*;
    use crate::{
        error::{StorageError, ValidationError},
        repository::MemoryRepository,
    };

    /// Builds a stored-looking board from rows where `*` marks a mine.
    pub(crate) fn board_from_rows(rows: &[&str]) -> Board {
        let width = rows[0].len();
        let height = rows.len();
        let mines: Vec<bool> = rows.iter().flat_map(|row| row.chars().map(|c| c == '*')).collect();
        let cells = generate::cells_from_mines(width, height, &mines)
            .into_iter()
            .enumerate()
            .map(|(index, mut cell)| {
                cell.id = 100 + index as u64;
                cell.board_id = 1;
                cell
            })
            .collect();

        Board {
            id: 1,
            name: "test".to_string(),
            width,
            height,
            mine_count: mines.iter().filter(|&&m| m).count() as u32,
            created_at: Utc.with_ymd_and_hms(2024, 2, 22, 13, 30, 30).unwrap(),
            ended_at: None,
            state: GameState::Active,
            version: 0,
            cells,
        }
    }

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::seconds(seconds);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 22, 13, 30, 30).unwrap()
    }

    fn service() -> (GameService, Arc<MemoryRepository>, Arc<FixedClock>) {
        let repository = Arc::new(MemoryRepository::new());
        let clock = FixedClock::at(start());
        let service = GameService::new(repository.clone(), clock.clone(), BoardDimensions::default());
        (service, repository, clock)
    }

    async fn insert_rows(repository: &MemoryRepository, name: &str, rows: &[&str]) -> Board {
        let layout = board_from_rows(rows);
        repository
            .insert(NewBoard {
                name: name.to_string(),
                width: layout.width,
                height: layout.height,
                mine_count: layout.mine_count,
                created_at: start(),
                cells: layout.cells,
            })
            .await
            .unwrap()
    }

    #[test]
    fn neighbours_are_clipped() {
        let mut corner: Vec<_> = neighbours(3, 3, 0).collect();
        corner.sort();
        assert_eq!(corner, vec![1, 3, 4]);

        let mut centre: Vec<_> = neighbours(3, 3, 4).collect();
        centre.sort();
        assert_eq!(centre, vec![0, 1, 2, 3, 5, 6, 7, 8]);

        let mut edge: Vec<_> = neighbours(4, 2, 4).collect();
        edge.sort();
        assert_eq!(edge, vec![0, 1, 5]);

        assert_eq!(neighbours(1, 1, 0).count(), 0);
    }

    #[tokio::test]
    async fn create_board_generates_an_active_game() {
        let (service, _, _) = service();

        let outcome = service.create_board("Test Game", 10).await.unwrap();
        let board = outcome.value;

        assert_eq!(board.name, "Test Game");
        assert_eq!(board.state, GameState::Active);
        assert_eq!(board.created_at, start());
        assert!(board.ended_at.is_none());
        assert_eq!(board.cells.len(), 100);
        assert_eq!(board.cells.iter().filter(|c| c.has_mine).count(), 10);
        assert!(board.cells.iter().all(|c| !c.is_revealed));
        assert_eq!(
            outcome.events,
            vec![GameEvent::GameCreated {
                board_id: board.id,
                name: "Test Game".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn create_board_validates_input() {
        let (service, repository, _) = service();

        let err = service.create_board("", 10).await.unwrap_err();
        assert!(matches!(err, GameError::Validation(ValidationError::EmptyName)));
        assert!(err.to_string().contains("empty"));

        let err = service.create_board("Big", 150).await.unwrap_err();
        assert!(matches!(
            err,
            GameError::Validation(ValidationError::MineCountOutOfRange { got: 150, .. })
        ));

        assert!(repository.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_board_rejects_taken_names() {
        let (service, _, _) = service();
        service.create_board("Same", 5).await.unwrap();

        let err = service.create_board("Same", 5).await.unwrap_err();
        assert!(matches!(err, GameError::Storage(StorageError::NameTaken(_))));
    }

    #[tokio::test]
    async fn create_board_respects_configured_dimensions() {
        let repository = Arc::new(MemoryRepository::new());
        let dimensions = BoardDimensions {
            width: 3,
            height: 2,
        };
        let service = GameService::new(repository, FixedClock::at(start()), dimensions);

        let board = service.create_board("Small", 5).await.unwrap().value;
        assert_eq!((board.width, board.height), (3, 2));
        assert_eq!(board.cells.len(), 6);

        assert!(matches!(
            service.create_board("Full", 6).await,
            Err(GameError::Validation(ValidationError::TooManyMines { .. }))
        ));
    }

    #[tokio::test]
    async fn get_missing_board_is_not_found() {
        let (service, _, _) = service();
        assert!(matches!(
            service.get_board(42).await,
            Err(GameError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn click_on_zero_cell_floods_and_persists() {
        let (service, repository, _) = service();
        let board = insert_rows(&repository, "flood", &["..*..", "..*..", "..*.."]).await;

        let outcome = service
            .reveal_cell_by_coordinates(board.id, 4, 0)
            .await
            .unwrap();

        assert!(outcome.value.is_revealed);
        assert_eq!(outcome.value.adjacent_mines, 0);
        let GameEvent::CellsRevealed { cells, .. } = &outcome.events[0] else {
            panic!("expected revealed cells, got {:?}", outcome.events);
        };
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| !c.has_mine));

        let stored = service.get_board(board.id).await.unwrap();
        assert_eq!(stored.cells.iter().filter(|c| c.is_revealed).count(), 6);
        assert_eq!(stored.state, GameState::Active);
    }

    #[tokio::test]
    async fn repeated_reveal_returns_same_cell_without_events() {
        let (service, repository, _) = service();
        let board = insert_rows(&repository, "again", &["*..", "...", "..."]).await;

        let first = service
            .reveal_cell_by_coordinates(board.id, 1, 1)
            .await
            .unwrap();
        let second = service
            .reveal_cell_by_coordinates(board.id, 1, 1)
            .await
            .unwrap();

        assert_eq!(first.value, second.value);
        assert!(second.events.is_empty());
        let stored = repository.load(board.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn mine_hit_finishes_game_and_blocks_further_reveals() {
        let (service, repository, clock) = service();
        let board = insert_rows(&repository, "boom", &["*..", "...", "..."]).await;
        clock.advance(90);

        let mine = board.cells[0].id;
        let outcome = service.reveal_cell_by_id(board.id, mine).await.unwrap();

        assert!(outcome.value.has_mine);
        assert!(outcome.value.is_revealed);
        assert_eq!(
            outcome.events[1],
            GameEvent::GameFinished {
                board_id: board.id,
                ended_at: start() + TimeDelta::seconds(90),
            }
        );

        let stored = service.get_board(board.id).await.unwrap();
        assert_eq!(stored.state, GameState::Finished);
        assert!(stored.ended_at.unwrap() >= stored.created_at);

        let err = service
            .reveal_cell_by_coordinates(board.id, 2, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::GameFinished(_)));
        assert!(service.list_active_boards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reveal_reports_missing_targets() {
        let (service, repository, _) = service();
        let board = insert_rows(&repository, "targets", &["*.", ".."]).await;

        assert!(matches!(
            service.reveal_cell_by_id(board.id, 9999).await,
            Err(GameError::CellNotFound)
        ));
        assert!(matches!(
            service.reveal_cell_by_coordinates(board.id, 10, 10).await,
            Err(GameError::Validation(
                ValidationError::CoordinatesOutOfRange { .. }
            ))
        ));
        assert!(matches!(
            service.reveal_cell_by_coordinates(77, 0, 0).await,
            Err(GameError::NotFound(77))
        ));
    }

    #[tokio::test]
    async fn cells_of_unknown_board_are_empty() {
        let (service, repository, _) = service();
        let board = insert_rows(&repository, "cells", &["*.", ".."]).await;

        assert_eq!(service.list_cells(board.id).await.unwrap().len(), 4);
        assert!(service.list_cells(board.id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (service, _, _) = service();
        let board = service.create_board("Doomed", 3).await.unwrap().value;

        let first = service.delete_board(board.id).await.unwrap();
        let second = service.delete_board(board.id).await.unwrap();

        assert_eq!(first.events, vec![GameEvent::GameDeleted { board_id: board.id }]);
        assert!(second.events.is_empty());
        assert!(matches!(
            service.get_board(board.id).await,
            Err(GameError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_finished_games() {
        let (service, repository, clock) = service();
        let finished = insert_rows(&repository, "finished", &["*.", ".."]).await;
        let active = insert_rows(&repository, "active", &["*.", ".."]).await;
        service
            .reveal_cell_by_coordinates(finished.id, 0, 0)
            .await
            .unwrap();

        let retention = Duration::from_secs(600);
        clock.advance(300);
        assert_eq!(service.sweep_finished(retention).await.unwrap().value, 0);

        clock.advance(301);
        let swept = service.sweep_finished(retention).await.unwrap();
        assert_eq!(swept.value, 1);
        assert_eq!(
            swept.events,
            vec![GameEvent::GameDeleted {
                board_id: finished.id
            }]
        );
        assert!(repository.load(finished.id).await.unwrap().is_none());
        assert!(repository.load(active.id).await.unwrap().is_some());
    }

    /// Memory store that can lose a board right after handing it out, or
    /// refuse to delete one board.
    #[derive(Default)]
    struct UnreliableRepository {
        inner: MemoryRepository,
        delete_on_load: bool,
        undeletable: Option<BoardId>,
    }

    #[rocket::async_trait]
    impl BoardRepository for UnreliableRepository {
        async fn insert(&self, board: NewBoard) -> std::result::Result<Board, StorageError> {
            self.inner.insert(board).await
        }

        async fn load(&self, id: BoardId) -> std::result::Result<Option<Board>, StorageError> {
            let board = self.inner.load(id).await?;
            if self.delete_on_load {
                self.inner.delete(id).await?;
            }
            Ok(board)
        }

        async fn save(&self, board: &Board) -> std::result::Result<(), StorageError> {
            self.inner.save(board).await
        }

        async fn delete(&self, id: BoardId) -> std::result::Result<bool, StorageError> {
            if self.undeletable == Some(id) {
                return Err(StorageError::Unavailable("disk full".to_string()));
            }
            self.inner.delete(id).await
        }

        async fn list_active(&self) -> std::result::Result<Vec<Board>, StorageError> {
            self.inner.list_active().await
        }

        async fn list_finished_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> std::result::Result<Vec<BoardId>, StorageError> {
            self.inner.list_finished_before(cutoff).await
        }
    }

    async fn insert_finished(repository: &MemoryRepository, name: &str) -> Board {
        let board = insert_rows(repository, name, &["*.", ".."]).await;
        let mut stored = repository.load(board.id).await.unwrap().unwrap();
        state::finish(&mut stored, start()).unwrap();
        repository.save(&stored).await.unwrap();
        stored
    }

    #[tokio::test]
    async fn board_deleted_during_reveal_is_not_found() {
        let repository = UnreliableRepository {
            delete_on_load: true,
            ..Default::default()
        };
        let board = insert_rows(&repository.inner, "vanishing", &["*..", "...", "..."]).await;
        let service = GameService::new(
            Arc::new(repository),
            FixedClock::at(start()),
            BoardDimensions::default(),
        );

        let err = service
            .reveal_cell_by_coordinates(board.id, 2, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::NotFound(id) if id == board.id));
        assert_eq!(
            crate::error::ApiError::from(err).status(),
            rocket::http::Status::NotFound
        );
    }

    #[tokio::test]
    async fn sweep_continues_past_failed_deletes() {
        let mut repository = UnreliableRepository::default();
        let stuck = insert_finished(&repository.inner, "stuck").await;
        let expired = insert_finished(&repository.inner, "expired").await;
        repository.undeletable = Some(stuck.id);
        let repository = Arc::new(repository);

        let clock = FixedClock::at(start());
        let service = GameService::new(repository.clone(), clock.clone(), BoardDimensions::default());
        clock.advance(120);

        let swept = service.sweep_finished(Duration::from_secs(60)).await.unwrap();

        assert_eq!(swept.value, 1);
        assert_eq!(
            swept.events,
            vec![GameEvent::GameDeleted {
                board_id: expired.id
            }]
        );
        assert!(repository.load(expired.id).await.unwrap().is_none());
        assert!(repository.load(stuck.id).await.unwrap().is_some());
    }

    #[test]
    fn dimensions_are_clamped() {
        assert_eq!(
            BoardDimensions::clamped(0, usize::MAX),
            BoardDimensions {
                width: 1,
                height: BoardDimensions::MAX_SIDE
            }
        );
        assert_eq!(BoardDimensions::clamped(12, 8).cell_count(), 96);
    }

    #[test]
    fn validation_uses_configured_size() {
        let service = GameService::new(
            Arc::new(MemoryRepository::new()),
            FixedClock::at(start()),
            BoardDimensions::clamped(3, 3),
        );

        assert_eq!(service.validate_new_board("Tiny", 8).unwrap(), 8);
        assert!(matches!(
            service.validate_new_board("Tiny", 9),
            Err(GameError::Validation(ValidationError::TooManyMines { .. }))
        ));
        assert!(matches!(
            service.validate_new_board("", 3),
            Err(GameError::Validation(ValidationError::EmptyName))
        ));
    }
}
