use minesweeper_common::models::ErrorResponse;
use rocket::{
    Request,
    http::Status,
    response::{self, Responder, status},
    serde::json::Json,
};
use thiserror::Error;
use tracing::error;

use crate::data::BoardId;

/// Input rejected before anything is generated or mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name is empty")]
    EmptyName,
    #[error("name must be at most {max} characters, got {len}")]
    NameTooLong { len: usize, max: usize },
    #[error("name may contain only letters, digits and spaces")]
    NameInvalidCharacters,
    #[error("mines count must be between {min} and {max}, got {got}")]
    MineCountOutOfRange { got: i64, min: i64, max: i64 },
    #[error("{mines} mines do not fit on a board of {cells} cells")]
    TooManyMines { mines: usize, cells: usize },
    #[error("coordinates ({x}, {y}) are outside the {width}x{height} board")]
    CoordinatesOutOfRange {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    #[error("game id {body} in the request body does not match {path} in the path")]
    GameIdMismatch { path: BoardId, body: BoardId },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("a game named '{0}' already exists")]
    NameTaken(String),
    #[error("game {id} was modified concurrently (version {expected}, stored {found})")]
    VersionConflict {
        id: BoardId,
        expected: u64,
        found: u64,
    },
    #[error("game {0} no longer exists")]
    Missing(BoardId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("game {0} not found")]
    NotFound(BoardId),
    #[error("cell not found")]
    CellNotFound,
    #[error("invalid operation: game {0} is finished")]
    GameFinished(BoardId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, GameError>;

/// Failures a route can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("too many games created, try again later")]
    RateLimited,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Game(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::RateLimited => Status::TooManyRequests,
            Self::Game(GameError::Validation(_)) => Status::BadRequest,
            Self::Game(GameError::NotFound(_)) => Status::NotFound,
            Self::Game(GameError::CellNotFound | GameError::GameFinished(_)) => {
                Status::BadRequest
            }
            Self::Game(GameError::Storage(
                StorageError::NameTaken(_) | StorageError::VersionConflict { .. },
            )) => Status::Conflict,
            Self::Game(GameError::Storage(_)) => Status::InternalServerError,
        }
    }

    fn message(&self) -> String {
        if self.status() == Status::InternalServerError {
            "an error occurred while processing the request".into()
        } else {
            self.to_string()
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let code = self.status();
        if code == Status::InternalServerError {
            error!("Request {} {} failed: {}", req.method(), req.uri(), self);
        }

        status::Custom(
            code,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
        .respond_to(req)
    }
}
