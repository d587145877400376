use chrono::{DateTime, Utc};

use crate::{
    data::{Board, CellId, Pos},
    error::{GameError, Result},
};

use super::{neighbours, state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Id(CellId),
    Pos(Pos),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RevealOutcome {
    /// Index of the targeted cell.
    pub index: usize,
    /// Indices of every cell this call flipped to revealed, target first.
    pub revealed: Vec<usize>,
    pub hit_mine: bool,
}

/// Reveals `target`, expanding over zero-count regions, and ends the game on a mine.
///
/// Revealing an already revealed cell changes nothing and returns an empty
/// `revealed` list.
pub fn reveal(board: &mut Board, target: Target, now: DateTime<Utc>) -> Result<RevealOutcome> {
    state::ensure_active(board)?;

    let index = match target {
        Target::Id(id) => board.position_of(id),
        Target::Pos(pos) => board.index_of(pos),
    }
    .ok_or(GameError::CellNotFound)?;

    let cell = &mut board.cells[index];
    if cell.is_revealed {
        return Ok(RevealOutcome {
            index,
            ..Default::default()
        });
    }

    cell.is_revealed = true;
    let zero = cell.adjacent_mines == 0;
    let mut outcome = RevealOutcome {
        index,
        revealed: vec![index],
        hit_mine: cell.has_mine,
    };

    if outcome.hit_mine {
        state::finish(board, now)?;
    } else if zero {
        flood_fill(board, index, &mut outcome.revealed);
    }

    Ok(outcome)
}

fn flood_fill(board: &mut Board, start: usize, revealed: &mut Vec<usize>) {
    let mut pending = vec![start];

    while let Some(index) = pending.pop() {
        for adjacent in neighbours(board.width, board.height, index) {
            let cell = &mut board.cells[adjacent];
            if cell.is_revealed || cell.has_mine {
                continue;
            }

            cell.is_revealed = true;
            revealed.push(adjacent);
            if cell.adjacent_mines == 0 {
                pending.push(adjacent);
            }
        }
    }
}
