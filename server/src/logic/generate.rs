use rand::Rng;

use crate::{
    data::{Cell, MINE_SENTINEL, Pos},
    error::ValidationError,
};

use super::neighbours;

/// Builds a fresh `width` x `height` grid with `mine_count` randomly placed mines.
pub fn generate_cells<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    mine_count: usize,
    rng: &mut R,
) -> Result<Vec<Cell>, ValidationError> {
    let mines = place_mines(width * height, mine_count, rng)?;
    Ok(cells_from_mines(width, height, &mines))
}

/// Rejection sampling: draw indices until `mine_count` distinct cells are mined.
fn place_mines<R: Rng + ?Sized>(
    length: usize,
    mine_count: usize,
    rng: &mut R,
) -> Result<Vec<bool>, ValidationError> {
    if mine_count == 0 || mine_count >= length {
        return Err(ValidationError::TooManyMines {
            mines: mine_count,
            cells: length,
        });
    }

    let mut mines = vec![false; length];
    let mut placed = 0;
    while placed < mine_count {
        let index = rng.random_range(0..length);
        if !mines[index] {
            mines[index] = true;
            placed += 1;
        }
    }

    Ok(mines)
}

fn count_adjacent_mines(mines: &[bool], index: usize, width: usize, height: usize) -> i8 {
    if mines[index] {
        return MINE_SENTINEL;
    }

    neighbours(width, height, index)
        .filter(|&adjacent| mines[adjacent])
        .count() as i8
}

/// Lays out unrevealed cells over a known mine layout (row-major, `x + y * width`).
pub fn cells_from_mines(width: usize, height: usize, mines: &[bool]) -> Vec<Cell> {
    mines
        .iter()
        .enumerate()
        .map(|(index, &has_mine)| Cell {
            id: 0,
            board_id: 0,
            pos: Pos {
                x: index % width,
                y: index / width,
            },
            has_mine,
            is_revealed: false,
            adjacent_mines: count_adjacent_mines(mines, index, width, height),
        })
        .collect()
}
