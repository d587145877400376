use crate::{data::Pos, error::ValidationError};

pub const NAME_MAX_LEN: usize = 25;
pub const MINES_MIN: i64 = 1;
pub const MINES_MAX: i64 = 99;

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let len = name.chars().count();
    if len > NAME_MAX_LEN {
        return Err(ValidationError::NameTooLong {
            len,
            max: NAME_MAX_LEN,
        });
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return Err(ValidationError::NameInvalidCharacters);
    }

    Ok(())
}

/// Checks the requested mine count against the fixed range and the board size.
pub fn validate_mine_count(mines: i64, cells: usize) -> Result<u32, ValidationError> {
    if !(MINES_MIN..=MINES_MAX).contains(&mines) {
        return Err(ValidationError::MineCountOutOfRange {
            got: mines,
            min: MINES_MIN,
            max: MINES_MAX,
        });
    }

    // in range 1..=99, so the casts are lossless
    if mines as usize >= cells {
        return Err(ValidationError::TooManyMines {
            mines: mines as usize,
            cells,
        });
    }

    Ok(mines as u32)
}

pub fn validate_coordinates(
    x: i64,
    y: i64,
    width: usize,
    height: usize,
) -> Result<Pos, ValidationError> {
    let out_of_range = ValidationError::CoordinatesOutOfRange {
        x,
        y,
        width,
        height,
    };

    match (usize::try_from(x), usize::try_from(y)) {
        (Ok(x), Ok(y)) if x < width && y < height => Ok(Pos { x, y }),
        _ => Err(out_of_range),
    }
}
