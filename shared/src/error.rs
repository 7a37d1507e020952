use crate::color::Color;
use thiserror::Error;

/// Failure classes shared by every layer. None of them is fatal; a failed
/// operation changes no state and produces no broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotAuthorized,
    NotFound,
    StateConflict,
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("color {0} is already taken")]
    ColorTaken(Color),
    #[error("player {0} is already in the game")]
    DuplicatePlayer(String),
    #[error("roster is full")]
    RosterFull,
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("grid size {rows}x{cols} is out of range")]
    GridSizeOutOfRange { rows: usize, cols: usize },
    #[error("game already started")]
    AlreadyStarted,
    #[error("game is neither running nor finished")]
    NotFinished,
    #[error("cannot start a game without players")]
    EmptyRoster,
    #[error("column {col} is out of range for {cols} columns")]
    ColumnOutOfRange { col: usize, cols: usize },
    #[error("column {0} is full")]
    ColumnFull(usize),
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::GridSizeOutOfRange { .. } | GameError::ColumnOutOfRange { .. } => {
                ErrorKind::InvalidInput
            }
            GameError::NotYourTurn(_) => ErrorKind::NotAuthorized,
            GameError::PlayerNotFound(_) => ErrorKind::NotFound,
            GameError::ColorTaken(_)
            | GameError::DuplicatePlayer(_)
            | GameError::RosterFull
            | GameError::AlreadyStarted
            | GameError::NotFinished
            | GameError::EmptyRoster
            | GameError::ColumnFull(_) => ErrorKind::StateConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GameError::ColumnOutOfRange { col: 9, cols: 7 }.kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            GameError::NotYourTurn("bob".to_string()).kind(),
            ErrorKind::NotAuthorized
        );
        assert_eq!(
            GameError::PlayerNotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(GameError::AlreadyStarted.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GameError::ColorTaken(Color::Blue).to_string(),
            "color blue is already taken"
        );
        assert_eq!(
            GameError::GridSizeOutOfRange { rows: 0, cols: 7 }.to_string(),
            "grid size 0x7 is out of range"
        );
    }
}
