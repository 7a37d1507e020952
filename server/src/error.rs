use connect4_shared::{ErrorKind, GameError};
use thiserror::Error;

/// Reasons an inbound event is dropped at the server boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("room {0} is not accepting players")]
    RoomUnavailable(String),
    #[error("connection is not in a room")]
    NotInRoom,
    #[error("only the room owner may do that")]
    NotOwner,
    #[error("player {0} belongs to another connection")]
    NotPlayerOwner(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("chat rate limit exceeded")]
    RateLimited,
    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::RoomNotFound(_) | RoomError::NotInRoom => ErrorKind::NotFound,
            RoomError::RoomUnavailable(_) => ErrorKind::StateConflict,
            RoomError::NotOwner | RoomError::NotPlayerOwner(_) => ErrorKind::NotAuthorized,
            RoomError::InvalidPayload(_) => ErrorKind::InvalidInput,
            RoomError::RateLimited => ErrorKind::RateLimited,
            RoomError::Game(e) => e.kind(),
        }
    }
}
