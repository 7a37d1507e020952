use crate::color::Color;
use serde::{Deserialize, Serialize};

/// Identifier of a transport endpoint, assigned by the server on accept
pub type ConnectionId = u32;

/// A participant in a game.
///
/// `connection` is a lookup key tying the player to the endpoint that added
/// it; one connection may own several players (hot-seat or bots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
    pub color: Color,
    pub bot: bool,
    pub connection: ConnectionId,
}

impl Player {
    pub fn new(id: &str, username: &str, color: Color, connection: ConnectionId) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            color,
            bot: false,
            connection,
        }
    }
}

/// Player as submitted by a client, before the server binds it to a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub id: String,
    pub username: String,
    pub color: Color,
    pub bot: bool,
}

impl NewPlayer {
    pub fn bind(self, connection: ConnectionId) -> Player {
        Player {
            id: self.id,
            username: self.username,
            color: self.color,
            bot: self.bot,
            connection,
        }
    }
}

/// Outcome of a finished game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Player(Player),
    /// The board filled up without a four-in-a-row
    Draw { id: String },
}

impl Winner {
    pub const DRAW_USERNAME: &'static str = "Draw";

    pub fn id(&self) -> &str {
        match self {
            Winner::Player(player) => &player.id,
            Winner::Draw { id } => id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Winner::Player(player) => &player.username,
            Winner::Draw { .. } => Self::DRAW_USERNAME,
        }
    }

    pub fn player(&self) -> Option<&Player> {
        match self {
            Winner::Player(player) => Some(player),
            Winner::Draw { .. } => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, Winner::Draw { .. })
    }
}
