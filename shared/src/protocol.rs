//! Named events exchanged between clients and the server, and the
//! length-prefixed frame codec that carries them over a stream socket.

use crate::{ConnectionId, NewPlayer, Player};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload in bytes
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub author: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub origin: ConnectionId,
}

/// Directory entry for a joinable public room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoomSummary {
    pub host: String,
    pub code: String,
    pub player_count: usize,
    pub max_players: usize,
}

/// Client to server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    RoomCreate,
    RoomJoin { code: String },
    RoomLeave,
    RoomSendMessage { message: String, username: String },
    RoomIsPublic(bool),
    GameStart,
    GameRestart,
    GameAddPlayer(NewPlayer),
    GameRemovePlayer { player_id: String },
    GameDropPiece { player_id: String, column: i32 },
    GameGridSize { rows: i32, cols: i32 },
    PublicRooms,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RoomCreate => "room:create",
            ClientEvent::RoomJoin { .. } => "room:join",
            ClientEvent::RoomLeave => "room:leave",
            ClientEvent::RoomSendMessage { .. } => "room:sendmessage",
            ClientEvent::RoomIsPublic(_) => "room:ispublic",
            ClientEvent::GameStart => "game:start",
            ClientEvent::GameRestart => "game:restart",
            ClientEvent::GameAddPlayer(_) => "game:addplayer",
            ClientEvent::GameRemovePlayer { .. } => "game:removeplayer",
            ClientEvent::GameDropPiece { .. } => "game:droppiece",
            ClientEvent::GameGridSize { .. } => "game:gridsize",
            ClientEvent::PublicRooms => "global:publicrooms",
        }
    }
}

/// Server to client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerEvent {
    RoomCreated { code: String },
    RoomJoined { code: String },
    RoomNotFound,
    RoomLeft,
    RoomForceLeave,
    RoomOwner { owner: ConnectionId },
    RoomMessage(ChatMessage),
    GameStart { playing: Player },
    GameRestart { playing: Player },
    GameAddPlayer(Player),
    GameRemovePlayer(Player),
    GameDropPiece { player: Player, column: usize },
    GameGridSize { rows: usize, cols: usize },
    PublicRooms(Vec<PublicRoomSummary>),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomCreated { .. } => "room:created",
            ServerEvent::RoomJoined { .. } => "room:joined",
            ServerEvent::RoomNotFound => "room:notfound",
            ServerEvent::RoomLeft => "room:left",
            ServerEvent::RoomForceLeave => "room:forceleave",
            ServerEvent::RoomOwner { .. } => "room:owner",
            ServerEvent::RoomMessage(_) => "room:message",
            ServerEvent::GameStart { .. } => "game:start",
            ServerEvent::GameRestart { .. } => "game:restart",
            ServerEvent::GameAddPlayer(_) => "game:addplayer",
            ServerEvent::GameRemovePlayer(_) => "game:removeplayer",
            ServerEvent::GameDropPiece { .. } => "game:droppiece",
            ServerEvent::GameGridSize { .. } => "game:gridsize",
            ServerEvent::PublicRooms(_) => "global:publicrooms",
        }
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(value)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Writes one big-endian `u32` length prefix followed by the encoded value
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = encode(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", payload.len()),
        ));
    }

    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Reads one frame payload. Returns `Ok(None)` on a clean end of stream
/// between frames; a stream that ends inside a frame is `UnexpectedEof`.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let first = reader.read(&mut prefix).await?;
    if first == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut prefix[first..]).await?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
