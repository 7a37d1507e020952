//! Binds inbound named events to directory and room operations.
//!
//! The gateway remembers which room each connection is in, validates payloads
//! and authority, and turns successful operations into [`Dispatch`]es. Any
//! rejected event is dropped with a debug log and produces no dispatches, so
//! the sender never learns why.

use crate::chat::{truncate, RateLimiter, Sanitizer, WordFilter};
use crate::config::ServerConfig;
use crate::directory::SessionDirectory;
use crate::error::RoomError;
use crate::room::{Dispatch, Room};
use connect4_shared::{
    ChatMessage, ClientEvent, ConnectionId, NewPlayer, ServerEvent, MAX_MESSAGE_LEN,
    MAX_USERNAME_LEN,
};
use log::{debug, info};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-connection state
#[derive(Debug)]
struct Session {
    room: Option<String>,
    limiter: RateLimiter,
}

pub struct Gateway {
    directory: SessionDirectory,
    sessions: HashMap<ConnectionId, Session>,
    sanitizer: Box<dyn Sanitizer>,
    chat_limit: usize,
    chat_window: Duration,
}

impl Gateway {
    pub fn new(config: &ServerConfig) -> Self {
        let mut filter = WordFilter::new();
        for word in &config.blocked_words {
            filter.add_word(word);
        }
        Self::with_parts(
            SessionDirectory::new(),
            Box::new(filter),
            config.chat_limit,
            config.chat_window,
        )
    }

    pub fn with_parts(
        directory: SessionDirectory,
        sanitizer: Box<dyn Sanitizer>,
        chat_limit: usize,
        chat_window: Duration,
    ) -> Self {
        Self {
            directory,
            sessions: HashMap::new(),
            sanitizer,
            chat_limit,
            chat_window,
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// Code of the room `connection` is currently in
    pub fn room_of(&self, connection: ConnectionId) -> Option<&str> {
        self.sessions.get(&connection)?.room.as_deref()
    }

    pub fn connect(&mut self, connection: ConnectionId) {
        self.session(connection);
    }

    /// Handles a dropped connection like `room:leave`, without the ack
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Dispatch> {
        let dispatches = self.leave(connection, false);
        self.sessions.remove(&connection);
        dispatches
    }

    pub fn refresh_public_rooms(&mut self) {
        self.directory.refresh_public_rooms();
    }

    /// Processes one inbound event and returns what must be sent where
    pub fn handle(&mut self, connection: ConnectionId, event: ClientEvent) -> Vec<Dispatch> {
        let name = event.name();
        match self.dispatch(connection, event) {
            Ok(dispatches) => dispatches,
            Err(e) => {
                debug!(
                    "Dropped {} from connection {}: {} ({:?})",
                    name,
                    connection,
                    e,
                    e.kind()
                );
                Vec::new()
            }
        }
    }

    fn dispatch(
        &mut self,
        connection: ConnectionId,
        event: ClientEvent,
    ) -> Result<Vec<Dispatch>, RoomError> {
        match event {
            ClientEvent::RoomCreate => Ok(self.create(connection)),
            ClientEvent::RoomJoin { code } => Ok(self.join(connection, &code)),
            ClientEvent::RoomLeave => {
                if self.room_of(connection).is_none() {
                    return Err(RoomError::NotInRoom);
                }
                Ok(self.leave(connection, true))
            }
            ClientEvent::RoomSendMessage { message, username } => {
                self.send_message(connection, &message, &username)
            }
            ClientEvent::RoomIsPublic(is_public) => {
                self.room_mut(connection)?.set_public(connection, is_public)?;
                Ok(Vec::new())
            }
            ClientEvent::GameStart => {
                let room = self.room_mut(connection)?;
                room.start(connection)?;
                Ok(room.take_outbox())
            }
            ClientEvent::GameRestart => {
                let room = self.room_mut(connection)?;
                room.restart(connection)?;
                Ok(room.take_outbox())
            }
            ClientEvent::GameAddPlayer(player) => {
                validate_new_player(&player)?;
                let room = self.room_mut(connection)?;
                room.add_player(connection, player)?;
                Ok(room.take_outbox())
            }
            ClientEvent::GameRemovePlayer { player_id } => {
                let room = self.room_mut(connection)?;
                let forced = room.remove_player(connection, &player_id)?;
                let dispatches = room.take_outbox();
                if forced {
                    let code = room.code().to_string();
                    self.teardown(&code);
                }
                Ok(dispatches)
            }
            ClientEvent::GameDropPiece { player_id, column } => {
                let column = usize::try_from(column)
                    .map_err(|_| RoomError::InvalidPayload(format!("column {}", column)))?;
                let room = self.room_mut(connection)?;
                room.drop_piece(connection, &player_id, column)?;
                Ok(room.take_outbox())
            }
            ClientEvent::GameGridSize { rows, cols } => {
                let invalid = || RoomError::InvalidPayload(format!("grid size {}x{}", rows, cols));
                let rows = usize::try_from(rows).map_err(|_| invalid())?;
                let cols = usize::try_from(cols).map_err(|_| invalid())?;
                let room = self.room_mut(connection)?;
                room.set_grid_size(connection, rows, cols)?;
                Ok(room.take_outbox())
            }
            ClientEvent::PublicRooms => Ok(vec![Dispatch::new(
                connection,
                ServerEvent::PublicRooms(self.directory.public_rooms().to_vec()),
            )]),
        }
    }

    fn create(&mut self, connection: ConnectionId) -> Vec<Dispatch> {
        let mut dispatches = self.leave(connection, false);

        let room = self.directory.create(connection);
        let code = room.code().to_string();
        room.send_to(connection, ServerEvent::RoomCreated { code: code.clone() });
        dispatches.extend(room.take_outbox());

        self.session(connection).room = Some(code);
        dispatches
    }

    fn join(&mut self, connection: ConnectionId, code: &str) -> Vec<Dispatch> {
        if self.room_of(connection) == Some(code) {
            return Vec::new();
        }
        let available = match self.directory.find(code) {
            None => Err(RoomError::RoomNotFound(code.to_string())),
            Some(room) if !room.is_joinable() => Err(RoomError::RoomUnavailable(code.to_string())),
            Some(_) => Ok(()),
        };
        if let Err(e) = available {
            debug!("Connection {} could not join: {} ({:?})", connection, e, e.kind());
            return vec![Dispatch::new(connection, ServerEvent::RoomNotFound)];
        }

        let mut dispatches = self.leave(connection, false);

        let Some(room) = self.directory.find_mut(code) else {
            return dispatches;
        };
        room.send_to(
            connection,
            ServerEvent::RoomJoined {
                code: code.to_string(),
            },
        );
        let history: Vec<ChatMessage> = room.chat_history().cloned().collect();
        for message in history {
            room.send_to(connection, ServerEvent::RoomMessage(message));
        }
        room.add_member(connection);
        let (rows, cols) = (room.game().rows(), room.game().cols());
        room.send_to(connection, ServerEvent::GameGridSize { rows, cols });
        dispatches.extend(room.take_outbox());

        self.session(connection).room = Some(code.to_string());
        dispatches
    }

    /// Takes `connection` out of its room, deleting the room when it empties
    /// or tearing it down when the game can no longer continue.
    fn leave(&mut self, connection: ConnectionId, ack: bool) -> Vec<Dispatch> {
        let Some(code) = self.sessions.get_mut(&connection).and_then(|s| s.room.take()) else {
            return Vec::new();
        };
        let Some(room) = self.directory.find_mut(&code) else {
            return Vec::new();
        };

        let forced = room.remove_member(connection);
        let empty = room.member_count() == 0;
        let mut dispatches = room.take_outbox();
        if ack {
            dispatches.push(Dispatch::new(connection, ServerEvent::RoomLeft));
        }

        if forced {
            self.teardown(&code);
        } else if empty {
            self.directory.delete(&code);
        }
        dispatches
    }

    fn send_message(
        &mut self,
        connection: ConnectionId,
        message: &str,
        username: &str,
    ) -> Result<Vec<Dispatch>, RoomError> {
        if self.room_of(connection).is_none() {
            return Err(RoomError::NotInRoom);
        }
        if message.is_empty() {
            return Err(RoomError::InvalidPayload("empty message".to_string()));
        }
        if !self.session(connection).limiter.allow() {
            return Err(RoomError::RateLimited);
        }

        let chat = ChatMessage {
            text: self.sanitizer.sanitize(&truncate(message, MAX_MESSAGE_LEN)),
            author: self.sanitizer.sanitize(&truncate(username, MAX_USERNAME_LEN)),
            timestamp: timestamp_millis(),
            origin: connection,
        };

        let room = self.room_mut(connection)?;
        room.add_chat_message(chat.clone());
        room.broadcast(ServerEvent::RoomMessage(chat));
        Ok(room.take_outbox())
    }

    /// Deletes a room that can no longer continue and forgets it for every
    /// member. Members were already told with `room:forceleave`.
    fn teardown(&mut self, code: &str) {
        let Some(room) = self.directory.delete(code) else {
            return;
        };
        for member in room.members() {
            if let Some(session) = self.sessions.get_mut(member) {
                if session.room.as_deref() == Some(code) {
                    session.room = None;
                }
            }
        }
        info!("Tore down room {} with {} members", code, room.member_count());
    }

    fn session(&mut self, connection: ConnectionId) -> &mut Session {
        let (limit, window) = (self.chat_limit, self.chat_window);
        self.sessions.entry(connection).or_insert_with(|| Session {
            room: None,
            limiter: RateLimiter::new(limit, window),
        })
    }

    fn room_mut(&mut self, connection: ConnectionId) -> Result<&mut Room, RoomError> {
        let code = self
            .sessions
            .get(&connection)
            .and_then(|s| s.room.as_deref())
            .ok_or(RoomError::NotInRoom)?;
        self.directory
            .find_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))
    }
}

fn validate_new_player(player: &NewPlayer) -> Result<(), RoomError> {
    if player.id.is_empty() {
        return Err(RoomError::InvalidPayload("empty player id".to_string()));
    }
    let len = player.username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN {
        return Err(RoomError::InvalidPayload(format!(
            "username of {} characters",
            len
        )));
    }
    Ok(())
}

fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect4_shared::Color;
    use pretty_assertions::assert_eq;

    fn gateway() -> Gateway {
        Gateway::with_parts(
            SessionDirectory::with_seed(1),
            Box::new(WordFilter::new()),
            30,
            Duration::from_secs(60),
        )
    }

    fn names(dispatches: &[Dispatch], to: ConnectionId) -> Vec<&'static str> {
        dispatches
            .iter()
            .filter(|d| d.to == to)
            .map(|d| d.event.name())
            .collect()
    }

    fn created_code(dispatches: &[Dispatch]) -> String {
        dispatches
            .iter()
            .find_map(|d| match &d.event {
                ServerEvent::RoomCreated { code } => Some(code.clone()),
                _ => None,
            })
            .expect("room:created")
    }

    fn add_player(id: &str, color: Color) -> ClientEvent {
        ClientEvent::GameAddPlayer(NewPlayer {
            id: id.to_string(),
            username: id.to_string(),
            color,
            bot: false,
        })
    }

    #[test]
    fn test_create_room() {
        let mut gateway = gateway();
        let out = gateway.handle(1, ClientEvent::RoomCreate);

        assert_eq!(names(&out, 1), vec!["room:created"]);
        let code = created_code(&out);
        assert_eq!(gateway.room_of(1), Some(code.as_str()));
        assert_eq!(gateway.directory().find(&code).unwrap().owner(), Some(1));
    }

    #[test]
    fn test_join_missing_room() {
        let mut gateway = gateway();
        let out = gateway.handle(
            1,
            ClientEvent::RoomJoin {
                code: "abcde".to_string(),
            },
        );

        assert_eq!(out, vec![Dispatch::new(1, ServerEvent::RoomNotFound)]);
        assert_eq!(gateway.room_of(1), None);
        assert!(gateway.directory().is_empty());
    }

    #[test]
    fn test_join_replays_chat_and_roster() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(1, add_player("a", Color::Red));
        gateway.handle(
            1,
            ClientEvent::RoomSendMessage {
                message: "hello".to_string(),
                username: "alice".to_string(),
            },
        );

        let out = gateway.handle(2, ClientEvent::RoomJoin { code: code.clone() });
        assert_eq!(
            names(&out, 2),
            vec!["room:joined", "room:message", "game:addplayer", "game:gridsize"]
        );
        assert!(names(&out, 1).is_empty());
        assert_eq!(gateway.room_of(2), Some(code.as_str()));
    }

    #[test]
    fn test_join_started_room_fails() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(1, add_player("a", Color::Red));
        gateway.handle(1, ClientEvent::GameStart);

        let out = gateway.handle(2, ClientEvent::RoomJoin { code });
        assert_eq!(names(&out, 2), vec!["room:notfound"]);
        assert_eq!(gateway.room_of(2), None);
    }

    #[test]
    fn test_rejoining_own_started_room_is_noop() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(1, add_player("a", Color::Red));
        gateway.handle(1, ClientEvent::GameStart);

        assert!(gateway.handle(1, ClientEvent::RoomJoin { code: code.clone() }).is_empty());
        assert_eq!(gateway.room_of(1), Some(code.as_str()));
        assert!(gateway.directory().find(&code).unwrap().game().is_started());
    }

    #[test]
    fn test_join_full_room_fails() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        for (i, color) in Color::ALL.iter().enumerate() {
            gateway.handle(1, add_player(&format!("p{}", i), *color));
        }

        let out = gateway.handle(2, ClientEvent::RoomJoin { code });
        assert_eq!(names(&out, 2), vec!["room:notfound"]);
        assert_eq!(gateway.room_of(2), None);
    }

    #[test]
    fn test_leave_acks_and_deletes_empty_room() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));

        let out = gateway.handle(1, ClientEvent::RoomLeave);
        assert_eq!(names(&out, 1), vec!["room:left"]);
        assert!(gateway.directory().find(&code).is_none());
        assert_eq!(gateway.room_of(1), None);

        // Leaving again is silently ignored
        assert!(gateway.handle(1, ClientEvent::RoomLeave).is_empty());
    }

    #[test]
    fn test_creating_again_leaves_previous_room() {
        let mut gateway = gateway();
        let first = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        let second = created_code(&gateway.handle(1, ClientEvent::RoomCreate));

        assert_ne!(first, second);
        assert!(gateway.directory().find(&first).is_none());
        assert_eq!(gateway.room_of(1), Some(second.as_str()));
    }

    #[test]
    fn test_chat_message_truncated_and_broadcast() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(2, ClientEvent::RoomJoin { code: code.clone() });

        let out = gateway.handle(
            2,
            ClientEvent::RoomSendMessage {
                message: "y".repeat(600),
                username: "b".repeat(40),
            },
        );

        assert_eq!(out.len(), 2);
        for dispatch in &out {
            match &dispatch.event {
                ServerEvent::RoomMessage(message) => {
                    assert_eq!(message.text.chars().count(), MAX_MESSAGE_LEN);
                    assert_eq!(message.author.chars().count(), MAX_USERNAME_LEN);
                    assert_eq!(message.origin, 2);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }

        let room = gateway.directory().find(&code).unwrap();
        let stored: Vec<&ChatMessage> = room.chat_history().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text.len(), 500);
    }

    #[test]
    fn test_chat_message_sanitized() {
        let mut gateway = gateway();
        gateway.handle(1, ClientEvent::RoomCreate);

        let out = gateway.handle(
            1,
            ClientEvent::RoomSendMessage {
                message: "damn nice move".to_string(),
                username: "shit".to_string(),
            },
        );
        match &out[0].event {
            ServerEvent::RoomMessage(message) => {
                assert_eq!(message.text, "**** nice move");
                assert_eq!(message.author, "****");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_chat_rejected_outside_room_or_empty() {
        let mut gateway = gateway();
        let message = |text: &str| ClientEvent::RoomSendMessage {
            message: text.to_string(),
            username: "alice".to_string(),
        };

        assert!(gateway.handle(1, message("hi")).is_empty());
        gateway.handle(1, ClientEvent::RoomCreate);
        assert!(gateway.handle(1, message("")).is_empty());
        assert_eq!(gateway.handle(1, message("hi")).len(), 1);
    }

    #[test]
    fn test_chat_rate_limited() {
        let mut gateway = Gateway::with_parts(
            SessionDirectory::with_seed(1),
            Box::new(WordFilter::new()),
            3,
            Duration::from_secs(60),
        );
        gateway.handle(1, ClientEvent::RoomCreate);

        let message = ClientEvent::RoomSendMessage {
            message: "spam".to_string(),
            username: "alice".to_string(),
        };
        for _ in 0..3 {
            assert_eq!(gateway.handle(1, message.clone()).len(), 1);
        }
        assert!(gateway.handle(1, message).is_empty());
    }

    #[test]
    fn test_owner_only_start() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(2, ClientEvent::RoomJoin { code: code.clone() });
        gateway.handle(1, add_player("a", Color::Red));
        gateway.handle(2, add_player("b", Color::Blue));

        assert!(gateway.handle(2, ClientEvent::GameStart).is_empty());
        assert!(!gateway.directory().find(&code).unwrap().game().is_started());

        let out = gateway.handle(1, ClientEvent::GameStart);
        assert_eq!(names(&out, 1), vec!["game:start"]);
        assert_eq!(names(&out, 2), vec!["game:start"]);
    }

    #[test]
    fn test_malformed_numbers_dropped() {
        let mut gateway = gateway();
        gateway.handle(1, ClientEvent::RoomCreate);
        gateway.handle(1, add_player("a", Color::Red));

        assert!(gateway
            .handle(1, ClientEvent::GameGridSize { rows: -1, cols: 5 })
            .is_empty());
        assert!(gateway
            .handle(1, ClientEvent::GameGridSize { rows: 11, cols: 5 })
            .is_empty());
        assert_eq!(
            gateway
                .handle(1, ClientEvent::GameGridSize { rows: 5, cols: 5 })
                .len(),
            1
        );

        gateway.handle(1, ClientEvent::GameStart);
        assert!(gateway
            .handle(
                1,
                ClientEvent::GameDropPiece {
                    player_id: "a".to_string(),
                    column: -1
                }
            )
            .is_empty());
    }

    #[test]
    fn test_add_player_validation() {
        let mut gateway = gateway();
        gateway.handle(1, ClientEvent::RoomCreate);

        let too_long = ClientEvent::GameAddPlayer(NewPlayer {
            id: "a".to_string(),
            username: "x".repeat(MAX_USERNAME_LEN + 1),
            color: Color::Red,
            bot: false,
        });
        assert!(gateway.handle(1, too_long).is_empty());
        assert!(gateway.handle(1, add_player("", Color::Red)).is_empty());
        assert_eq!(gateway.handle(1, add_player("a", Color::Red)).len(), 1);
    }

    #[test]
    fn test_disconnect_mid_game_tears_room_down() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(2, ClientEvent::RoomJoin { code: code.clone() });
        gateway.handle(3, ClientEvent::RoomJoin { code: code.clone() });
        gateway.handle(1, add_player("a", Color::Red));
        gateway.handle(2, add_player("b", Color::Blue));
        gateway.handle(1, ClientEvent::GameStart);

        let out = gateway.disconnect(2);
        assert_eq!(names(&out, 1), vec!["game:removeplayer", "room:forceleave"]);
        assert_eq!(names(&out, 3), vec!["game:removeplayer", "room:forceleave"]);
        assert!(names(&out, 2).is_empty());

        assert!(gateway.directory().find(&code).is_none());
        assert_eq!(gateway.room_of(1), None);
        assert_eq!(gateway.room_of(3), None);
    }

    #[test]
    fn test_public_rooms_request() {
        let mut gateway = gateway();
        let code = created_code(&gateway.handle(1, ClientEvent::RoomCreate));
        gateway.handle(1, add_player("alice", Color::Red));
        gateway.handle(1, ClientEvent::RoomIsPublic(true));

        let out = gateway.handle(2, ClientEvent::PublicRooms);
        assert_eq!(out, vec![Dispatch::new(2, ServerEvent::PublicRooms(vec![]))]);

        gateway.refresh_public_rooms();
        let out = gateway.handle(2, ClientEvent::PublicRooms);
        match &out[0].event {
            ServerEvent::PublicRooms(rooms) => {
                assert_eq!(rooms.len(), 1);
                assert_eq!(rooms[0].code, code);
                assert_eq!(rooms[0].host, "alice");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
