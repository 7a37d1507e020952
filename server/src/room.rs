//! A room groups connected endpoints around one game.
//!
//! Connection membership is tracked separately from the game roster: an
//! endpoint may be a member without owning any player, and one endpoint may
//! own several players. Every change that clients must see is queued in the
//! room's outbox as a [`Dispatch`] and drained by the gateway after each
//! operation.

use crate::error::RoomError;
use connect4_shared::{
    pick_random, ChatMessage, ConnectionId, Coord, Game, GameError, NewPlayer, Player,
    PublicRoomSummary, ServerEvent, MAX_PLAYERS,
};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Chat messages kept per room; the oldest is evicted first
pub const CHAT_CAPACITY: usize = 50;

/// An outbound event addressed to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Dispatch {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

#[derive(Debug)]
pub struct Room {
    code: String,
    /// Always a member unless the room is empty
    owner: Option<ConnectionId>,
    /// Join order
    members: Vec<ConnectionId>,
    is_public: bool,
    game: Game,
    chat: VecDeque<ChatMessage>,
    outbox: Vec<Dispatch>,
    rng: StdRng,
}

impl Room {
    pub fn new(code: String, owner: ConnectionId, mut rng: StdRng) -> Self {
        let game = Game::from_rng(StdRng::seed_from_u64(rng.gen()));
        Self {
            code,
            owner: Some(owner),
            members: vec![owner],
            is_public: false,
            game,
            chat: VecDeque::with_capacity(CHAT_CAPACITY),
            outbox: Vec::new(),
            rng,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    pub fn is_owner(&self, connection: ConnectionId) -> bool {
        self.owner == Some(connection)
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn has_member(&self, connection: ConnectionId) -> bool {
        self.members.contains(&connection)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn chat_history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.iter()
    }

    /// Whether a new member may join: the game has not started and the
    /// roster has room for another player.
    pub fn is_joinable(&self) -> bool {
        !self.game.is_started() && self.game.player_count() < MAX_PLAYERS
    }

    /// Directory entry, only for public rooms that have not started
    pub fn summary(&self) -> Option<PublicRoomSummary> {
        if !self.is_public || self.game.is_started() {
            return None;
        }
        Some(PublicRoomSummary {
            host: self
                .game
                .host()
                .map(|p| p.username.clone())
                .unwrap_or_default(),
            code: self.code.clone(),
            player_count: self.game.player_count(),
            max_players: MAX_PLAYERS,
        })
    }

    /// Queues `event` for every current member
    pub fn broadcast(&mut self, event: ServerEvent) {
        for &member in &self.members {
            self.outbox.push(Dispatch::new(member, event.clone()));
        }
    }

    pub fn send_to(&mut self, connection: ConnectionId, event: ServerEvent) {
        self.outbox.push(Dispatch::new(connection, event));
    }

    pub fn take_outbox(&mut self) -> Vec<Dispatch> {
        std::mem::take(&mut self.outbox)
    }

    /// Registers an endpoint and replays the current roster to it alone.
    pub fn add_member(&mut self, connection: ConnectionId) {
        if self.has_member(connection) {
            return;
        }
        self.members.push(connection);

        let roster: Vec<Player> = self.game.players().to_vec();
        for player in roster {
            self.send_to(connection, ServerEvent::GameAddPlayer(player));
        }
        info!("Connection {} joined room {}", connection, self.code);
    }

    /// Deregisters an endpoint, hands ownership on and removes its players.
    ///
    /// Returns true when the departure left a running game with fewer than
    /// two players; `room:forceleave` has then been broadcast.
    pub fn remove_member(&mut self, connection: ConnectionId) -> bool {
        let Some(index) = self.members.iter().position(|&m| m == connection) else {
            return false;
        };
        self.members.remove(index);
        info!("Connection {} left room {}", connection, self.code);

        if self.owner == Some(connection) {
            self.owner = pick_random(&self.members, &mut self.rng).copied();
            if let Some(owner) = self.owner {
                info!("Room {} ownership passed to connection {}", self.code, owner);
                self.broadcast(ServerEvent::RoomOwner { owner });
            }
        }

        let viable = self.is_viable();
        let bound: Vec<String> = self
            .game
            .players()
            .iter()
            .filter(|p| p.connection == connection)
            .map(|p| p.id.clone())
            .collect();
        for id in bound {
            if let Ok(player) = self.game.remove_player(&id) {
                self.broadcast(ServerEvent::GameRemovePlayer(player));
            }
        }

        self.force_leave_if_abandoned(viable)
    }

    /// Appends to the bounded chat log, evicting the oldest entries
    pub fn add_chat_message(&mut self, message: ChatMessage) {
        self.chat.push_back(message);
        while self.chat.len() > CHAT_CAPACITY {
            self.chat.pop_front();
        }
    }

    pub fn set_public(&mut self, caller: ConnectionId, is_public: bool) -> Result<(), RoomError> {
        self.require_owner(caller)?;
        self.is_public = is_public;
        Ok(())
    }

    pub fn add_player(&mut self, caller: ConnectionId, player: NewPlayer) -> Result<(), RoomError> {
        let player = player.bind(caller);
        self.game.add_player(player.clone())?;
        self.broadcast(ServerEvent::GameAddPlayer(player));
        Ok(())
    }

    /// Removes a player on behalf of its own connection or the room owner.
    /// Returns true when the removal forced everybody out.
    pub fn remove_player(&mut self, caller: ConnectionId, player_id: &str) -> Result<bool, RoomError> {
        let player = self
            .game
            .find_player(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if player.connection != caller && !self.is_owner(caller) {
            return Err(RoomError::NotPlayerOwner(player_id.to_string()));
        }

        let viable = self.is_viable();
        let removed = self.game.remove_player(player_id)?;
        self.broadcast(ServerEvent::GameRemovePlayer(removed));
        Ok(self.force_leave_if_abandoned(viable))
    }

    pub fn start(&mut self, caller: ConnectionId) -> Result<Player, RoomError> {
        self.require_owner(caller)?;
        let playing = self.game.start(None)?;
        self.broadcast(ServerEvent::GameStart {
            playing: playing.clone(),
        });
        Ok(playing)
    }

    pub fn restart(&mut self, caller: ConnectionId) -> Result<Player, RoomError> {
        self.require_owner(caller)?;
        let playing = self.game.restart(None)?;
        self.broadcast(ServerEvent::GameRestart {
            playing: playing.clone(),
        });
        Ok(playing)
    }

    pub fn set_grid_size(
        &mut self,
        caller: ConnectionId,
        rows: usize,
        cols: usize,
    ) -> Result<(), RoomError> {
        self.require_owner(caller)?;
        self.game.set_grid_size(rows, cols)?;
        self.broadcast(ServerEvent::GameGridSize { rows, cols });
        Ok(())
    }

    /// Drops a piece for a player bound to `caller`
    pub fn drop_piece(
        &mut self,
        caller: ConnectionId,
        player_id: &str,
        column: usize,
    ) -> Result<Coord, RoomError> {
        let player = self
            .game
            .find_player(player_id)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if player.connection != caller {
            return Err(RoomError::NotPlayerOwner(player.id));
        }

        let landed = self.game.drop_piece(&player.id, column)?;
        match self.game.winner().map(|w| w.player()) {
            Some(Some(winner)) => info!(
                "Room {} won by {} on connection {}",
                self.code, winner.username, winner.connection
            ),
            Some(None) => info!("Room {} game drawn", self.code),
            None => {}
        }
        self.broadcast(ServerEvent::GameDropPiece { player, column });
        Ok(landed)
    }

    fn require_owner(&self, caller: ConnectionId) -> Result<(), RoomError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(RoomError::NotOwner)
        }
    }

    fn is_viable(&self) -> bool {
        self.game.is_started() && self.game.player_count() >= 2
    }

    fn force_leave_if_abandoned(&mut self, was_viable: bool) -> bool {
        if was_viable && self.game.player_count() < 2 {
            info!("Room {} no longer has enough players", self.code);
            self.broadcast(ServerEvent::RoomForceLeave);
            return true;
        }
        false
    }
}
