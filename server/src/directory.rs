//! Process-wide registry of rooms keyed by their short code.

use crate::room::Room;
use connect4_shared::{ConnectionId, PublicRoomSummary};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub const CODE_LEN: usize = 5;
const CODE_ALPHABET: &[u8] = b"0123456789abcdef";

/// Owns every live room.
///
/// The public room list is a snapshot rebuilt by
/// [`SessionDirectory::refresh_public_rooms`] on a timer, not per request.
pub struct SessionDirectory {
    rooms: HashMap<String, Room>,
    public_rooms: Vec<PublicRoomSummary>,
    rng: StdRng,
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            public_rooms: Vec::new(),
            rng,
        }
    }

    /// Creates a room owned by `owner` under a fresh code
    pub fn create(&mut self, owner: ConnectionId) -> &mut Room {
        let code = self.generate_code();
        let room = Room::new(code.clone(), owner, StdRng::seed_from_u64(self.rng.gen()));
        info!("Created room {} for connection {}", code, owner);
        self.rooms.entry(code).or_insert(room)
    }

    pub fn find(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn find_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn delete(&mut self, code: &str) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        info!("Deleted room {}", code);
        Some(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Last snapshot of joinable public rooms
    pub fn public_rooms(&self) -> &[PublicRoomSummary] {
        &self.public_rooms
    }

    pub fn refresh_public_rooms(&mut self) {
        let mut summaries: Vec<PublicRoomSummary> =
            self.rooms.values().filter_map(Room::summary).collect();
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        self.public_rooms = summaries;
    }

    fn generate_code(&mut self) -> String {
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}
