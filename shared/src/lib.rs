//! # Connect Four Shared Library
//!
//! Types and rules used by both ends of the connection.
//!
//! ## Modules
//!
//! - [`game`] — the board/roster/turn state machine with four-in-a-row
//!   detection. Pure, no I/O; the server owns one per room and clients can
//!   replay broadcast moves against their own copy.
//! - [`protocol`] — named client and server events and the length-prefixed
//!   `bincode` frame codec.
//! - [`player`], [`color`] — participant identity.
//! - [`error`] — engine failures and the failure classes shared with the
//!   server.

pub mod color;
pub mod error;
pub mod game;
pub mod player;
pub mod protocol;

pub use color::Color;
pub use error::{ErrorKind, GameError};
pub use game::{Coord, Game, Slot};
pub use player::{ConnectionId, NewPlayer, Player, Winner};
pub use protocol::{ChatMessage, ClientEvent, PublicRoomSummary, ServerEvent};

use rand::seq::SliceRandom;
use rand::Rng;

pub const MAX_PLAYERS: usize = Color::ALL.len();
pub const MIN_GRID_SIZE: usize = 1;
pub const MAX_GRID_SIZE: usize = 10;
pub const DEFAULT_ROWS: usize = 6;
pub const DEFAULT_COLS: usize = 7;

pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_USERNAME_LEN: usize = 25;

/// Uniform pick used for every random host, owner and turn assignment.
/// Seed `rng` for deterministic selection.
pub fn pick_random<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    items.choose(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_random_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        let items: [u32; 0] = [];
        assert_eq!(pick_random(&items, &mut rng), None);
    }

    #[test]
    fn test_pick_random_is_member() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = [1, 2, 3];
        for _ in 0..50 {
            let picked = pick_random(&items, &mut rng).unwrap();
            assert!(items.contains(picked));
        }
    }

    #[test]
    fn test_pick_random_is_deterministic_for_seed() {
        let items: Vec<u32> = (0..100).collect();
        let mut first = StdRng::seed_from_u64(9);
        let mut second = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            assert_eq!(
                pick_random(&items, &mut first),
                pick_random(&items, &mut second)
            );
        }
    }

    #[test]
    fn test_roster_capacity_matches_colors() {
        assert_eq!(MAX_PLAYERS, 8);
    }
}
