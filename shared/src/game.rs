//! Board, roster, turn and win detection.
//!
//! `Game` is a pure state machine with no I/O:
//! `NotStarted -> Started -> (Won | Drawn) -> NotStarted (restart) -> Started`.
//! Every mutating operation validates first and returns an error without
//! touching state when validation fails.

use crate::{
    pick_random, Color, GameError, Player, Winner, DEFAULT_COLS, DEFAULT_ROWS, MAX_GRID_SIZE,
    MAX_PLAYERS, MIN_GRID_SIZE,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Board coordinate as `(row, col)` where row 0 is the bottom row
pub type Coord = (usize, usize);

/// Number of contiguous pieces needed to win
pub const WIN_LENGTH: usize = 4;

/// Scan directions as `(row step, col step)`, in scan order:
/// horizontal, vertical, ascending diagonal, descending diagonal.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// Read-only display projection of one board cell.
///
/// `row` is the display row: row 0 is the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub color: Option<Color>,
    pub row: usize,
    pub col: usize,
    pub is_winning: bool,
}

#[derive(Debug, Clone)]
pub struct Game {
    /// Insertion order is turn order
    players: Vec<Player>,
    host: Option<String>,
    playing: Option<String>,
    winner: Option<Winner>,
    winning_slots: Vec<Coord>,
    started: bool,
    rows: usize,
    cols: usize,
    /// Column major; index 0 of each column is the bottom row
    grid: Vec<Vec<Option<Color>>>,
    rng: StdRng,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic host and turn selection for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        let mut game = Self {
            players: Vec::new(),
            host: None,
            playing: None,
            winner: None,
            winning_slots: Vec::new(),
            started: false,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            grid: Vec::new(),
            rng,
        };
        game.create_grid();
        game
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn find_player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn find_player_by_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    pub fn host(&self) -> Option<&Player> {
        self.host.as_deref().and_then(|id| self.find_player(id))
    }

    pub fn playing(&self) -> Option<&Player> {
        self.playing.as_deref().and_then(|id| self.find_player(id))
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn winning_slots(&self) -> &[Coord] {
        &self.winning_slots
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell content at board coordinates, `None` when empty or out of range
    pub fn cell(&self, row: usize, col: usize) -> Option<Color> {
        self.grid.get(col).and_then(|column| column.get(row)).copied().flatten()
    }

    /// Appends a player to the roster; the first player added becomes host.
    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.find_player_by_color(player.color).is_some() {
            return Err(GameError::ColorTaken(player.color));
        }
        if self.find_player(&player.id).is_some() {
            return Err(GameError::DuplicatePlayer(player.id));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RosterFull);
        }

        if self.host.is_none() {
            self.host = Some(player.id.clone());
        }

        debug!("Added player {} ({})", player.id, player.color);
        self.players.push(player);
        Ok(())
    }

    /// Removes a player, handing the turn and host role on first.
    ///
    /// The turn advances while the roster is still complete so the
    /// round-robin sees the removed player's position.
    pub fn remove_player(&mut self, id: &str) -> Result<Player, GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;

        if self.playing.as_deref() == Some(id) {
            self.next_turn();
        }

        if self.host.as_deref() == Some(id) {
            let remaining: Vec<&Player> = self.players.iter().filter(|p| p.id != id).collect();
            self.host = pick_random(&remaining, &mut self.rng).map(|p| p.id.clone());
        }

        let removed = self.players.remove(index);

        // A sole player hands the turn back to themselves
        if self.playing.as_deref() == Some(id) {
            self.playing = None;
        }

        debug!("Removed player {}", removed.id);
        Ok(removed)
    }

    /// Resizes and clears the board. Roster, host and winner are kept.
    pub fn set_grid_size(&mut self, rows: usize, cols: usize) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        let valid = MIN_GRID_SIZE..=MAX_GRID_SIZE;
        if !valid.contains(&rows) || !valid.contains(&cols) {
            return Err(GameError::GridSizeOutOfRange { rows, cols });
        }

        self.rows = rows;
        self.cols = cols;
        self.create_grid();
        Ok(())
    }

    /// Starts a game on a fresh board.
    ///
    /// The turn goes to `playing` if that id is in the roster, otherwise to a
    /// random roster member. Returns the player whose turn it is.
    pub fn start(&mut self, playing: Option<&str>) -> Result<Player, GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.is_empty() {
            return Err(GameError::EmptyRoster);
        }

        self.create_grid();
        self.winner = None;
        self.winning_slots.clear();
        self.started = true;

        let forced = playing.and_then(|id| self.find_player(id)).cloned();
        let first = match forced {
            Some(player) => player,
            None => pick_random(&self.players, &mut self.rng)
                .cloned()
                .ok_or(GameError::EmptyRoster)?,
        };
        self.playing = Some(first.id.clone());

        info!("Game started with {} players, {} to play", self.players.len(), first.username);
        Ok(first)
    }

    /// Clears a running or finished game and starts over.
    pub fn restart(&mut self, playing: Option<&str>) -> Result<Player, GameError> {
        if !self.started && self.winner.is_none() {
            return Err(GameError::NotFinished);
        }
        if self.players.is_empty() {
            return Err(GameError::EmptyRoster);
        }

        self.winner = None;
        self.winning_slots.clear();
        self.started = false;
        self.start(playing)
    }

    /// Drops the playing player's piece into `col` and advances the turn.
    /// Returns where the piece landed.
    pub fn drop_piece(&mut self, player_id: &str, col: usize) -> Result<Coord, GameError> {
        if col >= self.cols {
            return Err(GameError::ColumnOutOfRange {
                col,
                cols: self.cols,
            });
        }
        let player = match self.playing() {
            Some(player) if player.id == player_id => player.clone(),
            _ => return Err(GameError::NotYourTurn(player_id.to_string())),
        };
        let row = self.grid[col]
            .iter()
            .position(Option::is_none)
            .ok_or(GameError::ColumnFull(col))?;

        self.grid[col][row] = Some(player.color);
        self.next_turn();
        Ok((row, col))
    }

    /// Export of the board top row first, for display.
    pub fn slots(&self) -> Vec<Vec<Slot>> {
        (0..self.rows)
            .map(|display_row| {
                let row = self.rows - 1 - display_row;
                (0..self.cols)
                    .map(|col| Slot {
                        color: self.grid[col][row],
                        row: display_row,
                        col,
                        is_winning: self.winning_slots.contains(&(row, col)),
                    })
                    .collect()
            })
            .collect()
    }

    fn create_grid(&mut self) {
        self.grid = vec![vec![None; self.rows]; self.cols];
    }

    fn is_full(&self) -> bool {
        self.grid.iter().all(|column| column.iter().all(Option::is_some))
    }

    /// Settles a win or draw, otherwise hands the turn to the next player in
    /// roster order.
    fn next_turn(&mut self) {
        if let Some(winner) = self.check_for_win() {
            info!("{} wins with {:?}", winner.username, self.winning_slots);
            self.winner = Some(Winner::Player(winner));
            self.playing = None;
            self.started = false;
            return;
        }

        if self.is_full() {
            let id = format!("draw-{:08x}", self.rng.gen::<u32>());
            info!("Board full, game drawn");
            self.winner = Some(Winner::Draw { id });
            self.playing = None;
            self.started = false;
            return;
        }

        let current = self
            .playing
            .as_deref()
            .and_then(|id| self.players.iter().position(|p| p.id == id));
        if let Some(index) = current {
            let next = (index + 1) % self.players.len();
            self.playing = Some(self.players[next].id.clone());
        }
    }

    /// Looks for a four-in-a-row, first color in roster order first.
    /// Records the winning coordinates on a match.
    fn check_for_win(&mut self) -> Option<Player> {
        let found = self.players.iter().find_map(|player| {
            DIRECTIONS
                .iter()
                .find_map(|&(dr, dc)| self.find_line(player.color, dr, dc))
                .map(|line| (player.clone(), line))
        });

        let (player, line) = found?;
        self.winning_slots = line.to_vec();
        Some(player)
    }

    fn find_line(&self, color: Color, dr: isize, dc: isize) -> Option<[Coord; WIN_LENGTH]> {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let mut line = [(0, 0); WIN_LENGTH];
                let complete = (0..WIN_LENGTH).all(|i| {
                    let r = row as isize + dr * i as isize;
                    let c = col as isize + dc * i as isize;
                    if r < 0 || c < 0 {
                        return false;
                    }
                    let (r, c) = (r as usize, c as usize);
                    line[i] = (r, c);
                    self.cell(r, c) == Some(color)
                });
                if complete {
                    return Some(line);
                }
            }
        }
        None
    }
}
