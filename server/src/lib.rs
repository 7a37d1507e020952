//! # Connect Four Room Server
//!
//! This library hosts multiplayer connect-four games. Clients connect over
//! TCP, create or join rooms by a short code, add local or remote players to
//! the room's game, chat, and drop pieces. The server is authoritative: every
//! move is validated against the shared game engine before it is broadcast.
//!
//! ## Architecture Design
//!
//! ### Single-Task Event Loop
//! All room state lives in one [`gateway::Gateway`] owned by the main loop in
//! [`network::Server::run`]. Connection tasks only decode frames and forward
//! them over a channel, so events for a room are applied strictly in arrival
//! order and no room needs its own lock.
//!
//! ### Silent Rejection
//! An event that is malformed, unauthorized, or invalid for the current game
//! state is dropped with a debug log. Only `room:join` answers a failure,
//! with `room:notfound`.
//!
//! ## Module Organization
//!
//! ### Room (`room`)
//! One game plus its connection membership, owner and bounded chat log.
//! Operations queue [`room::Dispatch`]es instead of writing to sockets.
//!
//! ### Directory (`directory`)
//! Registry of rooms by code and the periodically rebuilt public room list.
//!
//! ### Gateway (`gateway`)
//! Maps each named client event to directory and room operations, tracks
//! which room each connection is in, and handles disconnects.
//!
//! ### Chat (`chat`)
//! Message length limits, the word filter and per-connection rate limiting.
//!
//! ### Client Manager (`client_manager`) and Network (`network`)
//! Connection ids, capacity limits, per-connection writer queues and the
//! accept loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use connect4_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig {
//!         port: 3000,
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(&config).await?;
//!     server.run().await
//! }
//! ```

pub mod chat;
pub mod client_manager;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod network;
pub mod room;

pub use config::ServerConfig;
pub use directory::SessionDirectory;
pub use error::RoomError;
pub use gateway::Gateway;
pub use network::{Server, ServerMessage};
pub use room::{Dispatch, Room};
