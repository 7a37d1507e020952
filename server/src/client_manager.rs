//! Connection bookkeeping for the room server
//!
//! This module tracks every open TCP connection:
//! - Connection lifecycle (accept, id assignment, disconnect)
//! - Capacity enforcement against the configured connection limit
//! - The outbound queue each connection's writer task drains
//!
//! Room membership is not tracked here; the gateway owns that. The client
//! manager only knows how to reach a connection by id.

use connect4_shared::{ConnectionId, ServerEvent};
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// One connected endpoint
#[derive(Debug)]
pub struct Client {
    /// Identifier assigned by the server, never reused while running
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Queue drained by the connection's writer task
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues an event for delivery. Returns false once the writer is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Registry of open connections
///
/// Connection ids start at 1 and increase for every accepted connection.
/// Once `max_clients` connections are open, further ones are refused.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    next_client_id: ConnectionId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection, returning its id, or None when at capacity
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));
        Some(client_id)
    }

    /// Returns true if the client was found and removed
    pub fn remove_client(&mut self, client_id: ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Queues `event` for `client_id`. Returns false if the client is unknown
    /// or its writer has stopped.
    pub fn send(&self, client_id: ConnectionId, event: ServerEvent) -> bool {
        self.clients
            .get(&client_id)
            .map(|client| client.send(event))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
