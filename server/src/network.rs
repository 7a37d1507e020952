//! Server network layer: TCP connections feeding one gateway loop

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::gateway::Gateway;
use crate::room::Dispatch;
use connect4_shared::protocol::{decode, read_frame, write_frame};
use connect4_shared::{ClientEvent, ConnectionId, ServerEvent};
use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    ClientConnected {
        client_id: ConnectionId,
    },
    EventReceived {
        client_id: ConnectionId,
        event: ClientEvent,
    },
    ClientDisconnected {
        client_id: ConnectionId,
    },
    Shutdown,
}

/// Accepts connections and runs every room operation on a single task.
///
/// Each connection gets a reader task that decodes frames into
/// [`ServerMessage`]s and a writer task that drains its outbound queue. The
/// main loop in [`Server::run`] is the only place the [`Gateway`] is touched,
/// so room state needs no locking of its own.
pub struct Server {
    listener: Arc<TcpListener>,
    clients: Arc<RwLock<ClientManager>>,
    gateway: Gateway,
    public_refresh: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> io::Result<Self> {
        Self::with_gateway(config, Gateway::new(config)).await
    }

    pub async fn with_gateway(config: &ServerConfig, gateway: Gateway) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Arc::new(listener),
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_connections))),
            gateway,
            public_refresh: config.public_refresh,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for injecting messages, e.g. [`ServerMessage::Shutdown`]
    pub fn sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts connections until the server stops
    fn spawn_acceptor(&self) -> JoinHandle<()> {
        let listener = Arc::clone(&self.listener);
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        tokio::spawn(Self::handle_connection(
                            stream,
                            addr,
                            Arc::clone(&clients),
                            server_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Registers one connection and pumps its frames into the main loop
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        clients: Arc<RwLock<ClientManager>>,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let client_id = {
            let mut clients = clients.write().await;
            clients.add_client(addr, event_tx)
        };
        let Some(client_id) = client_id else {
            warn!("Refusing connection from {}: server full", addr);
            return;
        };

        let (mut reader, mut writer) = stream.into_split();

        // Ends when the client manager drops the sender
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if let Err(e) = write_frame(&mut writer, &event).await {
                    debug!("Failed to write to client {}: {}", client_id, e);
                    break;
                }
            }
        });

        if server_tx
            .send(ServerMessage::ClientConnected { client_id })
            .is_err()
        {
            return;
        }

        loop {
            match read_frame(&mut reader).await {
                Ok(Some(bytes)) => match decode::<ClientEvent>(&bytes) {
                    Ok(event) => {
                        if let Err(e) =
                            server_tx.send(ServerMessage::EventReceived { client_id, event })
                        {
                            error!("Failed to send event to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to decode frame from client {}: {}", client_id, e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Error reading from client {}: {}", client_id, e);
                    break;
                }
            }
        }

        // The main loop may already be gone during shutdown
        let _ = server_tx.send(ServerMessage::ClientDisconnected { client_id });
    }

    /// Hands dispatches to the addressed connections' writer tasks
    async fn deliver(&self, dispatches: Vec<Dispatch>) {
        if dispatches.is_empty() {
            return;
        }
        let clients = self.clients.read().await;
        for Dispatch { to, event } in dispatches {
            let name = event.name();
            if !clients.send(to, event) {
                debug!("Dropped {} for departed client {}", name, to);
            }
        }
    }

    async fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::ClientConnected { client_id } => {
                self.gateway.connect(client_id);
            }
            ServerMessage::EventReceived { client_id, event } => {
                debug!("Client {} sent {}", client_id, event.name());
                let dispatches = self.gateway.handle(client_id, event);
                self.deliver(dispatches).await;
            }
            ServerMessage::ClientDisconnected { client_id } => {
                {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(client_id);
                }
                let dispatches = self.gateway.disconnect(client_id);
                self.deliver(dispatches).await;
            }
            ServerMessage::Shutdown => return false,
        }
        true
    }

    /// Main server loop, returns after [`ServerMessage::Shutdown`]
    pub async fn run(&mut self) -> io::Result<()> {
        let acceptor = self.spawn_acceptor();

        let mut refresh_interval = interval(self.public_refresh);
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    let running = match message {
                        Some(message) => self.handle_message(message).await,
                        None => false,
                    };
                    if !running {
                        info!("Server shutting down");
                        break;
                    }
                },

                _ = refresh_interval.tick() => {
                    self.gateway.refresh_public_rooms();

                    let rooms = self.gateway.directory().len();
                    if rooms > 0 {
                        let clients = self.clients.read().await.len();
                        debug!("{} rooms, {} clients connected", rooms, clients);
                    }
                },
            }
        }

        acceptor.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    fn test_config(max_connections: usize) -> ServerConfig {
        ServerConfig {
            port: 0,
            max_connections,
            ..ServerConfig::default()
        }
    }

    async fn read_event(stream: &mut TcpStream) -> Option<ServerEvent> {
        let bytes = timeout(Duration::from_secs(5), read_frame(stream))
            .await
            .expect("timed out")
            .expect("read failed")?;
        Some(decode(&bytes).expect("decode failed"))
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        let msg = ServerMessage::EventReceived {
            client_id: 3,
            event: ClientEvent::RoomCreate,
        };
        assert!(tx.send(msg).is_ok());

        match rx.try_recv().unwrap() {
            ServerMessage::EventReceived { client_id, event } => {
                assert_eq!(client_id, 3);
                assert_eq!(event, ClientEvent::RoomCreate);
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_create_room_over_tcp() {
        let mut server = Server::new(&test_config(8)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.sender();
        let handle = tokio::spawn(async move { server.run().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut stream, &ClientEvent::RoomCreate)
            .await
            .unwrap();

        match read_event(&mut stream).await {
            Some(ServerEvent::RoomCreated { code }) => assert_eq!(code.len(), 5),
            other => panic!("Unexpected event {:?}", other),
        }

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_garbage_frame_is_skipped() {
        let mut server = Server::new(&test_config(8)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.sender();
        let handle = tokio::spawn(async move { server.run().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&[0, 0, 0, 3, 0xff, 0xff, 0xff]).await.unwrap();
        write_frame(&mut stream, &ClientEvent::RoomCreate)
            .await
            .unwrap();

        assert!(matches!(
            read_event(&mut stream).await,
            Some(ServerEvent::RoomCreated { .. })
        ));

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_when_full() {
        let mut server = Server::new(&test_config(1)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.sender();
        let handle = tokio::spawn(async move { server.run().await });

        let mut first = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut first, &ClientEvent::RoomCreate).await.unwrap();
        assert!(read_event(&mut first).await.is_some());

        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(read_event(&mut second).await, None);

        shutdown.send(ServerMessage::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
    }
}
