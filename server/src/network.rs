//! Server network layer handling UDP communications and event dispatch

use crate::connections::{ConnectionManager, Role};
use crate::game::GameSession;
use crate::round::BuzzOutcome;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main event loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ConnectionTimeout {
        connection_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the event loop to the outbound sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating networking and buzz arbitration
///
/// All mutating operations funnel through one mpsc channel into the event
/// loop, which makes the loop the serialization point for the whole session:
/// buzz arrival order is the order the loop dequeues packets, and snapshots
/// are computed between events so they never observe an in-flight mutation.
/// Outbound delivery runs on a separate task behind its own queue so a slow
/// receiver cannot stall arbitration.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionManager>>,
    session: GameSession,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_connections: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionManager::new(max_connections))),
            session: GameSession::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Returns the bound address, useful when binding to an ephemeral port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let connection_addrs = {
                            let connections_guard = connections.read().await;
                            connections_guard.connection_addrs()
                        };

                        for (connection_id, addr) in connection_addrs {
                            if Some(connection_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to connection {}: {}", connection_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors connection timeouts
    async fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections_guard = connections.write().await;
                    connections_guard.check_timeouts()
                };

                for connection_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ConnectionTimeout { connection_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Looks up the connection for an address, creating one if there is room.
    ///
    /// Existing connections are refreshed and switched to the given role.
    /// Returns None when the server is full, after notifying the sender.
    async fn ensure_connection(&self, addr: SocketAddr, role: Role) -> Option<u32> {
        let existing = {
            let connections = self.connections.read().await;
            connections.find_by_addr(addr)
        };

        if let Some(connection_id) = existing {
            let mut connections = self.connections.write().await;
            connections.refresh(connection_id);
            connections.set_role(connection_id, role);
            return Some(connection_id);
        }

        let added = {
            let mut connections = self.connections.write().await;
            connections.add_connection(addr, role)
        };

        if added.is_none() {
            warn!("Rejecting connection from {}: server full", addr);
            let response = Packet::Error {
                message: "Server full".to_string(),
            };
            self.send_packet(&response, addr).await;
        }

        added
    }

    /// Processes an inbound event and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Join { name } => {
                let connection_id = match self.ensure_connection(addr, Role::Player).await {
                    Some(connection_id) => connection_id,
                    None => return,
                };

                match self.session.register(connection_id, &name) {
                    Ok(name) => {
                        self.send_packet(&Packet::Joined { name }, addr).await;
                        self.broadcast_state().await;
                    }
                    Err(e) => {
                        let response = Packet::Error {
                            message: e.to_string(),
                        };
                        self.send_packet(&response, addr).await;
                    }
                }
            }

            Packet::JoinHost => {
                if self.ensure_connection(addr, Role::Host).await.is_none() {
                    return;
                }

                // Directed snapshot so a late-joining host sees current state
                // immediately; no game state changed, so no broadcast.
                let snapshot = self.session.snapshot();
                let response = Packet::StateUpdate {
                    players: snapshot.players,
                    buzz_order: snapshot.buzz_order,
                };
                self.send_packet(&response, addr).await;
            }

            // The payload name is not authoritative; identity comes from the
            // sending address only.
            Packet::Buzz { .. } => {
                let connection_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                let connection_id = match connection_id {
                    Some(connection_id) => connection_id,
                    None => {
                        let response = Packet::Error {
                            message: "Not registered".to_string(),
                        };
                        self.send_packet(&response, addr).await;
                        return;
                    }
                };

                {
                    let mut connections = self.connections.write().await;
                    connections.refresh(connection_id);
                }

                match self.session.buzz(connection_id) {
                    BuzzOutcome::Accepted { position } => {
                        if position == 1 {
                            self.notify_locked_out(connection_id).await;
                        }
                        self.send_packet(&Packet::BuzzResult { position }, addr).await;
                        self.broadcast_state().await;
                    }
                    BuzzOutcome::AlreadyBuzzed => {
                        // Duplicate before the client saw its own result;
                        // deliberately silent, no broadcast.
                        debug!("Duplicate buzz from connection {}", connection_id);
                    }
                    BuzzOutcome::RejectedLocked => {
                        self.send_packet(&Packet::LockedOut, addr).await;
                    }
                    BuzzOutcome::NotRegistered => {
                        let response = Packet::Error {
                            message: "Not registered".to_string(),
                        };
                        self.send_packet(&response, addr).await;
                    }
                }
            }

            Packet::Reset => {
                let connection_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                match connection_id {
                    Some(connection_id) => {
                        {
                            let mut connections = self.connections.write().await;
                            connections.refresh(connection_id);
                        }
                        self.session.reset();
                        // Dedicated re-arm notice first, then the snapshot
                        self.broadcast_packet(&Packet::Reset, None).await;
                        self.broadcast_state().await;
                    }
                    None => {
                        let response = Packet::Error {
                            message: "Not registered".to_string(),
                        };
                        self.send_packet(&response, addr).await;
                    }
                }
            }

            Packet::Heartbeat { .. } => {
                // Liveness only; the timestamp is never used for ordering
                let connection_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(connection_id) = connection_id {
                    let mut connections = self.connections.write().await;
                    connections.refresh(connection_id);
                }
            }

            Packet::Disconnect => {
                let connection_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(connection_id) = connection_id {
                    {
                        let mut connections = self.connections.write().await;
                        connections.remove_connection(&connection_id);
                    }
                    if self.session.unregister(connection_id) {
                        self.broadcast_state().await;
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Tells every registered, not-yet-buzzed player other than the winner
    /// that the round is now locked.
    async fn notify_locked_out(&self, winner_id: u32) {
        let locked_out = self.session.locked_out_ids(winner_id);

        let addrs: Vec<SocketAddr> = {
            let connections = self.connections.read().await;
            locked_out
                .iter()
                .filter_map(|connection_id| connections.addr_of(*connection_id))
                .collect()
        };

        for addr in addrs {
            self.send_packet(&Packet::LockedOut, addr).await;
        }
    }

    /// Broadcasts the current snapshot to every connection
    async fn broadcast_state(&self) {
        let connection_count = {
            let connections = self.connections.read().await;
            connections.len()
        };

        if connection_count == 0 {
            return;
        }

        let snapshot = self.session.snapshot();
        let packet = Packet::StateUpdate {
            players: snapshot.players,
            buzz_order: snapshot.buzz_order,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut stats_interval = interval(Duration::from_secs(30));

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events; this channel is the single
                // serialization point for all state mutation
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ConnectionTimeout { connection_id }) => {
                            info!("Connection {} timed out", connection_id);
                            if self.session.unregister(connection_id) {
                                self.broadcast_state().await;
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Periodic health reporting
                _ = stats_interval.tick() => {
                    let connection_count = {
                        let connections = self.connections.read().await;
                        connections.len()
                    };

                    if connection_count > 0 {
                        debug!("{} connections, {} players, locked: {}",
                               connection_count,
                               self.session.player_count(),
                               self.session.is_locked());
                    }
                },
            }
        }

        Ok(())
    }
}
