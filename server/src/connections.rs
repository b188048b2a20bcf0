//! Transport connection tracking for the buzzer server
//!
//! This module handles the server-side bookkeeping of live connections:
//! - Connection lifecycle (join, explicit disconnect, timeout)
//! - Address-to-connection resolution for inbound datagrams
//! - The observer set the broadcaster fans snapshots out to
//! - Connection capacity enforcement
//!
//! Connection records are transport-level state only; the player roster and
//! round state live in the game session and reference connections by id.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Connections that stay silent longer than this are reaped. Clients are
/// expected to heartbeat well inside the window.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How a connection participates in the game.
///
/// Hosts are observer-only: they receive every broadcast but never hold a
/// roster entry, so a buzz from a host falls out as not-registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Host,
}

/// A live connection and its liveness state
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned by the server, never reused
    pub id: u32,
    /// Network address for sending replies and broadcasts
    pub addr: SocketAddr,
    /// Player or observer-only host
    pub role: Role,
    /// Last time we received any packet from this connection
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr, role: Role) -> Self {
        Self {
            id,
            addr,
            role,
            last_seen: Instant::now(),
        }
    }

    /// Marks the connection as recently active.
    pub fn refresh(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if no packets have arrived within the timeout window.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all live connections and their liveness
///
/// The ConnectionManager owns the mapping from connection id to network
/// address, enforces the capacity limit, and detects silent connections so
/// the event loop can process their departure like any other disconnect.
/// It is the explicit observer registry the broadcaster iterates; membership
/// is core-owned state, not a transport feature.
pub struct ConnectionManager {
    /// Live connections indexed by their unique id
    connections: HashMap<u32, Connection>,
    /// Next available connection id
    next_connection_id: u32,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ConnectionManager {
    /// Creates a new connection manager with the specified capacity limit.
    ///
    /// Connection ids start from 1 and increment for each new connection,
    /// so an id is never reused for the lifetime of the process.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_connections,
        }
    }

    /// Attempts to add a new connection.
    ///
    /// Returns Some(connection_id) if successful, None if the server is at
    /// capacity. Logs the new connection for server monitoring.
    pub fn add_connection(&mut self, addr: SocketAddr, role: Role) -> Option<u32> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        let connection = Connection::new(connection_id, addr, role);
        info!(
            "Connection {} established from {} ({:?})",
            connection_id, addr, role
        );
        self.connections.insert(connection_id, connection);

        Some(connection_id)
    }

    /// Removes a connection.
    ///
    /// Returns true if the connection was found and removed, false if it was
    /// already gone. Handles both explicit disconnects and timeout cleanup.
    pub fn remove_connection(&mut self, connection_id: &u32) -> bool {
        if let Some(connection) = self.connections.remove(connection_id) {
            info!("Connection {} closed", connection.id);
            true
        } else {
            false
        }
    }

    /// Finds a connection id by its network address.
    ///
    /// This is the trust anchor for every inbound event: identity comes from
    /// the transport address, never from the packet payload.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, connection)| connection.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Updates the activity timestamp of a connection.
    pub fn refresh(&mut self, connection_id: u32) {
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.refresh();
        }
    }

    /// Changes the role of an existing connection.
    pub fn set_role(&mut self, connection_id: u32, role: Role) {
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.role = role;
        }
    }

    /// Returns the network address of a connection, if it is still live.
    pub fn addr_of(&self, connection_id: u32) -> Option<SocketAddr> {
        self.connections
            .get(&connection_id)
            .map(|connection| connection.addr)
    }

    /// Gets all connection ids and their network addresses.
    ///
    /// Used for fanning out snapshots and reset notices to every observer,
    /// players and hosts alike.
    pub fn connection_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.connections
            .iter()
            .map(|(id, connection)| (*id, connection.addr))
            .collect()
    }

    /// Checks for and removes timed-out connections.
    ///
    /// Returns the removed connection ids so the event loop can purge the
    /// matching game state, exactly as it would for an explicit disconnect.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_timed_out(CONNECTION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for connection_id in &timed_out {
            self.remove_connection(connection_id);
        }

        timed_out
    }

    /// Returns the number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are live.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
