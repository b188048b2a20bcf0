//! Player roster: the mapping from live connections to player records
//!
//! The roster owns player lifetime. Registration trims and validates the
//! display name, re-registration overwrites the record in place (keeping the
//! original join-order position), and unregistration is a silent no-op for
//! unknown connections. Enumeration order is join order so the host display
//! is deterministic.

use log::info;
use std::collections::HashMap;
use thiserror::Error;

/// Failures surfaced to the joining connection only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// Display name was empty or whitespace-only after trimming.
    #[error("Name is required")]
    InvalidName,
}

/// A registered player
#[derive(Debug, Clone)]
pub struct Player {
    /// Trimmed display name
    pub name: String,
    /// Whether this player has buzzed in the current round
    pub buzzed: bool,
}

/// All registered players, keyed by connection id
#[derive(Debug, Default)]
pub struct Roster {
    players: HashMap<u32, Player>,
    /// Connection ids in registration order; removals keep relative order
    join_order: Vec<u32>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) a player for the given connection.
    ///
    /// Trims the raw name and rejects names that are empty afterwards.
    /// Overwriting an existing entry resets the buzzed flag and keeps the
    /// player's original position in the join order. Returns the trimmed
    /// name on success.
    pub fn register(
        &mut self,
        connection_id: u32,
        raw_name: &str,
    ) -> Result<String, RegisterError> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(RegisterError::InvalidName);
        }

        if !self.players.contains_key(&connection_id) {
            self.join_order.push(connection_id);
        }
        self.players.insert(
            connection_id,
            Player {
                name: name.to_string(),
                buzzed: false,
            },
        );

        info!("Player '{}' registered on connection {}", name, connection_id);
        Ok(name.to_string())
    }

    /// Removes the player for a connection, if present.
    ///
    /// Returns true if a player was removed. Absent connections are a no-op,
    /// not an error: hosts and not-yet-joined connections disconnect too.
    pub fn unregister(&mut self, connection_id: u32) -> bool {
        if let Some(player) = self.players.remove(&connection_id) {
            self.join_order.retain(|id| *id != connection_id);
            info!(
                "Player '{}' unregistered from connection {}",
                player.name, connection_id
            );
            true
        } else {
            false
        }
    }

    /// Returns true if the connection has a registered player.
    pub fn contains(&self, connection_id: u32) -> bool {
        self.players.contains_key(&connection_id)
    }

    /// Returns the display name for a connection.
    pub fn name_of(&self, connection_id: u32) -> Option<&str> {
        self.players
            .get(&connection_id)
            .map(|player| player.name.as_str())
    }

    /// Marks whether a player has buzzed this round.
    pub fn set_buzzed(&mut self, connection_id: u32, buzzed: bool) {
        if let Some(player) = self.players.get_mut(&connection_id) {
            player.buzzed = buzzed;
        }
    }

    /// Clears the buzzed flag on every player (round reset).
    pub fn clear_buzzed(&mut self) {
        for player in self.players.values_mut() {
            player.buzzed = false;
        }
    }

    /// Display names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.join_order
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|player| player.name.clone())
            .collect()
    }

    /// Connection ids of players who have not buzzed this round, join order.
    pub fn unbuzzed_ids(&self) -> Vec<u32> {
        self.join_order
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(|player| !player.buzzed))
            .collect()
    }

    /// Returns the number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if no players are registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
